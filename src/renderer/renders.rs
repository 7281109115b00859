use crate::inspect::*;
use crate::model::CallableLocation;
use crate::renderer::components::*;
use crate::renderer::traits::*;

impl Render for Vec<String> {
    fn render(&self, options: &DisplayOptions) -> String {
        let repr = ReprRenderer;
        let items: Vec<String> = self.iter().map(|name| repr.quote(name)).collect();
        repr.render_collection('[', ']', &items, options)
    }
}

impl Render for InspectionRecord {
    fn render(&self, options: &DisplayOptions) -> String {
        let mut output = String::new();
        let indent = options.indent();
        let repr = ReprRenderer;

        // Metadata goes first, outside the generic listing
        let mut rest = self.clone();
        for (key, value) in rest.take_meta() {
            output.push_str(&MetaRenderer.render_meta(&key, &value, &indent));
        }

        let entries: Vec<String> = rest
            .iter()
            .map(|(key, value)| format!("{}: {}", repr.quote(key), value))
            .collect();
        output.push_str(&repr.render_collection('{', '}', &entries, options));
        output
    }
}

impl Render for CallableLocation {
    fn render(&self, options: &DisplayOptions) -> String {
        format!("{}{}\n", options.indent(), ReprRenderer.quote(&self.to_string()))
    }
}

impl Render for Option<CallableLocation> {
    fn render(&self, options: &DisplayOptions) -> String {
        match self {
            Some(location) => location.render(options),
            None => format!("{}None\n", options.indent()),
        }
    }
}
