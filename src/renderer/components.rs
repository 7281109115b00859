use crate::renderer::traits::*;

/// Helper for pprint-style collection layout
pub struct ReprRenderer;

impl ReprRenderer {
    /// Quotes a name the way a string repr would
    pub fn quote(&self, name: &str) -> String {
        format!("'{}'", name.replace('\\', "\\\\").replace('\'', "\\'"))
    }

    /// Joins already-rendered items between `open` and `close`.
    ///
    /// Fits on one line when it can; otherwise puts one item per line,
    /// aligned under the first.
    pub fn render_collection(
        &self,
        open: char,
        close: char,
        items: &[String],
        options: &DisplayOptions,
    ) -> String {
        let indent = options.indent();
        let single = format!("{}{}{}", open, items.join(", "), close);
        if indent.len() + single.len() <= options.width || items.len() < 2 {
            return format!("{}{}\n", indent, single);
        }

        let mut output = String::new();
        let last = items.len() - 1;
        for (i, item) in items.iter().enumerate() {
            let lead = if i == 0 { open } else { ' ' };
            let tail = if i == last {
                close.to_string()
            } else {
                ",".to_string()
            };
            output.push_str(&format!("{}{}{}{}\n", indent, lead, item, tail));
        }
        output
    }
}

/// Helper for the metadata lines printed ahead of a details record
pub struct MetaRenderer;

impl MetaRenderer {
    pub fn render_meta(&self, key: &str, value: &str, indent: &str) -> String {
        let label = key.replace('_', " ");
        let mut chars = label.chars();
        let label = match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
            None => String::new(),
        };
        format!("{}{}: {}\n", indent, label, value)
    }
}
