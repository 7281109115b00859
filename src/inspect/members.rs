use std::collections::BTreeMap;
use std::fmt;

use tracing::trace;

use crate::model::{Inspect, Value};

/// Key holding the defining module of an inspected object.
pub const META_MODULE_NAME: &str = "META_module_name";
/// Key holding the class name of an inspected object.
pub const META_CLASS_NAME: &str = "META_class_name";
const META_PREFIX: &str = "META_";

/// Sentinel shown in place of a callable member.
pub const ROUTINE_SENTINEL: &str = "routine";

/// Lazy relationship handles that are shown by class name.
pub const PROXY_CLASS_NAMES: &[&str] = &["ManyRelatedManager", "RelatedManager", "EmptyManager"];

#[derive(Debug, Clone, PartialEq)]
pub enum DisplayValue {
    Routine,
    Label(String),
    Value(Value),
}

impl fmt::Display for DisplayValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayValue::Routine => write!(f, "'{}'", ROUTINE_SENTINEL),
            DisplayValue::Label(label) => write!(f, "'{}'", label),
            DisplayValue::Value(value) => write!(f, "{}", value.repr()),
        }
    }
}

/// Attribute name → display value, plus the `META_` keys when derivable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InspectionRecord {
    entries: BTreeMap<String, DisplayValue>,
}

impl InspectionRecord {
    pub fn get(&self, key: &str) -> Option<&DisplayValue> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &DisplayValue)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn module_name(&self) -> Option<&str> {
        self.meta(META_MODULE_NAME)
    }

    pub fn class_name(&self) -> Option<&str> {
        self.meta(META_CLASS_NAME)
    }

    fn meta(&self, key: &str) -> Option<&str> {
        match self.entries.get(key) {
            Some(DisplayValue::Value(Value::Str(s))) => Some(s),
            _ => None,
        }
    }

    /// Removes the metadata entries, returning `(key without prefix, value)`.
    pub fn take_meta(&mut self) -> Vec<(String, String)> {
        let keys: Vec<String> = self
            .entries
            .keys()
            .filter(|key| key.starts_with(META_PREFIX))
            .cloned()
            .collect();

        keys.into_iter()
            .filter_map(|key| {
                let value = self.entries.remove(&key)?;
                let text = match value {
                    DisplayValue::Value(Value::Str(s)) => s,
                    other => other.to_string(),
                };
                Some((key[META_PREFIX.len()..].to_string(), text))
            })
            .collect()
    }

    fn insert(&mut self, key: impl Into<String>, value: DisplayValue) {
        self.entries.insert(key.into(), value);
    }
}

// Reads `attr` and returns the value when a template could use it.
fn admit(var: &dyn Inspect, attr: &str) -> Option<Value> {
    if attr.starts_with('_') {
        trace!(attr, "skipping private member");
        return None;
    }

    let value = match var.member(attr) {
        Ok(value) => value,
        Err(err) => {
            trace!(attr, error = %err, "skipping unreadable member");
            return None;
        }
    };

    if let Some(routine) = value.as_routine() {
        if routine.alters_data {
            trace!(attr, "skipping routine flagged alters_data");
            return None;
        }
        // An opaque signature is accepted.
        if let Some(signature) = &routine.signature {
            if signature.required_args() > 0 {
                trace!(attr, "skipping routine that requires arguments");
                return None;
            }
        }
    }

    Some(value)
}

/// Whether `var.attr` is accessible inside a template.
pub fn is_valid_in_template(var: &dyn Inspect, attr: &str) -> bool {
    admit(var, attr).is_some()
}

/// Sorted names of every template-accessible member of `var`.
pub fn get_attributes(var: &dyn Inspect) -> Vec<String> {
    let mut names = var.member_names();
    names.sort();
    names.dedup();
    names.retain(|name| is_valid_in_template(var, name));
    names
}

pub fn get_details(var: &dyn Inspect) -> InspectionRecord {
    get_details_with(var, PROXY_CLASS_NAMES)
}

/// Like [`get_details`], relabeling members whose class is in `proxy_labels`.
pub fn get_details_with<S: AsRef<str>>(var: &dyn Inspect, proxy_labels: &[S]) -> InspectionRecord {
    let mut record = InspectionRecord::default();

    if let Some(module) = var.module_name().filter(|m| !m.is_empty()) {
        record.insert(META_MODULE_NAME, DisplayValue::Value(Value::Str(module)));
    }
    if let Some(class) = var.class_name().filter(|c| !c.is_empty()) {
        record.insert(META_CLASS_NAME, DisplayValue::Value(Value::Str(class)));
    }

    let mut names = var.member_names();
    names.sort();
    names.dedup();
    for name in names {
        let Some(value) = admit(var, &name) else {
            continue;
        };
        let display = if value.is_callable() {
            DisplayValue::Routine
        } else {
            match value.class_name() {
                Some(class) if proxy_labels.iter().any(|label| label.as_ref() == class) => {
                    DisplayValue::Label(class)
                }
                _ => DisplayValue::Value(value),
            }
        };
        record.insert(name, display);
    }

    record
}
