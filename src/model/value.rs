use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::model::routine::Routine;

/// Error raised while reading a member of an inspected object.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
    #[error("no member named `{0}`")]
    Missing(String),
    #[error("reading `{name}` failed: {message}")]
    Raised { name: String, message: String },
}

/// Reflection surface a host object exposes to the inspector.
///
/// Implementors enumerate their members and hand back a [`Value`] for each
/// one. A read is allowed to fail; the inspector treats a failed read as
/// "not displayable" and moves on.
pub trait Inspect {
    /// Name of the module the object's type is defined in, if known.
    fn module_name(&self) -> Option<String> {
        None
    }

    /// Runtime class name of the object, if known.
    fn class_name(&self) -> Option<String>;

    /// Full reflective listing of member names, private ones included.
    fn member_names(&self) -> Vec<String>;

    fn member(&self, name: &str) -> Result<Value, AccessError>;
}

/// A dynamically typed value as seen by a template.
#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    Routine(Arc<Routine>),
    Object(Arc<dyn Inspect>),
}

impl Value {
    pub fn object<T: Inspect + 'static>(object: T) -> Self {
        Value::Object(Arc::new(object))
    }

    pub fn routine(routine: Routine) -> Self {
        Value::Routine(Arc::new(routine))
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, Value::Routine(_))
    }

    pub fn as_routine(&self) -> Option<&Routine> {
        match self {
            Value::Routine(routine) => Some(routine),
            _ => None,
        }
    }

    /// Python-style repr used when a value is printed to the console.
    pub fn repr(&self) -> String {
        match self {
            Value::Null => "None".to_string(),
            Value::Bool(true) => "True".to_string(),
            Value::Bool(false) => "False".to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => format!("{:?}", f),
            Value::Str(s) => format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'")),
            Value::List(items) => {
                let items: Vec<String> = items.iter().map(|v| v.repr()).collect();
                format!("[{}]", items.join(", "))
            }
            Value::Map(map) => {
                let entries: Vec<String> = map
                    .iter()
                    .map(|(k, v)| format!("'{}': {}", k, v.repr()))
                    .collect();
                format!("{{{}}}", entries.join(", "))
            }
            Value::Routine(routine) => format!("<routine {}>", routine.name),
            Value::Object(object) => format!(
                "<{} object>",
                object.class_name().as_deref().unwrap_or("unknown")
            ),
        }
    }

    // Routines every scalar of a given kind carries, mirroring the natively
    // implemented methods a host runtime attaches to its builtins.
    fn builtin_routines(&self) -> &'static [&'static str] {
        match self {
            Value::Bool(_) | Value::Int(_) => &["bit_length"],
            Value::Float(_) => &["is_integer"],
            Value::Str(_) => &["lower", "upper"],
            _ => &[],
        }
    }
}

impl Inspect for Value {
    fn module_name(&self) -> Option<String> {
        match self {
            Value::Object(object) => object.module_name(),
            _ => None,
        }
    }

    fn class_name(&self) -> Option<String> {
        let name = match self {
            Value::Null => "NoneType",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Map(_) => "dict",
            Value::Routine(_) => "function",
            Value::Object(object) => return object.class_name(),
        };
        Some(name.to_string())
    }

    fn member_names(&self) -> Vec<String> {
        match self {
            Value::Map(map) => map.keys().cloned().collect(),
            Value::Object(object) => object.member_names(),
            other => other
                .builtin_routines()
                .iter()
                .map(|name| name.to_string())
                .collect(),
        }
    }

    fn member(&self, name: &str) -> Result<Value, AccessError> {
        match self {
            Value::Map(map) => map
                .get(name)
                .cloned()
                .ok_or_else(|| AccessError::Missing(name.to_string())),
            Value::Object(object) => object.member(name),
            other if other.builtin_routines().iter().any(|r| *r == name) => {
                Ok(Value::routine(Routine::native(name)))
            }
            _ => Err(AccessError::Missing(name.to_string())),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Routine(routine) => f.debug_tuple("Routine").field(&routine.name).finish(),
            Value::Object(object) => f
                .debug_tuple("Object")
                .field(&object.class_name().unwrap_or_default())
                .finish(),
            other => write!(f, "{}", other.repr()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.repr())
    }
}

// Routines and objects compare by identity.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Routine(a), Value::Routine(b)) => Arc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::Str(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => Value::Map(
                map.into_iter()
                    .map(|(k, v)| (k, Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}
