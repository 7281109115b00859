use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::model::value::Value;

/// Where a routine's body is defined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    pub file: PathBuf,
    pub line: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// The implicit `self`-like first argument of a bound method.
    Receiver,
    Positional,
    /// Catch-all positional or keyword parameters (`*args`, `**kwargs`).
    Variadic,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    pub kind: ParamKind,
    pub has_default: bool,
}

/// Declared parameter list of a routine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Signature {
    pub params: Vec<Param>,
}

impl Signature {
    /// Number of arguments a caller must supply beyond the receiver.
    pub fn required_args(&self) -> usize {
        self.params
            .iter()
            .filter(|p| p.kind == ParamKind::Positional && !p.has_default)
            .count()
    }
}

/// A value a routine closes over.
#[derive(Debug, Clone)]
pub enum Captured {
    Routine(Arc<Routine>),
    /// A captured collection; each element is searched in turn.
    Many(Vec<Captured>),
    Value(Value),
}

/// A callable node.
///
/// `signature` is `None` for native routines whose parameter list cannot be
/// introspected. `location` is `None` for wrappers that have no source of
/// their own; those are located through what they close over.
#[derive(Debug, Clone)]
pub struct Routine {
    pub name: String,
    pub signature: Option<Signature>,
    pub alters_data: bool,
    pub location: Option<SourceLocation>,
    pub closure: Vec<Captured>,
}

impl Routine {
    /// A native routine: no introspectable signature, no source.
    pub fn native(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            signature: None,
            alters_data: false,
            location: None,
            closure: Vec::new(),
        }
    }

    /// A bound method taking only the receiver so far.
    pub fn method(name: impl Into<String>) -> Self {
        Self::function(name).with_param(Param {
            name: "self".to_string(),
            kind: ParamKind::Receiver,
            has_default: false,
        })
    }

    /// A free function with an empty parameter list so far.
    pub fn function(name: impl Into<String>) -> Self {
        Self {
            signature: Some(Signature::default()),
            ..Self::native(name)
        }
    }

    fn with_param(mut self, param: Param) -> Self {
        self.signature.get_or_insert_with(Signature::default).params.push(param);
        self
    }

    pub fn arg(self, name: impl Into<String>) -> Self {
        self.with_param(Param {
            name: name.into(),
            kind: ParamKind::Positional,
            has_default: false,
        })
    }

    pub fn optional_arg(self, name: impl Into<String>) -> Self {
        self.with_param(Param {
            name: name.into(),
            kind: ParamKind::Positional,
            has_default: true,
        })
    }

    pub fn variadic(self, name: impl Into<String>) -> Self {
        self.with_param(Param {
            name: name.into(),
            kind: ParamKind::Variadic,
            has_default: false,
        })
    }

    /// Flags the routine as unsafe to call from a display context.
    pub fn altering_data(mut self) -> Self {
        self.alters_data = true;
        self
    }

    pub fn defined_at(mut self, file: impl Into<PathBuf>, line: u32) -> Self {
        self.location = Some(SourceLocation {
            file: file.into(),
            line,
        });
        self
    }

    pub fn closing_over(mut self, captured: Captured) -> Self {
        self.closure.push(captured);
        self
    }

    /// Wraps `inner` the way a decorator does, copying its name.
    pub fn wrapping(inner: Routine) -> Self {
        let name = inner.name.clone();
        Self::function(name)
            .variadic("args")
            .variadic("kwargs")
            .closing_over(Captured::Routine(Arc::new(inner)))
    }
}

/// `<name>:<file>:<line>` for a routine with its own source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallableLocation {
    pub name: String,
    pub file: PathBuf,
    pub line: u32,
}

impl CallableLocation {
    /// Shortens the file path when it sits under `root`.
    pub fn relative_to(mut self, root: Option<&Path>) -> Self {
        if let Some(relative) = root.and_then(|root| self.file.strip_prefix(root).ok()) {
            self.file = relative.to_path_buf();
        }
        self
    }
}

impl fmt::Display for CallableLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.name, self.file.display(), self.line)
    }
}
