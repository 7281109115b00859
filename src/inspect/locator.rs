use std::path::Path;

use tracing::debug;

use crate::inspect::flatten::{flatten, Nested};
use crate::model::{CallableLocation, Captured, Routine, Value};

/// Raw result of searching a routine for its source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Located {
    Direct(CallableLocation),
    /// Locations recovered from what a wrapper closes over, in search order.
    Wrapped(Vec<CallableLocation>),
}

fn candidates<'a>(routine: &'a Routine) -> Nested<'a, CallableLocation> {
    match &routine.location {
        Some(location) => Nested::leaf(CallableLocation {
            name: routine.name.clone(),
            file: location.file.clone(),
            line: location.line,
        }),
        None => Nested::seq(routine.closure.iter().map(captured_candidates)),
    }
}

fn captured_candidates<'a>(captured: &'a Captured) -> Nested<'a, CallableLocation> {
    match captured {
        Captured::Routine(routine) => candidates(routine),
        Captured::Many(items) => Nested::seq(items.iter().map(captured_candidates)),
        Captured::Value(value) => value_candidates(value),
    }
}

// Captured lists are searched element by element, at any depth.
fn value_candidates<'a>(value: &'a Value) -> Nested<'a, CallableLocation> {
    match value {
        Value::Routine(routine) => candidates(routine),
        Value::List(items) => Nested::seq(items.iter().map(value_candidates)),
        _ => Nested::seq(std::iter::empty()),
    }
}

/// Finds where `routine` is defined, seeing through wrappers.
pub fn locate(routine: &Routine, root: Option<&Path>) -> Located {
    match candidates(routine) {
        Nested::Leaf(location) => Located::Direct(location.relative_to(root)),
        nested => Located::Wrapped(
            flatten(std::iter::once(nested))
                .map(|location| location.relative_to(root))
                .collect(),
        ),
    }
}

/// Best single location for `candidate`, or `None` if it is not callable.
///
/// For a wrapper, the closed-over routine sharing the wrapper's name wins;
/// otherwise the last one found is returned.
pub fn find_func(candidate: &Value, root: Option<&Path>) -> Option<CallableLocation> {
    let routine = candidate.as_routine()?;
    match locate(routine, root) {
        Located::Direct(location) => Some(location),
        Located::Wrapped(mut found) => {
            if let Some(i) = found.iter().position(|l| l.name == routine.name) {
                return Some(found.swap_remove(i));
            }
            if found.is_empty() {
                debug!(name = %routine.name, "routine has no source and closes over nothing callable");
            }
            found.pop()
        }
    }
}
