use std::collections::BTreeSet;

use crate::inspect::flatten::{flatten, Nested};
use crate::model::RenderingContext;

/// Name the template-inheritance machinery reserves for itself.
pub const RESERVED_BLOCK: &str = "block";

/// Sorted, de-duplicated names visible in `context`.
pub fn get_variables(context: &RenderingContext) -> Vec<String> {
    let layers = context
        .layers()
        .iter()
        .map(|layer| Nested::leaves(layer.keys().cloned()));

    let mut variables: BTreeSet<String> = flatten(layers).collect();
    variables.remove(RESERVED_BLOCK);
    variables.into_iter().collect()
}
