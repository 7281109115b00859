//! # template-debug
//!
//! Development-time helpers for inspecting what a template can see while it
//! renders: the variables in the layered rendering context, the
//! template-visible attributes of any one value, and where a (possibly
//! decorated) callable was defined.

pub mod config;
pub mod inspect;
pub mod model;
pub mod renderer;
pub mod tags;

pub use config::*;
pub use inspect::*;
pub use model::*;
pub use renderer::*;
pub use tags::*;

#[cfg(test)]
mod tests;
