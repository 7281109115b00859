pub mod flatten;
pub mod locator;
pub mod members;
pub mod variables;

pub use flatten::*;
pub use locator::*;
pub use members::*;
pub use variables::*;
