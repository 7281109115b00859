pub mod context;
pub mod routine;
pub mod value;

pub use context::*;
pub use routine::*;
pub use value::*;
