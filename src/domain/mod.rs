pub mod design;
pub mod types;

pub use design::*;
pub use types::*;
