pub mod constraints;
pub mod design;
pub mod types;

pub use constraints::*;
pub use design::*;
pub use types::*;
