//! Element set records, text parsing and file loading

pub(crate) mod element_set;
mod loader;
mod parser;

pub use element_set::*;
pub use loader::*;
pub use parser::*;
