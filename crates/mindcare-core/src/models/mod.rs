//! Domain models for the mindcare pipeline.

mod field;
mod patient;
mod raw;

pub use field::*;
pub use patient::*;
pub use raw::*;
