//! Artifact writing, run reports and the consumer-side reader.

mod dataset;
mod report;
mod writer;

pub use dataset::*;
pub use report::*;
pub use writer::*;
