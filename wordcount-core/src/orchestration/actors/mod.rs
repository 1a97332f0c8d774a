//! Actor-facing primitives for orchestrating word count jobs.

pub mod aggregator;
pub mod job;
pub mod parser;
pub mod registry;

pub use aggregator::*;
pub use job::*;
pub use parser::*;
pub use registry::*;
