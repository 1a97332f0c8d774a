//! Core data model definitions shared across the word count crates.
#![allow(missing_docs)]

pub mod counts;
pub mod document_key;
pub mod error;
pub mod status;

pub use counts::{WordCounts, WordFrequencyTable, merge_word_counts};
pub use document_key::{DocumentKey, DocumentKeyError};
pub use error::{ModelError, Result as ModelResult};
pub use status::ProcessingStatus;
