//! Configuration library for the word counter.
//!
//! Loads [`WordCounterSettings`] from files or the environment, validates
//! them, and provides the command line surface and report rendering used by
//! the `wordcount` binary.

pub mod cli;
pub mod models;
pub mod report;
pub mod validation;

pub use cli::{Cli, OutputFormat};
pub use models::{SettingsSource, WordCounterSettings};
pub use validation::SettingsError;
