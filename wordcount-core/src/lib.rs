//! # Wordcount Core
//!
//! Concurrent orchestration core for counting words across a batch of
//! documents.
//!
//! ## Overview
//!
//! - **Document aggregators**: one task per job and document accumulating
//!   token counts, finalized exactly once and kept alive briefly to answer
//!   late queries
//! - **Aggregator registry**: lazy, race-free creation and addressing of
//!   aggregators by key
//! - **Parser pool**: a fixed number of workers that fetch, tokenize and stream
//!   token batches back to the requester
//! - **Job orchestrator**: drives one batch to a merged result under a
//!   job-wide deadline and notifies every subscriber exactly once
//!
//! ## Example
//!
//! ```no_run
//! use wordcount_core::orchestration::{OrchestratorConfig, WordCountRuntime};
//! use wordcount_model::DocumentKey;
//!
//! async fn count() -> Result<(), Box<dyn std::error::Error>> {
//!     let runtime = WordCountRuntime::new(OrchestratorConfig::default())?;
//!     let job = runtime.spawn_job();
//!     let mut results = job.subscribe()?;
//!     job.start(vec![DocumentKey::parse("https://example.com/")?])?;
//!
//!     if let Some(report) = results.recv().await {
//!         for (word, count) in report.counts.ranked().into_iter().take(10) {
//!             println!("{word}: {count}");
//!         }
//!     }
//!     runtime.shutdown().await;
//!     Ok(())
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(missing_docs)]

pub mod error;
pub mod orchestration;
pub mod parsing;

#[cfg(test)]
mod testing;

pub use error::{Result, WordCountError};
pub use orchestration::{
    CountsTabulatedForDocuments, JobHandle, JobId, OrchestratorConfig, WordCountRuntime,
};
pub use wordcount_model::{DocumentKey, ProcessingStatus, WordFrequencyTable};
