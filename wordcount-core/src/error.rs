use std::time::Duration;

use thiserror::Error;
use wordcount_model::{DocumentKeyError, ModelError};

#[derive(Error, Debug)]
pub enum WordCountError {
    #[error("Fetch failed: {0}")]
    Fetch(String),

    #[error("Fetch timed out after {0:?}")]
    Timeout(Duration),

    #[error("Parse failed: {0}")]
    Parse(String),

    #[error("Unsupported document scheme: {0}")]
    UnsupportedScheme(String),

    #[error("Invalid document key: {0}")]
    DocumentKey(#[from] DocumentKeyError),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Recipient mailbox closed")]
    MailboxClosed,

    #[error("Job already terminated")]
    JobTerminated,

    #[error("Operation cancelled: {0}")]
    Cancelled(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl WordCountError {
    /// Network and deadline failures may succeed on a later attempt; parse
    /// failures will not.
    pub fn is_transient(&self) -> bool {
        matches!(self, WordCountError::Fetch(_) | WordCountError::Timeout(_))
    }
}

pub type Result<T> = std::result::Result<T, WordCountError>;
