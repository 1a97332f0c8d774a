use std::fmt::{self, Display};

use crate::document_key::DocumentKeyError;

/// Errors produced by model constructors and validation routines.
#[derive(Debug)]
pub enum ModelError {
    DocumentKey(DocumentKeyError),
    InvalidTransition(String),
}

impl Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::DocumentKey(err) => write!(f, "invalid document key: {err}"),
            ModelError::InvalidTransition(msg) => write!(f, "invalid status transition: {msg}"),
        }
    }
}

impl std::error::Error for ModelError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ModelError::DocumentKey(err) => Some(err),
            ModelError::InvalidTransition(_) => None,
        }
    }
}

impl From<DocumentKeyError> for ModelError {
    fn from(err: DocumentKeyError) -> Self {
        ModelError::DocumentKey(err)
    }
}

pub type Result<T> = std::result::Result<T, ModelError>;
