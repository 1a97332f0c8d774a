use std::fmt;

use crate::error::{ModelError, Result};

/// Per-document progress inside a job.
///
/// Starts at `Processing` and moves to exactly one terminal value. Terminal
/// values never change again.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ProcessingStatus {
    #[default]
    Processing,
    Completed,
    FailedError,
    FailedTimeout,
}

impl ProcessingStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ProcessingStatus::Processing)
    }

    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            ProcessingStatus::FailedError | ProcessingStatus::FailedTimeout
        )
    }

    /// Moves `self` to the terminal status `next`.
    pub fn advance(&mut self, next: ProcessingStatus) -> Result<()> {
        if self.is_terminal() {
            return Err(ModelError::InvalidTransition(format!(
                "{self} is terminal, refusing {next}"
            )));
        }
        if !next.is_terminal() {
            return Err(ModelError::InvalidTransition(format!(
                "{next} is not a terminal status"
            )));
        }
        *self = next;
        Ok(())
    }
}

impl fmt::Display for ProcessingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessingStatus::Processing => write!(f, "processing"),
            ProcessingStatus::Completed => write!(f, "completed"),
            ProcessingStatus::FailedError => write!(f, "failed_error"),
            ProcessingStatus::FailedTimeout => write!(f, "failed_timeout"),
        }
    }
}
