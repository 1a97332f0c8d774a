use thiserror::Error;

/// Settings that parsed but cannot be used to run a job.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SettingsError {
    #[error("invalid wordcount settings: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

impl SettingsError {
    pub(crate) fn from_problems(problems: Vec<String>) -> Result<(), SettingsError> {
        if problems.is_empty() {
            Ok(())
        } else {
            Err(SettingsError::Invalid(problems))
        }
    }

    pub fn problems(&self) -> &[String] {
        match self {
            SettingsError::Invalid(problems) => problems,
        }
    }
}
