use std::fmt;
use std::str::FromStr;

use url::Url;

/// Errors produced when constructing a [`DocumentKey`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentKeyError {
    Empty,
    Relative(String),
    Malformed { input: String, reason: String },
}

impl fmt::Display for DocumentKeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentKeyError::Empty => write!(f, "document key cannot be empty"),
            DocumentKeyError::Relative(input) => {
                write!(f, "document key must be an absolute URI: {input}")
            }
            DocumentKeyError::Malformed { input, reason } => {
                write!(f, "malformed document key {input}: {reason}")
            }
        }
    }
}

impl std::error::Error for DocumentKeyError {}

/// Identifies one document to fetch and tokenize.
///
/// Always an absolute URI. Two keys are equal when their parsed URIs are
/// equal, so `http://example.com` and `http://example.com/` name the same
/// document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct DocumentKey(Url);

impl DocumentKey {
    pub fn parse(input: &str) -> Result<Self, DocumentKeyError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(DocumentKeyError::Empty);
        }

        match Url::parse(trimmed) {
            Ok(url) => Ok(Self(url)),
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                Err(DocumentKeyError::Relative(trimmed.to_owned()))
            }
            Err(err) => Err(DocumentKeyError::Malformed {
                input: trimmed.to_owned(),
                reason: err.to_string(),
            }),
        }
    }

    /// Combines `self` as a base with a relative reference.
    pub fn resolve(&self, relative: &str) -> Result<Self, DocumentKeyError> {
        self.0
            .join(relative.trim())
            .map(Self)
            .map_err(|err| DocumentKeyError::Malformed {
                input: relative.to_owned(),
                reason: err.to_string(),
            })
    }

    pub fn as_url(&self) -> &Url {
        &self.0
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn scheme(&self) -> &str {
        self.0.scheme()
    }

    pub fn into_url(self) -> Url {
        self.0
    }
}

impl From<Url> for DocumentKey {
    fn from(url: Url) -> Self {
        Self(url)
    }
}

impl TryFrom<&str> for DocumentKey {
    type Error = DocumentKeyError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl FromStr for DocumentKey {
    type Err = DocumentKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for DocumentKey {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for DocumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}
