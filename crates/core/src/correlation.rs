//! Correlation ids link one dispatched job to one polling consumer.
//!
//! The id doubles as a storage key in the status exchange, so only letters,
//! digits, underscore and dot are accepted.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Longest accepted correlation id.
pub const MAX_CORRELATION_ID_LEN: usize = 128;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CorrelationIdError {
    #[error("correlation id is empty")]
    Empty,

    #[error("correlation id exceeds {MAX_CORRELATION_ID_LEN} characters")]
    TooLong,

    #[error("correlation id contains forbidden character {0:?}")]
    ForbiddenCharacter(char),

    #[error("correlation id cannot be \".\" or contain \"..\"")]
    Traversal,
}

/// A validated correlation id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CorrelationId(String);

impl CorrelationId {
    pub fn parse(raw: &str) -> Result<Self, CorrelationIdError> {
        if raw.is_empty() {
            return Err(CorrelationIdError::Empty);
        }
        if raw.len() > MAX_CORRELATION_ID_LEN {
            return Err(CorrelationIdError::TooLong);
        }
        if let Some(bad) = raw
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '.'))
        {
            return Err(CorrelationIdError::ForbiddenCharacter(bad));
        }
        // "." and ".." name directories in a filesystem-backed exchange.
        if raw == "." || raw.contains("..") {
            return Err(CorrelationIdError::Traversal);
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for CorrelationId {
    type Error = CorrelationIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CorrelationId> for String {
    fn from(id: CorrelationId) -> Self {
        id.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
