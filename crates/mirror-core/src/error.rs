//! Error types for the mirror core

use thiserror::Error;

use crate::event::WatchStatus;

/// Errors raised while deriving an [`ObjectKey`](crate::ObjectKey)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    #[error("object has no name")]
    MissingName,

    /// A key string with more than one `/` separator
    #[error("malformed key {0:?}: expected namespace/name or name")]
    Malformed(String),
}

/// Errors reported by a list/watch source
///
/// These are transient from the mirror's point of view: the reflector
/// retries the list/watch cycle instead of surfacing them.
#[derive(Debug, Clone, Error)]
pub enum SourceError {
    #[error("Source I/O error: {0}")]
    Io(String),

    #[error("Failed to decode source response: {0}")]
    Decode(String),

    #[error("Source connection closed")]
    Closed,

    #[error("Source returned status {}: {}", .0.code, .0.message)]
    Status(WatchStatus),
}

impl SourceError {
    /// Create a new I/O error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io(message.into())
    }

    /// Create a new decode error
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode(message.into())
    }

    /// True when the source rejected a stale resume position
    pub fn is_expired(&self) -> bool {
        matches!(self, SourceError::Status(status) if status.is_gone())
    }
}

impl From<std::io::Error> for SourceError {
    fn from(err: std::io::Error) -> Self {
        SourceError::Io(err.to_string())
    }
}
