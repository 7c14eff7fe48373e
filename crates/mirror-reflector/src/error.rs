//! Error types for the reflector
//!
//! None of these reach callers: the reflector logs them and retries the
//! list/watch cycle.

use mirror_core::{SourceError, WatchStatus};
use mirror_store::StoreError;
use thiserror::Error;

/// Errors that end a list/watch cycle
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("List failed: {0}")]
    List(SourceError),

    #[error("Watch failed: {0}")]
    Watch(SourceError),

    #[error("Watch ended with status {}: {}", .0.code, .0.message)]
    Status(WatchStatus),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_error_display() {
        let err = SyncError::List(SourceError::io("connection refused"));
        assert!(err.to_string().contains("List failed"));
        assert!(err.to_string().contains("connection refused"));

        let err = SyncError::Status(WatchStatus::new(500, "internal"));
        assert_eq!(err.to_string(), "Watch ended with status 500: internal");
    }
}
