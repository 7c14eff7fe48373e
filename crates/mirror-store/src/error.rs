//! Error types for mirror-store

use mirror_core::KeyError;
use thiserror::Error;

/// Errors that can occur in store operations
///
/// The store itself is a plain in-memory map; the only failure reachable
/// in practice is an object whose key cannot be derived.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("Invalid object key: {0}")]
    InvalidKey(#[from] KeyError),
}
