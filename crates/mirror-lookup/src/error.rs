//! Error types for lookups

use mirror_core::ObjectKey;
use mirror_store::StoreError;
use thiserror::Error;

/// Errors returned by a lookup
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    /// No resource shares the dependent record's key at lookup time
    ///
    /// Recoverable: the resource may appear once the mirror catches up.
    #[error("{}", not_found_message(.resource, .namespace, .name))]
    NotFound {
        group: &'static str,
        resource: &'static str,
        namespace: String,
        name: String,
    },

    /// The store could not be queried; propagated unchanged
    #[error(transparent)]
    Store(#[from] StoreError),
}

fn not_found_message(resource: &str, namespace: &str, name: &str) -> String {
    if namespace.is_empty() {
        format!("{resource} \"{name}\" not found")
    } else {
        format!("{resource} \"{name}\" not found in namespace \"{namespace}\"")
    }
}

impl LookupError {
    /// Create a NotFound error for a resource kind and key
    pub fn not_found(group: &'static str, resource: &'static str, key: &ObjectKey) -> Self {
        Self::NotFound {
            group,
            resource,
            namespace: key.namespace().to_string(),
            name: key.name().to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, LookupError::NotFound { .. })
    }
}

/// Result type alias for lookups
pub type LookupResult<T> = Result<T, LookupError>;
