//! Watch stream events

use serde::{Deserialize, Serialize};

use crate::error::KeyError;
use crate::key::{Object, ObjectKey};
use crate::list::ResourceVersion;

/// HTTP-style status code the source uses for an expired resume position
pub const STATUS_GONE: u16 = 410;

/// Status carried by a watch [`WatchEvent::Error`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchStatus {
    pub code: u16,
    pub message: String,
}

impl WatchStatus {
    pub fn new(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Status for a resume position the source no longer retains
    pub fn gone(message: impl Into<String>) -> Self {
        Self::new(STATUS_GONE, message)
    }

    pub fn is_gone(&self) -> bool {
        self.code == STATUS_GONE
    }
}

/// Incremental change delivered by a watch stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent<R> {
    /// An object appeared
    Added(R),
    /// An existing object changed
    Modified(R),
    /// An object was removed; carries its last known state
    Deleted(R),
    /// No object change; only advances the resume position
    Bookmark(ResourceVersion),
    /// The source ended the stream with a status
    Error(WatchStatus),
}

impl<R: Object> WatchEvent<R> {
    /// The object carried by this event, if any
    pub fn object(&self) -> Option<&R> {
        match self {
            WatchEvent::Added(obj) | WatchEvent::Modified(obj) | WatchEvent::Deleted(obj) => {
                Some(obj)
            }
            WatchEvent::Bookmark(_) | WatchEvent::Error(_) => None,
        }
    }

    /// Key of the carried object
    pub fn key(&self) -> Option<Result<ObjectKey, KeyError>> {
        self.object().map(Object::key)
    }

    /// Resume position this event advances to, if any
    pub fn resource_version(&self) -> Option<&ResourceVersion> {
        match self {
            WatchEvent::Bookmark(rv) => Some(rv),
            WatchEvent::Error(_) => None,
            _ => self.object().and_then(Object::resource_version),
        }
    }

    /// Short label used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            WatchEvent::Added(_) => "added",
            WatchEvent::Modified(_) => "modified",
            WatchEvent::Deleted(_) => "deleted",
            WatchEvent::Bookmark(_) => "bookmark",
            WatchEvent::Error(_) => "error",
        }
    }
}
