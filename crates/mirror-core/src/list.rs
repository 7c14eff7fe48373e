//! List snapshots, resume positions, and list/watch options

use std::fmt::{self, Display};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::key::{Object, ObjectKey};

/// Opaque version marker assigned by the source
///
/// The mirror never interprets it; it is only handed back to the source as
/// the position a watch should resume from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceVersion(String);

impl ResourceVersion {
    pub fn new(version: impl Into<String>) -> Self {
        Self(version.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ResourceVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResourceVersion {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ResourceVersion {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<u64> for ResourceVersion {
    fn from(v: u64) -> Self {
        Self(v.to_string())
    }
}

/// Which namespaces the mirror observes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum NamespaceScope {
    /// Every namespace, plus cluster-scoped objects
    #[default]
    All,
    /// A single namespace
    Namespace(String),
}

impl NamespaceScope {
    /// Scope to one namespace; an empty string means all namespaces
    pub fn namespace(namespace: impl Into<String>) -> Self {
        let namespace = namespace.into();
        if namespace.is_empty() {
            Self::All
        } else {
            Self::Namespace(namespace)
        }
    }

    /// Check whether a key falls inside this scope
    pub fn contains(&self, key: &ObjectKey) -> bool {
        match self {
            NamespaceScope::All => true,
            NamespaceScope::Namespace(ns) => key.namespace() == ns,
        }
    }

    /// The namespace filter to pass to a source, if any
    pub fn as_filter(&self) -> Option<&str> {
        match self {
            NamespaceScope::All => None,
            NamespaceScope::Namespace(ns) => Some(ns),
        }
    }
}

impl Display for NamespaceScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NamespaceScope::All => f.write_str("<all>"),
            NamespaceScope::Namespace(ns) => f.write_str(ns),
        }
    }
}

/// Options passed to [`ListWatch::list`](crate::ListWatch::list) and
/// [`ListWatch::watch`](crate::ListWatch::watch)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListOptions {
    /// Namespace scope; sources should only return objects inside it
    pub scope: NamespaceScope,
    /// Resume position; `None` lists the latest state / watches from now
    pub resource_version: Option<ResourceVersion>,
    /// Server-side timeout hint for the watch
    pub timeout: Option<Duration>,
    /// Whether the source may send bookmark events
    pub allow_bookmarks: bool,
}

impl ListOptions {
    pub fn new(scope: NamespaceScope) -> Self {
        Self {
            scope,
            ..Default::default()
        }
    }

    /// Set the resume position
    pub fn with_resource_version(mut self, version: Option<ResourceVersion>) -> Self {
        self.resource_version = version;
        self
    }

    /// Set the watch timeout hint
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Allow bookmark events
    pub fn with_bookmarks(mut self, allow: bool) -> Self {
        self.allow_bookmarks = allow;
        self
    }
}

/// Full snapshot returned by a list call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectList<R> {
    pub items: Vec<R>,
    /// Position a subsequent watch should resume from
    pub resource_version: ResourceVersion,
}

impl<R: Object> ObjectList<R> {
    pub fn new(items: Vec<R>, resource_version: impl Into<ResourceVersion>) -> Self {
        Self {
            items,
            resource_version: resource_version.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
