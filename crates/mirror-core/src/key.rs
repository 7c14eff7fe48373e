//! Object identity
//!
//! Every entity the mirror deals with, cached or not, is identified by an
//! [`ObjectKey`] derived from its [`ObjectMeta`]. A dependent record and a
//! resource correlate exactly when their keys are equal.

use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

use crate::error::KeyError;
use crate::list::ResourceVersion;

/// Metadata common to every object
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    /// Namespace the object lives in; empty for cluster-scoped objects
    #[serde(default)]
    pub namespace: String,
    /// Object name, unique within its namespace
    #[serde(default)]
    pub name: String,
    /// Version marker assigned by the source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_version: Option<ResourceVersion>,
}

impl ObjectMeta {
    /// Create metadata for a namespaced object
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            resource_version: None,
        }
    }

    /// Set the resource version
    pub fn with_resource_version(mut self, version: impl Into<ResourceVersion>) -> Self {
        self.resource_version = Some(version.into());
        self
    }
}

/// Composite `(namespace, name)` identifier
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectKey {
    namespace: String,
    name: String,
}

impl ObjectKey {
    /// Build a key, rejecting an empty name
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Result<Self, KeyError> {
        let name = name.into();
        if name.is_empty() {
            return Err(KeyError::MissingName);
        }
        Ok(Self {
            namespace: namespace.into(),
            name,
        })
    }

    /// Derive the key of any object from its metadata
    pub fn for_object<O: Object + ?Sized>(object: &O) -> Result<Self, KeyError> {
        let meta = object.meta();
        Self::new(meta.namespace.clone(), meta.name.clone())
    }

    /// Parse the canonical `namespace/name` (or bare `name`) form
    pub fn parse(s: &str) -> Result<Self, KeyError> {
        match s.split_once('/') {
            Some((_, name)) if name.contains('/') => Err(KeyError::Malformed(s.to_string())),
            Some((namespace, name)) => Self::new(namespace, name),
            None => Self::new("", s),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// True for cluster-scoped keys
    pub fn is_cluster_scoped(&self) -> bool {
        self.namespace.is_empty()
    }
}

impl Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}/{}", self.namespace, self.name)
        }
    }
}

/// Anything carrying object metadata
pub trait Object {
    fn meta(&self) -> &ObjectMeta;

    fn meta_mut(&mut self) -> &mut ObjectMeta;

    /// Derive this object's key
    fn key(&self) -> Result<ObjectKey, KeyError> {
        ObjectKey::for_object(self)
    }

    /// The source-assigned version, if any
    fn resource_version(&self) -> Option<&ResourceVersion> {
        self.meta().resource_version.as_ref()
    }
}

/// An object kind the mirror can cache
///
/// `KIND` and `GROUP` name the kind in errors; `GROUP` is empty for the
/// core API group.
pub trait Resource: Object + Clone + Send + Sync + 'static {
    const KIND: &'static str;
    const GROUP: &'static str = "";
}

impl Object for ObjectMeta {
    fn meta(&self) -> &ObjectMeta {
        self
    }

    fn meta_mut(&mut self) -> &mut ObjectMeta {
        self
    }
}
