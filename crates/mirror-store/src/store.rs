//! Keyed snapshot store

use std::collections::HashMap;
use std::sync::Arc;

use mirror_core::{Object, ObjectKey, Resource};
use parking_lot::RwLock;
use tracing::{debug, trace, warn};

use crate::error::StoreError;

/// Outcome of a [`Store::replace`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaceSummary {
    /// Entries present after the replace
    pub total: usize,
    /// Keys that were not present before
    pub added: usize,
    /// Keys dropped because the new snapshot no longer lists them
    pub purged: usize,
    /// Items skipped because their key could not be derived
    pub skipped: usize,
}

#[derive(Debug)]
struct StoreInner<R> {
    items: HashMap<ObjectKey, Arc<R>>,
    synced: bool,
}

/// In-memory store of the most recent version of each object
///
/// Values are handed out as `Arc<R>` so readers never hold the lock while
/// using them.
#[derive(Debug)]
pub struct Store<R: Resource> {
    inner: RwLock<StoreInner<R>>,
}

impl<R: Resource> Default for Store<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Resource> Store<R> {
    /// Create an empty, unsynced store
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(StoreInner {
                items: HashMap::new(),
                synced: false,
            }),
        }
    }

    /// Get the object stored under `key`
    pub fn get(&self, key: &ObjectKey) -> Option<Arc<R>> {
        self.inner.read().items.get(key).cloned()
    }

    /// Get the stored object sharing `object`'s key
    ///
    /// `object` may be of any kind; only its metadata is used.
    pub fn get_for<O: Object + ?Sized>(&self, object: &O) -> Result<Option<Arc<R>>, StoreError> {
        let key = object.key()?;
        Ok(self.get(&key))
    }

    /// Check whether an object is stored under `key`
    pub fn contains(&self, key: &ObjectKey) -> bool {
        self.inner.read().items.contains_key(key)
    }

    /// Insert or overwrite an object, returning the previous version
    pub fn put(&self, object: R) -> Result<Option<Arc<R>>, StoreError> {
        let key = object.key()?;
        trace!(key = %key, kind = R::KIND, "Storing object");
        Ok(self.inner.write().items.insert(key, Arc::new(object)))
    }

    /// Remove the object under `key`; a missing key is not an error
    pub fn delete(&self, key: &ObjectKey) -> Option<Arc<R>> {
        let removed = self.inner.write().items.remove(key);
        trace!(key = %key, kind = R::KIND, found = removed.is_some(), "Deleted object");
        removed
    }

    /// Atomically replace the whole contents with a fresh snapshot
    ///
    /// After this returns, the key set equals the snapshot's key set. The
    /// new map is built before the write lock is taken, so readers only
    /// ever see the old or the new snapshot. Marks the store as synced.
    pub fn replace(&self, objects: Vec<R>) -> Result<ReplaceSummary, StoreError> {
        let mut items = HashMap::with_capacity(objects.len());
        let mut skipped = 0;
        for object in objects {
            match object.key() {
                Ok(key) => {
                    items.insert(key, Arc::new(object));
                }
                Err(e) => {
                    warn!(kind = R::KIND, error = %e, "Skipping listed object without a valid key");
                    skipped += 1;
                }
            }
        }

        let mut inner = self.inner.write();
        let added = items.keys().filter(|k| !inner.items.contains_key(*k)).count();
        let purged = inner.items.keys().filter(|k| !items.contains_key(*k)).count();
        inner.items = items;
        inner.synced = true;

        let summary = ReplaceSummary {
            total: inner.items.len(),
            added,
            purged,
            skipped,
        };
        drop(inner);

        debug!(
            kind = R::KIND,
            total = summary.total,
            added = summary.added,
            purged = summary.purged,
            "Replaced store contents"
        );
        Ok(summary)
    }

    /// All stored objects, in no particular order
    pub fn list(&self) -> Vec<Arc<R>> {
        self.inner.read().items.values().cloned().collect()
    }

    /// All stored keys, sorted
    pub fn keys(&self) -> Vec<ObjectKey> {
        let mut keys: Vec<_> = self.inner.read().items.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.inner.read().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().items.is_empty()
    }

    /// True once the first full snapshot has been applied
    pub fn has_synced(&self) -> bool {
        self.inner.read().synced
    }
}
