//! Store-backed lookups

use std::sync::Arc;

use mirror_core::{ListWatch, Object, Resource};
use mirror_reflector::{Reflector, ReflectorHandle};
use mirror_store::{Store, StoreError};
use tracing::{info, trace};

use crate::config::LookupConfig;
use crate::error::{LookupError, LookupResult};

/// Looks up mirrored resources by the key of a dependent record
///
/// Reads never wait on the network: they see whatever snapshot the store
/// holds at the time of the call.
#[derive(Debug)]
pub struct ListWatchLookup<R: Resource> {
    store: Arc<Store<R>>,
    reflector: Option<ReflectorHandle>,
}

impl<R: Resource> ListWatchLookup<R> {
    /// Create a lookup fed by a reflector over `source`
    ///
    /// The reflector starts immediately; must be called from within a
    /// tokio runtime.
    pub fn new<L: ListWatch<R> + 'static>(source: L, config: LookupConfig) -> Self {
        let store = Arc::new(Store::new());
        info!(
            kind = R::KIND,
            scope = %config.reflector.namespace,
            resync_secs = config.reflector.resync_period.as_secs(),
            "Starting list/watch lookup"
        );
        let reflector = Reflector::spawn(source, store.clone(), config.reflector);
        Self {
            store,
            reflector: Some(reflector),
        }
    }

    /// Create a lookup over a store filled by someone else
    pub fn from_store(store: Arc<Store<R>>) -> Self {
        Self {
            store,
            reflector: None,
        }
    }

    /// Find the resource sharing `dependent`'s key
    ///
    /// Returns [`LookupError::NotFound`] when no such resource is stored,
    /// and propagates store failures unchanged.
    pub fn lookup<D: Object + ?Sized>(&self, dependent: &D) -> LookupResult<Arc<R>> {
        let key = dependent.key().map_err(StoreError::from)?;
        match self.store.get(&key) {
            Some(resource) => Ok(resource),
            None => {
                trace!(key = %key, kind = R::KIND, "Lookup miss");
                Err(LookupError::not_found(R::GROUP, R::KIND, &key))
            }
        }
    }

    pub fn store(&self) -> &Arc<Store<R>> {
        &self.store
    }

    /// The reflector feeding this lookup, if it owns one
    pub fn reflector(&self) -> Option<&ReflectorHandle> {
        self.reflector.as_ref()
    }

    /// True once the store holds a full snapshot
    pub fn has_synced(&self) -> bool {
        self.store.has_synced()
    }

    /// Wait until the store holds a full snapshot
    ///
    /// Lookups never call this; it is for owners that prefer to start
    /// serving only after the first list.
    pub async fn wait_until_synced(&self) -> bool {
        match &self.reflector {
            Some(reflector) => reflector.wait_until_synced().await,
            None => self.store.has_synced(),
        }
    }

    /// Stop the reflector, if any, and wait for it to exit
    pub async fn shutdown(self) {
        if let Some(reflector) = self.reflector {
            reflector.stop().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mirror_core::{Endpoints, ObjectMeta, Service};

    fn seeded() -> ListWatchLookup<Service> {
        let store = Arc::new(Store::new());
        store
            .replace(vec![Service::new("default", "svc-a").with_port(80)])
            .unwrap();
        ListWatchLookup::from_store(store)
    }

    #[test]
    fn test_lookup_hit() {
        let lookup = seeded();
        let svc = lookup.lookup(&Endpoints::new("default", "svc-a")).unwrap();
        assert_eq!(svc.metadata.name, "svc-a");
        assert_eq!(svc.spec.ports[0].port, 80);
    }

    #[test]
    fn test_lookup_miss_is_not_found() {
        let lookup = seeded();
        let err = lookup.lookup(&Endpoints::new("default", "svc-b")).unwrap_err();
        assert_eq!(
            err,
            LookupError::NotFound {
                group: "",
                resource: "Service",
                namespace: "default".to_string(),
                name: "svc-b".to_string(),
            }
        );
    }

    #[test]
    fn test_lookup_is_namespace_sensitive() {
        let lookup = seeded();
        assert!(lookup.lookup(&Endpoints::new("other", "svc-a")).unwrap_err().is_not_found());
    }

    #[test]
    fn test_lookup_propagates_store_error() {
        let lookup = seeded();
        let err = lookup.lookup(&ObjectMeta::new("default", "")).unwrap_err();
        assert!(matches!(err, LookupError::Store(StoreError::InvalidKey(_))));
    }

    #[test]
    fn test_lookup_is_repeatable() {
        let lookup = seeded();
        let eps = Endpoints::new("default", "svc-a");
        let first = lookup.lookup(&eps).unwrap();
        let second = lookup.lookup(&eps).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_from_store_has_no_reflector() {
        let lookup = seeded();
        assert!(lookup.reflector().is_none());
        assert!(lookup.wait_until_synced().await);
        lookup.shutdown().await;
    }
}
