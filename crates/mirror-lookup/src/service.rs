//! Endpoints-to-service lookup

use std::sync::Arc;
use std::time::Duration;

use mirror_core::{Endpoints, ListWatch, NamespaceScope, Service};

use crate::config::LookupConfig;
use crate::error::LookupResult;
use crate::lookup::ListWatchLookup;

/// Fetches the service associated with the given endpoints
pub trait ServiceLookup: Send + Sync {
    fn lookup_service(&self, endpoints: &Endpoints) -> LookupResult<Arc<Service>>;
}

impl ServiceLookup for ListWatchLookup<Service> {
    fn lookup_service(&self, endpoints: &Endpoints) -> LookupResult<Arc<Service>> {
        self.lookup(endpoints)
    }
}

/// Create a service lookup backed by a list/watch mirror of `source`
///
/// An empty `namespace` mirrors every namespace. The reflector starts right
/// away and relists every `resync`; zero disables periodic relists.
pub fn new_list_watch_service_lookup<L>(
    source: L,
    resync: Duration,
    namespace: impl Into<String>,
) -> ListWatchLookup<Service>
where
    L: ListWatch<Service> + 'static,
{
    let config = LookupConfig::new(resync, NamespaceScope::namespace(namespace));
    let config = LookupConfig {
        reflector: config.reflector.with_name("services"),
    };
    ListWatchLookup::new(source, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mirror_store::Store;

    /// Test that the ServiceLookup trait is object-safe
    fn _assert_object_safe(_: &dyn ServiceLookup) {}

    #[test]
    fn test_service_lookup_trait_object() {
        let store = Arc::new(Store::new());
        store.put(Service::new("default", "svc-a")).unwrap();
        let lookup: Box<dyn ServiceLookup> = Box::new(ListWatchLookup::from_store(store));

        assert!(lookup.lookup_service(&Endpoints::new("default", "svc-a")).is_ok());
        assert!(lookup.lookup_service(&Endpoints::new("default", "svc-b")).is_err());
    }
}
