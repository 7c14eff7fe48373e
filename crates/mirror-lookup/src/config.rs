//! Configuration for list/watch backed lookups

use std::time::Duration;

use mirror_core::NamespaceScope;
use mirror_reflector::{BackoffConfig, ReflectorConfig};

/// Configuration for a [`ListWatchLookup`](crate::ListWatchLookup)
#[derive(Debug, Clone, Default)]
pub struct LookupConfig {
    /// Reflector feeding the lookup's store
    pub reflector: ReflectorConfig,
}

impl LookupConfig {
    /// Create a configuration with a resync period and namespace
    pub fn new(resync_period: Duration, namespace: NamespaceScope) -> Self {
        Self {
            reflector: ReflectorConfig::new(resync_period, namespace),
        }
    }

    /// Set the reflector configuration
    pub fn with_reflector(mut self, reflector: ReflectorConfig) -> Self {
        self.reflector = reflector;
        self
    }

    /// Set the resync period
    pub fn with_resync_period(mut self, period: Duration) -> Self {
        self.reflector.resync_period = period;
        self
    }

    /// Set the namespace scope
    pub fn with_namespace(mut self, namespace: NamespaceScope) -> Self {
        self.reflector.namespace = namespace;
        self
    }

    /// Set the retry policy for failed list/watch cycles
    pub fn with_backoff(mut self, backoff: BackoffConfig) -> Self {
        self.reflector.backoff = backoff;
        self
    }
}
