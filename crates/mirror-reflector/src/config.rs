//! Configuration for the reflector

use std::time::Duration;

use mirror_core::NamespaceScope;

/// Default interval between forced relists (30 minutes)
pub const DEFAULT_RESYNC_PERIOD: Duration = Duration::from_secs(30 * 60);

/// Default watch timeout hint passed to the source (5 minutes)
pub const DEFAULT_WATCH_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Default minimum spacing between the starts of consecutive lists
pub const DEFAULT_MIN_RELIST_INTERVAL: Duration = Duration::from_millis(800);

/// Retry delays after a failed list/watch cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffConfig {
    /// Delay after the first failure
    pub initial: Duration,
    /// Upper bound on the delay
    pub max: Duration,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial: Duration::from_secs(1),
            max: Duration::from_secs(30),
        }
    }
}

impl BackoffConfig {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max: max.max(initial),
        }
    }
}

/// Configuration for a [`Reflector`](crate::Reflector)
#[derive(Debug, Clone)]
pub struct ReflectorConfig {
    /// Name used in logs and status
    pub name: String,
    /// Namespace scope passed to the source
    pub namespace: NamespaceScope,
    /// Interval between forced relists; zero disables periodic resync
    pub resync_period: Duration,
    /// Retry policy for failed cycles
    pub backoff: BackoffConfig,
    /// Timeout hint sent with each watch
    pub watch_timeout: Option<Duration>,
    /// Minimum time between the starts of two list/watch cycles, applied
    /// even when the previous watch ended cleanly
    pub min_relist_interval: Duration,
}

impl Default for ReflectorConfig {
    fn default() -> Self {
        Self {
            name: "reflector".to_string(),
            namespace: NamespaceScope::All,
            resync_period: DEFAULT_RESYNC_PERIOD,
            backoff: BackoffConfig::default(),
            watch_timeout: Some(DEFAULT_WATCH_TIMEOUT),
            min_relist_interval: DEFAULT_MIN_RELIST_INTERVAL,
        }
    }
}

impl ReflectorConfig {
    /// Create a configuration with a resync period and namespace
    pub fn new(resync_period: Duration, namespace: NamespaceScope) -> Self {
        Self {
            resync_period,
            namespace,
            ..Default::default()
        }
    }

    /// Set the reflector name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the namespace scope
    pub fn with_namespace(mut self, namespace: NamespaceScope) -> Self {
        self.namespace = namespace;
        self
    }

    /// Set the resync period
    pub fn with_resync_period(mut self, period: Duration) -> Self {
        self.resync_period = period;
        self
    }

    /// Set the backoff policy
    pub fn with_backoff(mut self, backoff: BackoffConfig) -> Self {
        self.backoff = backoff;
        self
    }

    /// Set the watch timeout hint
    pub fn with_watch_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.watch_timeout = timeout;
        self
    }

    /// Set the minimum spacing between list/watch cycles
    pub fn with_min_relist_interval(mut self, interval: Duration) -> Self {
        self.min_relist_interval = interval;
        self
    }

    /// True when periodic resync is enabled
    pub fn resync_enabled(&self) -> bool {
        !self.resync_period.is_zero()
    }
}
