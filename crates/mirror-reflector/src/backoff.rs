//! Retry state for failed list/watch cycles

use std::time::{Duration, Instant};

use crate::config::BackoffConfig;

/// Tracks consecutive failures and derives the next retry delay
#[derive(Debug)]
pub(crate) struct Backoff {
    config: BackoffConfig,
    consecutive_failures: u32,
    last_success: Option<Instant>,
}

impl Backoff {
    pub(crate) fn new(config: BackoffConfig) -> Self {
        Self {
            config,
            consecutive_failures: 0,
            last_success: None,
        }
    }

    pub(crate) fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Exponential backoff: `initial * 2^(failures - 1)`, capped at `max`.
    pub(crate) fn delay(&self) -> Duration {
        if self.consecutive_failures == 0 {
            return Duration::ZERO;
        }
        let exponent = (self.consecutive_failures - 1).min(16);
        self.config
            .initial
            .saturating_mul(1u32 << exponent)
            .min(self.config.max)
    }

    /// Record a failed cycle and return how long to wait before retrying.
    pub(crate) fn record_failure(&mut self) -> Duration {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.delay()
    }

    /// Record a successful list, resetting the failure counter.
    pub(crate) fn record_success(&mut self) {
        self.consecutive_failures = 0;
        self.last_success = Some(Instant::now());
    }

    pub(crate) fn last_success(&self) -> Option<Instant> {
        self.last_success
    }
}
