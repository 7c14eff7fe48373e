//! # Mirror Reflector
//!
//! Keeps a [`Store`](mirror_store::Store) eventually consistent with a remote
//! collection exposed through [`ListWatch`](mirror_core::ListWatch).
//!
//! The reflector runs a list-then-watch protocol forever:
//!
//! 1. List the full collection and atomically replace the store with it
//! 2. Watch from the list's resource version, applying events in order
//! 3. When the watch ends, errors, or the resync period elapses, go to 1
//!
//! Failures are logged and retried with exponential backoff; the store
//! keeps serving its last known state meanwhile.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use mirror_core::{MockListWatch, Service};
//! use mirror_reflector::{Reflector, ReflectorConfig};
//! use mirror_store::Store;
//!
//! let store = Arc::new(Store::<Service>::new());
//! let handle = Reflector::spawn(MockListWatch::new(), store.clone(), ReflectorConfig::default());
//!
//! handle.wait_until_synced().await;
//! // ... serve reads from `store` ...
//! handle.stop().await;
//! ```

mod backoff;
mod config;
mod error;
mod handle;
mod reflector;

pub use config::{
    BackoffConfig, DEFAULT_MIN_RELIST_INTERVAL, DEFAULT_RESYNC_PERIOD, DEFAULT_WATCH_TIMEOUT,
    ReflectorConfig,
};
pub use error::SyncError;
pub use handle::{ReflectorHandle, ReflectorPhase, ReflectorStatus};
pub use reflector::Reflector;
