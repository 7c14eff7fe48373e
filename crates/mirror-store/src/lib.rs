//! # Mirror Store
//!
//! The local, in-memory copy of a remote collection.
//!
//! [`Store`] holds at most one version of each object, keyed by
//! [`ObjectKey`](mirror_core::ObjectKey). A single writer (the reflector)
//! mutates it while any number of readers query it; internal locking means
//! readers never observe a partially applied write, including a full
//! [`replace`](Store::replace).
//!
//! ## Example
//!
//! ```rust,ignore
//! use mirror_core::{ObjectKey, Service};
//! use mirror_store::Store;
//!
//! let store = Store::new();
//! store.replace(vec![Service::new("default", "svc-a")]).unwrap();
//!
//! let key = ObjectKey::new("default", "svc-a").unwrap();
//! assert!(store.get(&key).is_some());
//! assert!(store.has_synced());
//! ```

pub mod error;
pub mod store;

// Re-exports
pub use error::StoreError;
pub use store::{ReplaceSummary, Store};
