//! # Mirror Lookup
//!
//! Point lookups over a list/watch mirror.
//!
//! A lookup takes a dependent record (for example an `Endpoints` object),
//! derives its `(namespace, name)` key, and returns the mirrored resource
//! of another kind (for example the `Service`) stored under the same key.
//! A background reflector keeps the mirror fresh; lookups themselves are
//! synchronous and never wait on it.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::time::Duration;
//! use mirror_core::{Endpoints, MockListWatch, Service};
//! use mirror_lookup::{ServiceLookup, new_list_watch_service_lookup};
//!
//! let source = MockListWatch::with_items(vec![Service::new("default", "svc-a")]);
//! let lookup = new_list_watch_service_lookup(source, Duration::from_secs(600), "default");
//! lookup.wait_until_synced().await;
//!
//! let svc = lookup.lookup_service(&Endpoints::new("default", "svc-a"))?;
//! ```

mod config;
mod error;
mod lookup;
mod service;

pub use config::LookupConfig;
pub use error::{LookupError, LookupResult};
pub use lookup::ListWatchLookup;
pub use service::{ServiceLookup, new_list_watch_service_lookup};
