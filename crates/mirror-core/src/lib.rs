//! # Mirror Core
//!
//! Core traits, types, and errors shared by the mirror crates.
//!
//! The mirror keeps a local, eventually consistent copy of a remote
//! collection of named resources. This crate defines the vocabulary every
//! other layer speaks:
//!
//! ## Key Traits
//!
//! - [`Object`]: Anything carrying [`ObjectMeta`], and therefore an [`ObjectKey`]
//! - [`Resource`]: An object kind the mirror can cache
//! - [`ListWatch`]: The list/watch capability a remote source must provide
//!
//! ## Key Types
//!
//! - [`ObjectKey`]: Composite `(namespace, name)` identity
//! - [`WatchEvent`]: Incremental change delivered by a watch stream
//! - [`ListOptions`]: Scope and resume position for list/watch calls
//! - [`MockListWatch`]: Deterministic in-memory source for tests and demos

pub mod error;
pub mod event;
pub mod key;
pub mod list;
pub mod mock_source;
pub mod model;
pub mod traits;

// Re-export main types
pub use error::*;
pub use event::*;
pub use key::*;
pub use list::*;
pub use mock_source::*;
pub use model::*;
pub use traits::*;
