//! The list/watch source abstraction
//!
//! A source is anything that can produce a full snapshot of the remote
//! collection and an incremental stream of changes after it. The wire
//! protocol behind it is the implementor's business.

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::SourceError;
use crate::event::WatchEvent;
use crate::key::Resource;
use crate::list::{ListOptions, ObjectList};

/// Stream of watch events; a stream item error ends the watch
pub type WatchStream<R> = BoxStream<'static, Result<WatchEvent<R>, SourceError>>;

/// List/watch capability over a remote collection of `R`
///
/// Implementations should honour `options.scope`; the reflector also drops
/// anything outside it.
#[async_trait]
pub trait ListWatch<R: Resource>: Send + Sync {
    /// Fetch a full snapshot and the position to resume watching from
    async fn list(&self, options: &ListOptions) -> Result<ObjectList<R>, SourceError>;

    /// Open a change stream starting after `options.resource_version`
    async fn watch(&self, options: &ListOptions) -> Result<WatchStream<R>, SourceError>;
}

#[async_trait]
impl<R: Resource, L: ListWatch<R> + ?Sized> ListWatch<R> for Arc<L> {
    async fn list(&self, options: &ListOptions) -> Result<ObjectList<R>, SourceError> {
        (**self).list(options).await
    }

    async fn watch(&self, options: &ListOptions) -> Result<WatchStream<R>, SourceError> {
        (**self).watch(options).await
    }
}
