//! Mock list/watch source for testing
//!
//! Provides an in-memory collection that serves snapshots and watch events
//! deterministically, so reflector and lookup logic can be exercised
//! without a real remote source.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use mirror_core::{MockListWatch, Service, WatchEvent};
//!
//! let source = MockListWatch::with_items(vec![Service::new("default", "svc-a")]);
//!
//! // After a reflector has opened its watch...
//! source.wait_for_watches(1).await;
//! source.apply(WatchEvent::Deleted(Service::new("default", "svc-a")));
//! ```

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use futures::StreamExt;
use parking_lot::Mutex;
use tokio::sync::{Notify, mpsc};
use tracing::trace;

use crate::error::SourceError;
use crate::event::{WatchEvent, WatchStatus};
use crate::key::{ObjectKey, Resource};
use crate::list::{ListOptions, NamespaceScope, ObjectList, ResourceVersion};
use crate::traits::{ListWatch, WatchStream};

type WatchItem<R> = Result<WatchEvent<R>, SourceError>;

/// An open watch held by the mock
struct MockWatcher<R> {
    scope: NamespaceScope,
    tx: mpsc::UnboundedSender<WatchItem<R>>,
}

/// In-memory [`ListWatch`] implementation
///
/// Every mutation through [`apply`](Self::apply) bumps a monotonically
/// increasing resource version, stamps it on the object, and fans the event
/// out to all open watches whose scope contains the object.
pub struct MockListWatch<R: Resource> {
    /// Current collection state, served by `list`
    items: Mutex<BTreeMap<ObjectKey, R>>,
    /// Last assigned resource version
    version: AtomicU64,
    /// Open watches by id
    watchers: DashMap<u64, MockWatcher<R>>,
    next_watcher_id: AtomicU64,
    /// Errors returned by upcoming list calls, in order
    list_failures: Mutex<VecDeque<SourceError>>,
    /// Errors returned by upcoming watch calls, in order
    watch_failures: Mutex<VecDeque<SourceError>>,
    list_calls: AtomicUsize,
    watch_calls: AtomicUsize,
    watches_opened: AtomicUsize,
    last_list_options: Mutex<Option<ListOptions>>,
    last_watch_options: Mutex<Option<ListOptions>>,
    watch_opened: Notify,
}

impl<R: Resource> Default for MockListWatch<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Resource> MockListWatch<R> {
    /// Create an empty mock source
    pub fn new() -> Self {
        Self {
            items: Mutex::new(BTreeMap::new()),
            version: AtomicU64::new(0),
            watchers: DashMap::new(),
            next_watcher_id: AtomicU64::new(0),
            list_failures: Mutex::new(VecDeque::new()),
            watch_failures: Mutex::new(VecDeque::new()),
            list_calls: AtomicUsize::new(0),
            watch_calls: AtomicUsize::new(0),
            watches_opened: AtomicUsize::new(0),
            last_list_options: Mutex::new(None),
            last_watch_options: Mutex::new(None),
            watch_opened: Notify::new(),
        }
    }

    /// Create a mock source seeded with the given items
    pub fn with_items(items: Vec<R>) -> Self {
        let source = Self::new();
        source.set_items(items);
        source
    }

    fn next_version(&self) -> ResourceVersion {
        ResourceVersion::from(self.version.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Current resource version of the collection
    pub fn resource_version(&self) -> ResourceVersion {
        ResourceVersion::from(self.version.load(Ordering::SeqCst))
    }

    /// Replace the whole collection without notifying watchers
    ///
    /// Simulates changes the watch stream never delivered; only a relist
    /// will observe them.
    pub fn set_items(&self, items: Vec<R>) {
        let version = self.next_version();
        let mut map = BTreeMap::new();
        for mut item in items {
            let Ok(key) = item.key() else {
                continue;
            };
            item.meta_mut().resource_version = Some(version.clone());
            map.insert(key, item);
        }
        *self.items.lock() = map;
    }

    /// Number of objects currently in the collection
    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    /// Mutate the collection and notify open watches
    ///
    /// Object events are stamped with a fresh resource version. Bookmark
    /// and error events are forwarded unchanged.
    pub fn apply(&self, event: WatchEvent<R>) {
        let event = match event {
            WatchEvent::Added(obj) => WatchEvent::Added(self.upsert(obj)),
            WatchEvent::Modified(obj) => WatchEvent::Modified(self.upsert(obj)),
            WatchEvent::Deleted(mut obj) => {
                obj.meta_mut().resource_version = Some(self.next_version());
                if let Ok(key) = obj.key() {
                    self.items.lock().remove(&key);
                }
                WatchEvent::Deleted(obj)
            }
            other => other,
        };
        self.emit(event);
    }

    fn upsert(&self, mut obj: R) -> R {
        obj.meta_mut().resource_version = Some(self.next_version());
        if let Ok(key) = obj.key() {
            self.items.lock().insert(key, obj.clone());
        }
        obj
    }

    /// Deliver an event to open watches without touching the collection
    ///
    /// Useful for replaying stale or out-of-order events.
    pub fn emit(&self, event: WatchEvent<R>) {
        let key = event.key().and_then(Result::ok);
        self.broadcast(|scope| match &key {
            Some(key) if !scope.contains(key) => None,
            _ => Some(Ok(event.clone())),
        });
    }

    /// End open watches with an error event carrying `status`
    pub fn send_error(&self, status: WatchStatus) {
        self.emit(WatchEvent::Error(status));
    }

    /// Fail open watches with a stream error
    pub fn send_stream_error(&self, err: SourceError) {
        self.broadcast(|_| Some(Err(err.clone())));
    }

    /// Send a bookmark at the current resource version
    pub fn send_bookmark(&self) {
        self.emit(WatchEvent::Bookmark(self.resource_version()));
    }

    fn broadcast(&self, item_for: impl Fn(&NamespaceScope) -> Option<WatchItem<R>>) {
        let mut closed = Vec::new();
        for entry in self.watchers.iter() {
            if let Some(item) = item_for(&entry.scope)
                && entry.tx.send(item).is_err()
            {
                closed.push(*entry.key());
            }
        }
        for id in closed {
            trace!(watcher = id, "Dropping closed mock watch");
            self.watchers.remove(&id);
        }
    }

    /// Close every open watch stream, as a remote disconnect would
    pub fn close_watches(&self) {
        self.watchers.clear();
    }

    /// Make the next `n` list calls fail with `err`
    pub fn fail_next_lists(&self, n: usize, err: SourceError) {
        let mut failures = self.list_failures.lock();
        failures.extend(std::iter::repeat_n(err, n));
    }

    /// Make the next `n` watch calls fail with `err`
    pub fn fail_next_watches(&self, n: usize, err: SourceError) {
        let mut failures = self.watch_failures.lock();
        failures.extend(std::iter::repeat_n(err, n));
    }

    /// Number of list calls received, including failed ones
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// Number of watch calls received, including failed ones
    pub fn watch_calls(&self) -> usize {
        self.watch_calls.load(Ordering::SeqCst)
    }

    /// Number of watches successfully opened
    pub fn watches_opened(&self) -> usize {
        self.watches_opened.load(Ordering::SeqCst)
    }

    /// Number of watches currently open
    pub fn open_watches(&self) -> usize {
        self.watchers.len()
    }

    pub fn last_list_options(&self) -> Option<ListOptions> {
        self.last_list_options.lock().clone()
    }

    pub fn last_watch_options(&self) -> Option<ListOptions> {
        self.last_watch_options.lock().clone()
    }

    /// Wait until at least `n` watches have been opened in total
    pub async fn wait_for_watches(&self, n: usize) {
        loop {
            let notified = self.watch_opened.notified();
            if self.watches_opened() >= n {
                return;
            }
            notified.await;
        }
    }
}

#[async_trait]
impl<R: Resource> ListWatch<R> for MockListWatch<R> {
    async fn list(&self, options: &ListOptions) -> Result<ObjectList<R>, SourceError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_list_options.lock() = Some(options.clone());

        if let Some(err) = self.list_failures.lock().pop_front() {
            return Err(err);
        }

        let items = self
            .items
            .lock()
            .iter()
            .filter(|(key, _)| options.scope.contains(key))
            .map(|(_, item)| item.clone())
            .collect();

        Ok(ObjectList::new(items, self.resource_version()))
    }

    async fn watch(&self, options: &ListOptions) -> Result<WatchStream<R>, SourceError> {
        self.watch_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_watch_options.lock() = Some(options.clone());

        if let Some(err) = self.watch_failures.lock().pop_front() {
            return Err(err);
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.next_watcher_id.fetch_add(1, Ordering::SeqCst);
        self.watchers.insert(
            id,
            MockWatcher {
                scope: options.scope.clone(),
                tx,
            },
        );
        self.watches_opened.fetch_add(1, Ordering::SeqCst);
        self.watch_opened.notify_waiters();
        trace!(watcher = id, scope = %options.scope, "Opened mock watch");

        let stream = futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        });
        Ok(stream.boxed())
    }
}
