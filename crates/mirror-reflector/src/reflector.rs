//! Background list-then-watch loop
//!
//! Each cycle lists the full collection, replaces the store with it, then
//! applies watch events in receipt order until the stream ends or the
//! resync timer fires. Consecutive cycles start at least
//! `min_relist_interval` apart. Failed cycles are retried with exponential
//! backoff; nothing is ever surfaced to the owner beyond the status snapshot.

use std::sync::Arc;

use futures::StreamExt;
use mirror_core::{ListOptions, ListWatch, Resource, ResourceVersion, WatchEvent, WatchStream};
use mirror_store::Store;
use tokio::sync::{broadcast, watch};
use tokio::time::{Instant, sleep, sleep_until};
use tracing::{Instrument, debug, info, info_span, trace, warn};

use crate::backoff::Backoff;
use crate::config::ReflectorConfig;
use crate::error::SyncError;
use crate::handle::{ReflectorHandle, ReflectorPhase, ReflectorStatus};

/// Why a watch ended without an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WatchEnd {
    /// The source closed the stream
    Closed,
    /// The resync period elapsed
    Resync,
    /// The resume position is too old for the source
    Expired,
}

/// Keeps a [`Store`] in sync with a [`ListWatch`] source
pub struct Reflector<R: Resource, L: ListWatch<R>> {
    config: ReflectorConfig,
    source: L,
    store: Arc<Store<R>>,
    status: watch::Sender<ReflectorStatus>,
    backoff: Backoff,
    /// Resume position for the next watch
    last_sync_version: Option<ResourceVersion>,
}

impl<R: Resource, L: ListWatch<R> + 'static> Reflector<R, L> {
    /// Create a reflector without starting it
    pub fn new(source: L, store: Arc<Store<R>>, config: ReflectorConfig) -> Self {
        let (status, _) = watch::channel(ReflectorStatus::default());
        Self {
            backoff: Backoff::new(config.backoff),
            config,
            source,
            store,
            status,
            last_sync_version: None,
        }
    }

    /// Start a reflector as a background task
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(source: L, store: Arc<Store<R>>, config: ReflectorConfig) -> ReflectorHandle {
        Self::new(source, store, config).start()
    }

    /// Start this reflector as a background task
    pub fn start(self) -> ReflectorHandle {
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let status_rx = self.status.subscribe();
        let name = self.config.name.clone();
        let span = info_span!("reflector", name = %name, kind = R::KIND);

        let task = tokio::spawn(self.run(shutdown_rx).instrument(span));
        ReflectorHandle::new(name, shutdown_tx, status_rx, task)
    }

    /// Run the list/watch loop until a stop signal arrives
    async fn run(mut self, mut shutdown_rx: broadcast::Receiver<()>) {
        info!(
            scope = %self.config.namespace,
            resync_secs = self.config.resync_period.as_secs(),
            "Reflector started"
        );

        loop {
            let cycle_started = Instant::now();
            let outcome = tokio::select! {
                _ = stop_requested(&mut shutdown_rx) => break,
                outcome = self.list_and_watch() => outcome,
            };

            match outcome {
                Ok(end) => {
                    let next_cycle = cycle_started + self.config.min_relist_interval;
                    debug!(
                        reason = ?end,
                        wait_ms = next_cycle.saturating_duration_since(Instant::now()).as_millis() as u64,
                        "Watch ended, relisting"
                    );
                    tokio::select! {
                        _ = stop_requested(&mut shutdown_rx) => break,
                        _ = sleep_until(next_cycle) => {}
                    }
                }
                Err(e) => {
                    let delay = self.backoff.record_failure();
                    let failures = self.backoff.consecutive_failures();
                    warn!(
                        error = %e,
                        failures,
                        retry_in_ms = delay.as_millis() as u64,
                        secs_since_success = self.backoff.last_success().map(|t| t.elapsed().as_secs()),
                        "List/watch cycle failed"
                    );
                    self.status.send_modify(|status| {
                        status.phase = ReflectorPhase::BackingOff;
                        status.consecutive_failures = failures;
                    });

                    tokio::select! {
                        _ = stop_requested(&mut shutdown_rx) => break,
                        _ = sleep(delay) => {}
                    }
                }
            }
        }

        self.set_phase(ReflectorPhase::Stopped);
        info!("Reflector shutting down");
    }

    /// One list followed by one watch
    async fn list_and_watch(&mut self) -> Result<WatchEnd, SyncError> {
        self.set_phase(ReflectorPhase::Listing);
        let options = ListOptions::new(self.config.namespace.clone());

        let list = self.source.list(&options).await.map_err(SyncError::List)?;
        let listed = list.items.len();
        let items: Vec<R> = list
            .items
            .into_iter()
            .filter(|item| self.in_scope(item))
            .collect();
        let summary = self.store.replace(items)?;

        self.backoff.record_success();
        self.last_sync_version = Some(list.resource_version.clone());
        self.status.send_modify(|status| {
            status.phase = ReflectorPhase::Watching;
            status.synced = true;
            status.lists += 1;
            status.consecutive_failures = 0;
            status.last_sync_resource_version = Some(list.resource_version.clone());
        });
        info!(
            resource_version = %list.resource_version,
            listed,
            stored = summary.total,
            purged = summary.purged,
            "Listed collection"
        );

        let watch_options = options
            .with_resource_version(self.last_sync_version.clone())
            .with_timeout(self.config.watch_timeout)
            .with_bookmarks(true);
        let stream = match self.source.watch(&watch_options).await {
            Ok(stream) => stream,
            Err(e) if e.is_expired() => {
                debug!(error = %e, "Resume position expired at watch open");
                self.expire_resume_position();
                return Ok(WatchEnd::Expired);
            }
            Err(e) => return Err(SyncError::Watch(e)),
        };

        self.watch(stream).await
    }

    /// Apply watch events until the stream ends or the resync timer fires
    async fn watch(&mut self, mut stream: WatchStream<R>) -> Result<WatchEnd, SyncError> {
        let resync_at = self
            .config
            .resync_enabled()
            .then(|| Instant::now() + self.config.resync_period);

        loop {
            let next = tokio::select! {
                _ = resync_timer(resync_at) => {
                    debug!("Resync period elapsed");
                    return Ok(WatchEnd::Resync);
                }
                next = stream.next() => next,
            };

            match next {
                None => return Ok(WatchEnd::Closed),
                Some(Err(e)) if e.is_expired() => {
                    self.expire_resume_position();
                    return Ok(WatchEnd::Expired);
                }
                Some(Err(e)) => return Err(SyncError::Watch(e)),
                Some(Ok(WatchEvent::Error(status))) if status.is_gone() => {
                    debug!(message = %status.message, "Resume position expired");
                    self.expire_resume_position();
                    return Ok(WatchEnd::Expired);
                }
                Some(Ok(WatchEvent::Error(status))) => return Err(SyncError::Status(status)),
                Some(Ok(event)) => self.apply(event),
            }
        }
    }

    /// Apply one object or bookmark event to the store
    fn apply(&mut self, event: WatchEvent<R>) {
        let kind = event.kind();
        if let Some(version) = event.resource_version() {
            self.last_sync_version = Some(version.clone());
        }

        match event {
            WatchEvent::Added(obj) | WatchEvent::Modified(obj) => {
                if !self.in_scope(&obj) {
                    return;
                }
                if let Err(e) = self.store.put(obj) {
                    warn!(event = kind, error = %e, "Ignoring watch event");
                    return;
                }
            }
            WatchEvent::Deleted(obj) => {
                if !self.in_scope(&obj) {
                    return;
                }
                match obj.key() {
                    Ok(key) => {
                        self.store.delete(&key);
                    }
                    Err(e) => {
                        warn!(event = kind, error = %e, "Ignoring watch event");
                        return;
                    }
                }
            }
            WatchEvent::Bookmark(_) => {
                trace!(resource_version = ?self.last_sync_version, "Bookmark");
            }
            WatchEvent::Error(_) => return,
        }

        let version = self.last_sync_version.clone();
        self.status.send_modify(|status| {
            status.events_applied += 1;
            status.last_sync_resource_version = version;
        });
    }

    /// Check an object against the configured namespace scope
    ///
    /// Objects without a valid key pass through so the store can reject
    /// and log them.
    fn in_scope(&self, obj: &R) -> bool {
        match obj.key() {
            Ok(key) if !self.config.namespace.contains(&key) => {
                debug!(key = %key, scope = %self.config.namespace, "Dropping object outside scope");
                false
            }
            _ => true,
        }
    }

    fn expire_resume_position(&mut self) {
        self.last_sync_version = None;
        self.status.send_modify(|status| {
            status.last_sync_resource_version = None;
        });
    }

    fn set_phase(&self, phase: ReflectorPhase) {
        self.status.send_modify(|status| status.phase = phase);
    }
}

/// Resolves when a stop signal is received
///
/// A closed channel means the handle was dropped; the reflector is then
/// detached and never stops on its own.
async fn stop_requested(shutdown_rx: &mut broadcast::Receiver<()>) {
    match shutdown_rx.recv().await {
        Ok(()) | Err(broadcast::error::RecvError::Lagged(_)) => {}
        Err(broadcast::error::RecvError::Closed) => std::future::pending().await,
    }
}

async fn resync_timer(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
