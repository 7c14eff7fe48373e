//! Owner-side handle to a running reflector

use mirror_core::ResourceVersion;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// What the reflector loop is currently doing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReflectorPhase {
    #[default]
    Starting,
    Listing,
    Watching,
    BackingOff,
    Stopped,
}

/// Snapshot of reflector progress
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReflectorStatus {
    pub phase: ReflectorPhase,
    /// True once a full list has been applied to the store
    pub synced: bool,
    /// Current resume position
    pub last_sync_resource_version: Option<ResourceVersion>,
    /// Successful lists so far
    pub lists: u64,
    /// Watch events applied to the store so far
    pub events_applied: u64,
    /// Failed cycles since the last successful list
    pub consecutive_failures: u32,
}

/// Handle returned by [`Reflector::spawn`](crate::Reflector::spawn)
///
/// Dropping the handle detaches the reflector; it keeps running until the
/// runtime shuts down. Call [`stop`](Self::stop) for a graceful exit.
#[derive(Debug)]
pub struct ReflectorHandle {
    name: String,
    shutdown_tx: broadcast::Sender<()>,
    status_rx: watch::Receiver<ReflectorStatus>,
    task: JoinHandle<()>,
}

impl ReflectorHandle {
    pub(crate) fn new(
        name: String,
        shutdown_tx: broadcast::Sender<()>,
        status_rx: watch::Receiver<ReflectorStatus>,
        task: JoinHandle<()>,
    ) -> Self {
        Self {
            name,
            shutdown_tx,
            status_rx,
            task,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current progress snapshot
    pub fn status(&self) -> ReflectorStatus {
        self.status_rx.borrow().clone()
    }

    /// Subscribe to status changes
    pub fn subscribe(&self) -> watch::Receiver<ReflectorStatus> {
        self.status_rx.clone()
    }

    /// True once the first list has been applied
    pub fn has_synced(&self) -> bool {
        self.status_rx.borrow().synced
    }

    /// Wait until the first list has been applied
    ///
    /// Returns `false` if the reflector exited before ever syncing.
    pub async fn wait_until_synced(&self) -> bool {
        let mut rx = self.status_rx.clone();
        rx.wait_for(|status| status.synced).await.is_ok()
    }

    /// True if the reflector task has exited
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Signal the reflector to stop and wait for it to exit
    pub async fn stop(self) {
        // Err only means the task is already gone.
        let _ = self.shutdown_tx.send(());
        match self.task.await {
            Ok(()) => info!(reflector = %self.name, "Reflector stopped"),
            Err(e) => warn!(reflector = %self.name, error = %e, "Reflector task ended abnormally"),
        }
    }
}
