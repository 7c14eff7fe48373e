//! Integration tests for the reflector
//!
//! These drive a reflector against `MockListWatch` and observe the store,
//! covering the list/watch cycle, relists, retries, and shutdown.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use mirror_core::{
    ListOptions, ListWatch, MockListWatch, NamespaceScope, ObjectKey, ObjectList, ResourceVersion,
    Service, SourceError, WatchEvent, WatchStatus, WatchStream,
};
use mirror_reflector::{BackoffConfig, Reflector, ReflectorConfig, ReflectorPhase};
use futures::StreamExt;
use mirror_store::Store;
use tokio::time::{Instant, sleep, timeout};
use tokio_test::assert_ok;

fn test_config() -> ReflectorConfig {
    mirror_logging::init_testing();
    ReflectorConfig::default()
        .with_name("test")
        .with_resync_period(Duration::ZERO)
        .with_min_relist_interval(Duration::from_millis(5))
        .with_backoff(BackoffConfig::new(
            Duration::from_millis(10),
            Duration::from_millis(50),
        ))
}

fn key(ns: &str, name: &str) -> ObjectKey {
    ObjectKey::new(ns, name).unwrap()
}

async fn eventually(what: &str, mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !condition() {
        if Instant::now() > deadline {
            panic!("timed out waiting for {what}");
        }
        sleep(Duration::from_millis(5)).await;
    }
}

// ============================================================================
// List / Watch Cycle
// ============================================================================

#[tokio::test]
async fn test_initial_list_seeds_store() {
    let source = Arc::new(MockListWatch::with_items(vec![
        Service::new("default", "svc-a"),
        Service::new("default", "svc-b"),
    ]));
    let store = Arc::new(Store::<Service>::new());
    let handle = Reflector::spawn(source.clone(), store.clone(), test_config());

    assert!(timeout(Duration::from_secs(5), handle.wait_until_synced()).await.unwrap());
    assert!(store.has_synced());
    assert_eq!(store.keys(), vec![key("default", "svc-a"), key("default", "svc-b")]);

    source.wait_for_watches(1).await;
    let watch_options = source.last_watch_options().unwrap();
    assert_eq!(watch_options.resource_version, Some(source.resource_version()));
    assert!(watch_options.allow_bookmarks);

    let status = handle.status();
    assert_eq!(status.lists, 1);
    assert_eq!(status.phase, ReflectorPhase::Watching);

    handle.stop().await;
}

#[tokio::test]
async fn test_watch_events_update_store() {
    let source = Arc::new(MockListWatch::with_items(vec![Service::new("default", "svc-a")]));
    let store = Arc::new(Store::<Service>::new());
    let handle = Reflector::spawn(source.clone(), store.clone(), test_config());
    source.wait_for_watches(1).await;

    source.apply(WatchEvent::Added(Service::new("default", "svc-b")));
    source.apply(WatchEvent::Modified(
        Service::new("default", "svc-a").with_cluster_ip("10.0.0.9"),
    ));
    source.apply(WatchEvent::Deleted(Service::new("default", "svc-b")));

    eventually("three events applied", || handle.status().events_applied == 3).await;
    assert_eq!(store.keys(), vec![key("default", "svc-a")]);
    let svc = store.get(&key("default", "svc-a")).unwrap();
    assert_eq!(svc.spec.cluster_ip.as_deref(), Some("10.0.0.9"));
    assert_eq!(
        handle.status().last_sync_resource_version,
        Some(source.resource_version())
    );
    assert_eq!(source.list_calls(), 1);

    handle.stop().await;
}

#[tokio::test]
async fn test_events_apply_in_receipt_order() {
    let source = Arc::new(MockListWatch::with_items(vec![Service::new("default", "svc-a")]));
    let store = Arc::new(Store::<Service>::new());
    let handle = Reflector::spawn(source.clone(), store.clone(), test_config());
    source.wait_for_watches(1).await;

    // A stale Modified arriving after the Deleted wins because it was applied last.
    let stale = Service::new("default", "svc-a").with_resource_version("1");
    source.emit(WatchEvent::Deleted(Service::new("default", "svc-a").with_resource_version("5")));
    source.emit(WatchEvent::Modified(stale));

    eventually("both events applied", || handle.status().events_applied == 2).await;
    assert!(store.contains(&key("default", "svc-a")));
    assert_eq!(
        handle.status().last_sync_resource_version,
        Some(ResourceVersion::from("1"))
    );

    handle.stop().await;
}

#[tokio::test]
async fn test_bookmark_advances_resume_position() {
    let source = Arc::new(MockListWatch::with_items(vec![Service::new("default", "svc-a")]));
    let store = Arc::new(Store::<Service>::new());
    let handle = Reflector::spawn(source.clone(), store.clone(), test_config());
    source.wait_for_watches(1).await;

    source.emit(WatchEvent::Bookmark(ResourceVersion::from("99")));
    eventually("bookmark applied", || {
        handle.status().last_sync_resource_version == Some(ResourceVersion::from("99"))
    })
    .await;
    assert_eq!(store.len(), 1);

    handle.stop().await;
}

// ============================================================================
// Relist
// ============================================================================

#[tokio::test]
async fn test_relist_after_close_purges_missing_keys() {
    let source = Arc::new(MockListWatch::with_items(vec![
        Service::new("default", "svc-a"),
        Service::new("default", "svc-b"),
    ]));
    let store = Arc::new(Store::<Service>::new());
    let handle = Reflector::spawn(source.clone(), store.clone(), test_config());
    source.wait_for_watches(1).await;

    // The deletion of svc-a is never delivered as an event.
    source.set_items(vec![Service::new("default", "svc-b"), Service::new("default", "svc-c")]);
    source.close_watches();

    eventually("second list", || handle.status().lists == 2).await;
    assert_eq!(store.keys(), vec![key("default", "svc-b"), key("default", "svc-c")]);
    source.wait_for_watches(2).await;

    handle.stop().await;
}

#[tokio::test]
async fn test_expired_watch_triggers_relist() {
    let source = Arc::new(MockListWatch::with_items(vec![Service::new("default", "svc-a")]));
    let store = Arc::new(Store::<Service>::new());
    let handle = Reflector::spawn(source.clone(), store.clone(), test_config());
    source.wait_for_watches(1).await;

    source.send_error(WatchStatus::gone("too old resource version"));

    source.wait_for_watches(2).await;
    assert_eq!(source.list_calls(), 2);
    let status = handle.status();
    assert_eq!(status.consecutive_failures, 0);
    assert_eq!(status.lists, 2);

    handle.stop().await;
}

/// Source whose watches end as soon as they open, like a server with a
/// very short watch timeout
#[derive(Default)]
struct ClosingSource {
    lists: AtomicUsize,
}

#[async_trait]
impl ListWatch<Service> for ClosingSource {
    async fn list(&self, _options: &ListOptions) -> Result<ObjectList<Service>, SourceError> {
        let n = self.lists.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(ObjectList::new(vec![Service::new("default", "svc-a")], n as u64))
    }

    async fn watch(&self, _options: &ListOptions) -> Result<WatchStream<Service>, SourceError> {
        Ok(futures::stream::empty().boxed())
    }
}

#[tokio::test]
async fn test_closing_watches_are_rate_limited() {
    let source = Arc::new(ClosingSource::default());
    let store = Arc::new(Store::<Service>::new());
    let config = test_config().with_min_relist_interval(Duration::from_millis(50));
    let handle = Reflector::spawn(source.clone(), store.clone(), config);

    // Runs on the same single-threaded runtime as the reflector.
    sleep(Duration::from_millis(200)).await;

    let lists = source.lists.load(Ordering::SeqCst);
    assert!(lists >= 2, "expected relists, got {lists}");
    assert!(lists <= 6, "relists not spaced out: {lists}");
    assert!(store.contains(&key("default", "svc-a")));
    assert_eq!(handle.status().consecutive_failures, 0);

    assert_ok!(timeout(Duration::from_secs(5), handle.stop()).await);
}

#[tokio::test]
async fn test_stop_during_relist_wait() {
    let source = Arc::new(ClosingSource::default());
    let store = Arc::new(Store::<Service>::new());
    let config = test_config().with_min_relist_interval(Duration::from_secs(60));
    let handle = Reflector::spawn(source.clone(), store.clone(), config);

    assert!(assert_ok!(timeout(Duration::from_secs(5), handle.wait_until_synced()).await));
    sleep(Duration::from_millis(50)).await;

    assert_ok!(timeout(Duration::from_secs(5), handle.stop()).await);
    assert_eq!(source.lists.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_expired_watch_open_relists_without_backoff() {
    let source = Arc::new(MockListWatch::with_items(vec![Service::new("default", "svc-a")]));
    source.fail_next_watches(
        1,
        SourceError::Status(WatchStatus::gone("too old resource version")),
    );
    let store = Arc::new(Store::<Service>::new());
    let config = test_config().with_backoff(BackoffConfig::new(
        Duration::from_secs(60),
        Duration::from_secs(60),
    ));
    let handle = Reflector::spawn(source.clone(), store.clone(), config);

    assert_ok!(timeout(Duration::from_secs(5), source.wait_for_watches(1)).await);
    assert_eq!(source.list_calls(), 2);
    assert_eq!(source.watch_calls(), 2);
    let status = handle.status();
    assert_eq!(status.consecutive_failures, 0);
    assert_eq!(status.lists, 2);
    assert_eq!(
        source.last_watch_options().unwrap().resource_version,
        Some(source.resource_version())
    );

    handle.stop().await;
}

#[tokio::test]
async fn test_resync_period_forces_relist() {
    let source = Arc::new(MockListWatch::with_items(vec![Service::new("default", "svc-a")]));
    let store = Arc::new(Store::<Service>::new());
    let config = test_config().with_resync_period(Duration::from_millis(30));
    let handle = Reflector::spawn(source.clone(), store.clone(), config);
    source.wait_for_watches(1).await;

    // A change the watch never reports is healed by the periodic relist.
    source.set_items(vec![Service::new("default", "svc-z")]);

    eventually("resync relists", || source.list_calls() >= 3).await;
    eventually("store healed", || store.keys() == vec![key("default", "svc-z")]).await;

    handle.stop().await;
}

// ============================================================================
// Failures and Retries
// ============================================================================

#[tokio::test]
async fn test_list_failure_is_retried() {
    let source = Arc::new(MockListWatch::with_items(vec![Service::new("default", "svc-a")]));
    source.fail_next_lists(2, SourceError::io("connection refused"));
    let store = Arc::new(Store::<Service>::new());
    let handle = Reflector::spawn(source.clone(), store.clone(), test_config());

    assert!(timeout(Duration::from_secs(5), handle.wait_until_synced()).await.unwrap());
    assert_eq!(source.list_calls(), 3);
    assert!(store.contains(&key("default", "svc-a")));
    assert_eq!(handle.status().consecutive_failures, 0);

    handle.stop().await;
}

#[tokio::test]
async fn test_store_survives_outage() {
    let source = Arc::new(MockListWatch::with_items(vec![Service::new("default", "svc-a")]));
    let store = Arc::new(Store::<Service>::new());
    let config = test_config().with_backoff(BackoffConfig::new(
        Duration::from_millis(50),
        Duration::from_millis(50),
    ));
    let handle = Reflector::spawn(source.clone(), store.clone(), config);
    source.wait_for_watches(1).await;

    source.fail_next_lists(3, SourceError::io("source down"));
    source.send_stream_error(SourceError::Closed);

    eventually("backing off", || handle.status().consecutive_failures >= 2).await;
    assert!(store.contains(&key("default", "svc-a")));
    assert!(!handle.is_finished());

    eventually("recovered", || handle.status().lists == 2).await;
    assert_eq!(handle.status().consecutive_failures, 0);

    handle.stop().await;
}

#[tokio::test]
async fn test_watch_open_failure_is_retried() {
    let source = Arc::new(MockListWatch::with_items(vec![Service::new("default", "svc-a")]));
    source.fail_next_watches(1, SourceError::io("watch refused"));
    let store = Arc::new(Store::<Service>::new());
    let handle = Reflector::spawn(source.clone(), store.clone(), test_config());

    source.wait_for_watches(1).await;
    assert_eq!(source.watch_calls(), 2);
    assert_eq!(source.list_calls(), 2);

    handle.stop().await;
}

#[tokio::test]
async fn test_non_gone_error_event_backs_off() {
    let source = Arc::new(MockListWatch::with_items(vec![Service::new("default", "svc-a")]));
    let store = Arc::new(Store::<Service>::new());
    let handle = Reflector::spawn(source.clone(), store.clone(), test_config());
    source.wait_for_watches(1).await;

    source.send_error(WatchStatus::new(500, "internal error"));

    source.wait_for_watches(2).await;
    assert_eq!(source.list_calls(), 2);
    assert_eq!(store.len(), 1);

    handle.stop().await;
}

// ============================================================================
// Scope
// ============================================================================

/// Source that ignores the requested scope, as a careless adapter might
struct UnscopedSource(Arc<MockListWatch<Service>>);

#[async_trait]
impl ListWatch<Service> for UnscopedSource {
    async fn list(&self, options: &ListOptions) -> Result<ObjectList<Service>, SourceError> {
        let options = ListOptions {
            scope: NamespaceScope::All,
            ..options.clone()
        };
        self.0.list(&options).await
    }

    async fn watch(&self, options: &ListOptions) -> Result<WatchStream<Service>, SourceError> {
        let options = ListOptions {
            scope: NamespaceScope::All,
            ..options.clone()
        };
        self.0.watch(&options).await
    }
}

#[tokio::test]
async fn test_out_of_scope_objects_are_dropped() {
    let source = Arc::new(MockListWatch::with_items(vec![
        Service::new("default", "svc-a"),
        Service::new("kube-system", "dns"),
    ]));
    let store = Arc::new(Store::<Service>::new());
    let config = test_config().with_namespace(NamespaceScope::namespace("default"));
    let handle = Reflector::spawn(UnscopedSource(source.clone()), store.clone(), config);
    source.wait_for_watches(1).await;
    assert_eq!(store.keys(), vec![key("default", "svc-a")]);

    source.apply(WatchEvent::Added(Service::new("kube-system", "metrics")));
    source.apply(WatchEvent::Added(Service::new("default", "svc-b")));

    eventually("in-scope event applied", || store.contains(&key("default", "svc-b"))).await;
    assert!(!store.contains(&key("kube-system", "metrics")));
    assert_eq!(source.last_list_options().unwrap().scope, NamespaceScope::All);

    handle.stop().await;
}

// ============================================================================
// Lifecycle
// ============================================================================

#[tokio::test]
async fn test_stop_ends_task() {
    let source = Arc::new(MockListWatch::<Service>::new());
    let store = Arc::new(Store::<Service>::new());
    let handle = Reflector::spawn(source.clone(), store.clone(), test_config());
    source.wait_for_watches(1).await;

    let status_rx = handle.subscribe();
    timeout(Duration::from_secs(5), handle.stop()).await.unwrap();
    assert_eq!(status_rx.borrow().phase, ReflectorPhase::Stopped);
}

#[tokio::test]
async fn test_stop_during_backoff() {
    let source = Arc::new(MockListWatch::<Service>::new());
    source.fail_next_lists(100, SourceError::io("down"));
    let store = Arc::new(Store::<Service>::new());
    let config = test_config().with_backoff(BackoffConfig::new(
        Duration::from_secs(60),
        Duration::from_secs(60),
    ));
    let handle = Reflector::spawn(source.clone(), store.clone(), config);

    eventually("first failure", || handle.status().phase == ReflectorPhase::BackingOff).await;
    timeout(Duration::from_secs(5), handle.stop()).await.unwrap();
    assert_eq!(source.list_calls(), 1);
    assert!(!store.has_synced());
}

#[tokio::test]
async fn test_dropped_handle_detaches() {
    let source = Arc::new(MockListWatch::<Service>::new());
    let store = Arc::new(Store::<Service>::new());
    let handle = Reflector::spawn(source.clone(), store.clone(), test_config());
    source.wait_for_watches(1).await;
    drop(handle);

    source.apply(WatchEvent::Added(Service::new("default", "svc-late")));
    eventually("detached reflector still applies events", || {
        store.contains(&key("default", "svc-late"))
    })
    .await;
}
