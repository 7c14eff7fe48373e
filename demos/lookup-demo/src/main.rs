//! Mirror Lookup Demo
//!
//! Mirrors a JSON fixture of services through an in-memory list/watch
//! source and resolves endpoints against the mirror.
//!
//! ## Usage
//!
//! ```bash
//! # Resolve endpoints keys against the bundled fixture
//! lookup-demo lookup default/svc-a default/svc-b
//!
//! # Mirror only one namespace from a custom fixture
//! lookup-demo --fixture services.json --namespace default lookup default/frontend
//!
//! # Walk through adds, deletes, and a relist after a missed delete
//! lookup-demo scenario
//! ```

mod display;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use mirror_core::{Endpoints, MockListWatch, NamespaceScope, ObjectKey, Service, WatchEvent};
use mirror_lookup::{ListWatchLookup, ServiceLookup, new_list_watch_service_lookup};
use mirror_logging::MirrorSubscriberBuilder;
use tokio::time::{sleep, timeout};
use tracing::info;

use display::*;

const BUNDLED_FIXTURE: &str = include_str!("../fixtures/services.json");

/// How long to wait for the mirror to reflect a change
const SETTLE_TIMEOUT: Duration = Duration::from_secs(5);

/// Mirror Lookup Demo - endpoints to service resolution
#[derive(Parser)]
#[command(name = "lookup-demo")]
#[command(about = "Resolve endpoints against a list/watch mirror of services")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// JSON array of services to serve (defaults to the bundled fixture)
    #[arg(short, long)]
    fixture: Option<PathBuf>,

    /// Namespace to mirror; empty mirrors all namespaces
    #[arg(short, long, default_value = "")]
    namespace: String,

    /// Resync period in seconds; 0 disables periodic relists
    #[arg(long, default_value_t = 600)]
    resync_secs: u64,

    /// Default log level (RUST_LOG takes precedence)
    #[arg(long, default_value = "warn")]
    log_level: String,

    /// JSONL logs instead of human-readable ones
    #[arg(long)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Look up the service for each endpoints key
    Lookup {
        /// Keys as namespace/name (or name for cluster-scoped)
        #[arg(required = true)]
        keys: Vec<String>,
    },
    /// Demo: apply watch events and a missed delete, showing lookups after each
    Scenario,
}

fn load_fixture(path: Option<&Path>) -> Result<Vec<Service>> {
    let json = match path {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("Failed to read fixture {}", path.display()))?,
        None => BUNDLED_FIXTURE.to_string(),
    };
    serde_json::from_str(&json).context("Failed to decode fixture")
}

fn endpoints_for(key: &ObjectKey) -> Endpoints {
    Endpoints::new(key.namespace(), key.name())
}

fn resolve(lookup: &dyn ServiceLookup, key: &ObjectKey) -> Result<()> {
    match lookup.lookup_service(&endpoints_for(key)) {
        Ok(svc) => print_found(key, &svc),
        Err(e) if e.is_not_found() => print_missing(&e),
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

async fn wait_synced(lookup: &ListWatchLookup<Service>) -> Result<()> {
    let synced = timeout(SETTLE_TIMEOUT, lookup.wait_until_synced())
        .await
        .context("Timed out waiting for the initial list")?;
    if !synced {
        bail!("Reflector stopped before the initial list completed");
    }
    Ok(())
}

/// Wait until a lookup for `key` succeeds (`present`) or misses
async fn wait_for(lookup: &dyn ServiceLookup, key: &ObjectKey, present: bool) -> Result<()> {
    let endpoints = endpoints_for(key);
    timeout(SETTLE_TIMEOUT, async {
        while lookup.lookup_service(&endpoints).is_ok() != present {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .with_context(|| format!("Timed out waiting for {key}"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let _log_guard = MirrorSubscriberBuilder::new()
        .with_level(cli.log_level.as_str())
        .with_pretty(!cli.json_logs)
        .init()?;

    let services = load_fixture(cli.fixture.as_deref())?;
    let source = Arc::new(MockListWatch::with_items(services.clone()));
    let lookup = new_list_watch_service_lookup(
        source.clone(),
        Duration::from_secs(cli.resync_secs),
        cli.namespace.as_str(),
    );
    info!(services = services.len(), "Loaded fixture");

    let result = match cli.command {
        Commands::Lookup { keys } => cmd_lookup(&lookup, &keys).await,
        Commands::Scenario => cmd_scenario(&lookup, &source, &services, &cli.namespace).await,
    };

    if let Some(reflector) = lookup.reflector() {
        print_status(&reflector.status());
    }
    lookup.shutdown().await;
    result
}

async fn cmd_lookup(lookup: &ListWatchLookup<Service>, keys: &[String]) -> Result<()> {
    wait_synced(lookup).await?;
    for raw in keys {
        let key = ObjectKey::parse(raw).with_context(|| format!("Invalid key '{raw}'"))?;
        resolve(lookup, &key)?;
    }
    Ok(())
}

async fn cmd_scenario(
    lookup: &ListWatchLookup<Service>,
    source: &MockListWatch<Service>,
    services: &[Service],
    namespace: &str,
) -> Result<()> {
    let keys = services
        .iter()
        .map(|svc| ObjectKey::for_object(svc))
        .collect::<Result<Vec<_>, _>>()
        .context("Fixture contains a service without a name")?;
    let scope = NamespaceScope::namespace(namespace);
    let in_scope: Vec<&ObjectKey> = keys.iter().filter(|key| scope.contains(key)).collect();
    let [deleted, missed, ..] = in_scope.as_slice() else {
        bail!("Scenario needs at least two services in scope {scope}");
    };

    print_banner();

    print_step(1, "Initial list");
    wait_synced(lookup).await?;
    for key in &keys {
        resolve(lookup, key)?;
    }

    print_step(2, "Watch event: service added");
    let added_ns = if namespace.is_empty() { deleted.namespace() } else { namespace };
    let added = Service::new(added_ns, "demo-added").with_cluster_ip("10.96.0.99").with_port(8080);
    let added_key = ObjectKey::for_object(&added)?;
    source.wait_for_watches(1).await;
    source.apply(WatchEvent::Added(added));
    wait_for(lookup, &added_key, true).await?;
    resolve(lookup, &added_key)?;

    print_step(3, "Watch event: service deleted");
    let gone = services
        .iter()
        .find(|svc| ObjectKey::for_object(*svc).is_ok_and(|key| &key == *deleted))
        .cloned()
        .context("Deleted service missing from fixture")?;
    source.apply(WatchEvent::Deleted(gone));
    wait_for(lookup, deleted, false).await?;
    resolve(lookup, deleted)?;

    print_step(4, "Missed delete, repaired by relist");
    let remaining: Vec<Service> = services
        .iter()
        .filter(|svc| ObjectKey::for_object(*svc).is_ok_and(|key| &key != *missed && &key != *deleted))
        .cloned()
        .chain(lookup.store().get(&added_key).map(|svc| (*svc).clone()))
        .collect();
    source.set_items(remaining);
    print_info(&format!("{missed} removed at the source without a watch event"));
    resolve(lookup, missed)?;
    source.close_watches();
    wait_for(lookup, missed, false).await?;
    resolve(lookup, missed)?;

    Ok(())
}
