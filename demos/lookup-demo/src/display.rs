//! Display utilities for the lookup demo

use colored::Colorize;
use mirror_core::{ObjectKey, Service};
use mirror_lookup::LookupError;
use mirror_reflector::ReflectorStatus;

/// Print a banner
pub fn print_banner() {
    println!("{}", "=== Mirror Lookup Demo ===".cyan().bold());
    println!("{}", "Endpoints to service resolution over a list/watch mirror".dimmed());
    println!();
}

/// Print a scenario step heading
pub fn print_step(n: usize, title: &str) {
    println!();
    println!("{}", format!("[{n}] {title}").cyan().bold());
}

pub fn print_info(msg: &str) {
    println!("{} {}", "[INFO]".blue().bold(), msg);
}

/// Print a resolved service
pub fn print_found(key: &ObjectKey, svc: &Service) {
    let cluster_ip = svc.spec.cluster_ip.as_deref().unwrap_or("None");
    let ports = svc
        .spec
        .ports
        .iter()
        .map(|p| format!("{}/{}", p.port, p.protocol))
        .collect::<Vec<_>>()
        .join(",");
    println!(
        "{} {} {} {} {}",
        "[OK]".green().bold(),
        key,
        "->".dimmed(),
        cluster_ip,
        format!("[{ports}]").dimmed()
    );
}

/// Print a failed lookup
pub fn print_missing(err: &LookupError) {
    println!("{} {}", "[MISS]".yellow().bold(), err);
}

/// Print the reflector's counters
pub fn print_status(status: &ReflectorStatus) {
    println!();
    println!("{}", "Reflector:".cyan().bold());
    println!("  {}: {:?}", "phase".dimmed(), status.phase);
    println!("  {}: {}", "lists".dimmed(), status.lists);
    println!("  {}: {}", "events applied".dimmed(), status.events_applied);
    if let Some(rv) = &status.last_sync_resource_version {
        println!("  {}: {}", "resource version".dimmed(), rv);
    }
}
