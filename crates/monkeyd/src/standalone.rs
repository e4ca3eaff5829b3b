//! Standalone assembly: settings from a config file, cluster from an
//! inventory file.

use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tokio::task::JoinHandle;
use tracing::{error, info};

use monkey_cluster::{ClusterClient, InMemoryCluster, Inventory};
use monkey_core::{MonkeyConfig, Settings};

/// Load and validate the config. Any error here is fatal.
pub fn load_settings(path: &Path) -> anyhow::Result<Settings> {
    let settings = MonkeyConfig::from_file(path)
        .and_then(|config| config.validate())
        .with_context(|| format!("invalid config {}", path.display()))?;
    info!(path = %path.display(), "config loaded");
    Ok(settings)
}

/// Seed an in-memory cluster and verify the client answers.
pub async fn load_cluster(path: &Path) -> anyhow::Result<Arc<InMemoryCluster>> {
    let inventory = Inventory::from_file(path)?;
    let workloads = inventory.workloads.len();
    let cluster = Arc::new(inventory.into_cluster());

    let version = cluster
        .server_version()
        .await
        .context("cluster client verification failed")?;
    info!(path = %path.display(), workloads, %version, "cluster client ready");
    Ok(cluster)
}

/// Wait for a background task. A panic or cancellation is logged, not
/// propagated, so shutdown still completes.
pub async fn join_task(name: &str, handle: JoinHandle<()>) -> bool {
    match handle.await {
        Ok(()) => true,
        Err(e) => {
            error!(task = name, error = %e, "background task failed");
            false
        }
    }
}

fn sorted(namespaces: &std::collections::HashSet<String>) -> Vec<&str> {
    let mut names: Vec<&str> = namespaces.iter().map(String::as_str).collect();
    names.sort_unstable();
    names
}

/// Human-readable settings summary for `monkeyd validate`.
pub fn describe(settings: &Settings) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "dry_run = {}", settings.dry_run);
    let _ = writeln!(out, "time_zone = {}", settings.time_zone);
    let _ = writeln!(
        out,
        "hours = run {:02}:00, kill window [{:02}:00, {:02}:00)",
        settings.run_hour, settings.start_hour, settings.end_hour
    );
    let _ = writeln!(out, "grace_period_seconds = {}", settings.grace_period_seconds);
    let _ = writeln!(
        out,
        "termination_timeout_seconds = {}",
        settings.termination_timeout.as_secs()
    );
    let _ = writeln!(out, "skip_weekends = {}", settings.skip_weekends);
    let _ = writeln!(out, "whitelisted_namespaces = {:?}", sorted(&settings.whitelisted_namespaces));
    let _ = writeln!(out, "blacklisted_namespaces = {:?}", sorted(&settings.blacklisted_namespaces));
    if settings.debug.enabled {
        let _ = writeln!(
            out,
            "debug = delay {}s, force_should_kill {}, schedule_immediate_kill {}",
            settings.debug.schedule_delay.as_secs(),
            settings.debug.force_should_kill,
            settings.debug.schedule_immediate_kill
        );
    }
    out
}
