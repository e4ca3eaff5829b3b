//! Kill counters computed from audit events.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use tracing::debug;

use monkey_cluster::{AuditEvent, ClusterClient, ClusterResult};
use monkey_core::labels::APP_NAME;
use monkey_core::Settings;

/// Pods killed inside each rolling window, ending now.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KillCounters {
    pub last_5_min: u64,
    pub last_60_min: u64,
    pub last_24_hours: u64,
}

impl KillCounters {
    fn add(&mut self, other: KillCounters) {
        self.last_5_min += other.last_5_min;
        self.last_60_min += other.last_60_min;
        self.last_24_hours += other.last_24_hours;
    }
}

/// Count events emitted by kube-monkey by the age of their last timestamp.
///
/// Windows are inclusive and nested, so an event two minutes old counts
/// toward all three. Events from other components are ignored.
pub fn count_recent(events: &[AuditEvent], now: DateTime<Utc>) -> KillCounters {
    let mut counters = KillCounters::default();
    for event in events.iter().filter(|e| e.source_component == APP_NAME) {
        let age = now - event.last_timestamp;
        if age <= TimeDelta::minutes(5) {
            counters.last_5_min += 1;
        }
        if age <= TimeDelta::minutes(60) {
            counters.last_60_min += 1;
        }
        if age <= TimeDelta::hours(24) {
            counters.last_24_hours += 1;
        }
    }
    counters
}

/// Lists audit events in the whitelisted namespaces on demand.
pub struct MetricsCollector {
    cluster: Arc<dyn ClusterClient>,
    namespaces: Vec<String>,
}

impl MetricsCollector {
    pub fn new(cluster: Arc<dyn ClusterClient>, settings: &Settings) -> Self {
        let mut namespaces: Vec<String> =
            settings.whitelisted_namespaces.iter().cloned().collect();
        namespaces.sort();
        Self {
            cluster,
            namespaces,
        }
    }

    pub fn namespaces(&self) -> &[String] {
        &self.namespaces
    }

    /// Count recent kills across all watched namespaces.
    ///
    /// Fails on the first namespace whose events can't be listed; a partial
    /// count would under-report.
    pub async fn collect(&self, now: DateTime<Utc>) -> ClusterResult<KillCounters> {
        let mut total = KillCounters::default();
        for namespace in &self.namespaces {
            let events = self.cluster.list_events(namespace).await?;
            let counters = count_recent(&events, now);
            debug!(
                %namespace,
                events = events.len(),
                last_24_hours = counters.last_24_hours,
                "counted chaos events"
            );
            total.add(counters);
        }
        Ok(total)
    }
}
