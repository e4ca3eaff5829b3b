//! monkey-metrics — how many pods kube-monkey killed recently.
//!
//! Nothing is stored. Every scrape lists the audit events in the
//! whitelisted namespaces and counts the ones kube-monkey emitted inside
//! three rolling windows.
//!
//! # Architecture
//!
//! ```text
//! MetricsCollector
//!   ├── collect() → lists events per namespace via ClusterClient
//!   └── count_recent() → KillCounters (5 min / 60 min / 24 h)
//!
//! Text exposition
//!   └── render_text() → text/plain for /chaosmetrics
//! ```

pub mod collector;
pub mod exposition;

pub use collector::{count_recent, KillCounters, MetricsCollector};
pub use exposition::render_text;
