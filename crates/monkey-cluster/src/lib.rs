//! monkey-cluster — the cluster as seen by kube-monkey.
//!
//! The scheduler never talks to a cluster API directly. It goes through
//! [`ClusterClient`], which exposes exactly the reads and writes the chaos
//! loop needs: list workloads, fetch a workload's labels, list its pods,
//! delete a pod, and record an audit event.
//!
//! # Architecture
//!
//! ```text
//! ClusterClient (async trait, Send + Sync)
//!   ├── InMemoryCluster (standalone runs, tests, fault injection)
//!   │   └── Inventory (TOML seed file)
//!   └── any real API client supplied by the embedder
//! ```
//!
//! Implementations must be safe for concurrent use: every scheduled
//! termination runs in its own task and shares one `Arc<dyn ClusterClient>`.

pub mod client;
pub mod error;
pub mod inventory;
pub mod memory;
pub mod types;

pub use client::ClusterClient;
pub use error::{ClusterError, ClusterResult};
pub use inventory::Inventory;
pub use memory::{Deletion, Faults, InMemoryCluster};
pub use types::*;
