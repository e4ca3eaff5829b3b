//! Cluster object model.
//!
//! A deliberately small subset of what a real cluster exposes: enough to
//! identify workloads, select their pods, and describe a termination.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Label map attached to workloads and pods.
pub type Labels = BTreeMap<String, String>;

// ── Workload ───────────────────────────────────────────────────────

/// A workload as listed from the cluster (a deployment).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkloadObject {
    pub namespace: String,
    pub name: String,
    #[serde(default)]
    pub labels: Labels,
}

impl WorkloadObject {
    pub fn new(namespace: &str, name: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            name: name.to_string(),
            labels: Labels::new(),
        }
    }

    pub fn with_label(mut self, key: &str, value: &str) -> Self {
        self.labels.insert(key.to_string(), value.to_string());
        self
    }
}

// ── Instance ───────────────────────────────────────────────────────

/// Lifecycle phase of a pod.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum InstancePhase {
    Pending,
    #[default]
    Running,
    Succeeded,
    Failed,
    Unknown,
}

/// A single pod.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Instance {
    pub namespace: String,
    pub name: String,
    pub uid: String,
    #[serde(default)]
    pub labels: Labels,
    #[serde(default)]
    pub phase: InstancePhase,
}

impl Instance {
    pub fn is_running(&self) -> bool {
        self.phase == InstancePhase::Running
    }
}

/// Equality selector on a single label.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Selector {
    pub key: String,
    pub value: String,
}

impl Selector {
    pub fn equals(key: &str, value: &str) -> Self {
        Self {
            key: key.to_string(),
            value: value.to_string(),
        }
    }

    pub fn matches(&self, labels: &Labels) -> bool {
        labels.get(&self.key) == Some(&self.value)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

// ── Audit event ────────────────────────────────────────────────────

/// The object an event is about.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ObjectReference {
    pub kind: String,
    pub namespace: String,
    pub name: String,
    pub uid: String,
}

/// A cluster event recording one termination.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuditEvent {
    pub name: String,
    pub namespace: String,
    /// Component that performed the action.
    pub source_component: String,
    /// "Normal" or "Warning".
    pub event_type: String,
    pub reason: String,
    pub message: String,
    pub involved_object: ObjectReference,
    pub first_timestamp: DateTime<Utc>,
    pub last_timestamp: DateTime<Utc>,
    pub count: u32,
}
