//! Inventory file — seeds an [`InMemoryCluster`] from TOML.
//!
//! ```toml
//! [[workloads]]
//! namespace = "default"
//! name = "api"
//! replicas = 3
//!
//! [workloads.labels]
//! "kube-monkey/enabled" = "enabled"
//! "kube-monkey/identifier" = "api"
//! "kube-monkey/mtbf" = "2"
//! ```
//!
//! Each workload gets `replicas` running pods named `{name}-{index}` that
//! carry the workload's identifier label. Extra pods can be listed under
//! `[[instances]]`.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use monkey_core::labels::IDENT_LABEL_KEY;

use crate::memory::InMemoryCluster;
use crate::types::{Instance, InstancePhase, Labels, WorkloadObject};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Inventory {
    #[serde(default)]
    pub workloads: Vec<InventoryWorkload>,
    #[serde(default)]
    pub instances: Vec<Instance>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryWorkload {
    pub namespace: String,
    pub name: String,
    #[serde(default = "default_replicas")]
    pub replicas: u32,
    #[serde(default)]
    pub labels: Labels,
}

fn default_replicas() -> u32 {
    1
}

impl Inventory {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("read inventory {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        toml::from_str(content).context("parse inventory")
    }

    /// Expand replicas into pods and build the cluster.
    pub fn into_cluster(self) -> InMemoryCluster {
        let mut instances = Vec::new();
        for w in &self.workloads {
            let mut labels = Labels::new();
            if let Some(ident) = w.labels.get(IDENT_LABEL_KEY) {
                labels.insert(IDENT_LABEL_KEY.to_string(), ident.clone());
            }
            for i in 0..w.replicas {
                instances.push(Instance {
                    namespace: w.namespace.clone(),
                    name: format!("{}-{i}", w.name),
                    uid: format!("{}-{}-{i}", w.namespace, w.name),
                    labels: labels.clone(),
                    phase: InstancePhase::Running,
                });
            }
        }
        instances.extend(self.instances);

        let workloads = self
            .workloads
            .into_iter()
            .map(|w| WorkloadObject {
                namespace: w.namespace,
                name: w.name,
                labels: w.labels,
            })
            .collect();

        InMemoryCluster::from_parts(workloads, instances)
    }
}
