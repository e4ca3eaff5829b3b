//! In-memory cluster.
//!
//! Holds workloads, pods, and events behind a single `RwLock`. Used by the
//! daemon's standalone mode and by tests, which can inject faults to drive
//! the error paths of the chaos loop.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::client::ClusterClient;
use crate::error::{ClusterError, ClusterResult};
use crate::types::{AuditEvent, Instance, Labels, Selector, WorkloadObject};

/// Failure switches for the in-memory cluster.
#[derive(Debug, Clone, Default)]
pub struct Faults {
    pub fail_list_workloads: bool,
    pub fail_metadata: bool,
    pub fail_list_instances: bool,
    pub fail_deletes: bool,
    pub fail_events: bool,
    pub fail_list_events: bool,
    /// Sleep this long before handling each delete.
    pub delete_latency: Option<Duration>,
}

/// A recorded pod deletion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deletion {
    pub namespace: String,
    pub name: String,
    pub grace_period_seconds: u64,
}

#[derive(Default)]
struct ClusterInner {
    workloads: Vec<WorkloadObject>,
    instances: Vec<Instance>,
    events: Vec<AuditEvent>,
    deletions: Vec<Deletion>,
    faults: Faults,
}

#[derive(Default)]
pub struct InMemoryCluster {
    inner: RwLock<ClusterInner>,
}

impl InMemoryCluster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_parts(workloads: Vec<WorkloadObject>, instances: Vec<Instance>) -> Self {
        Self {
            inner: RwLock::new(ClusterInner {
                workloads,
                instances,
                ..ClusterInner::default()
            }),
        }
    }

    /// Insert or replace a workload.
    pub async fn put_workload(&self, workload: WorkloadObject) {
        let mut inner = self.inner.write().await;
        inner
            .workloads
            .retain(|w| !(w.namespace == workload.namespace && w.name == workload.name));
        inner.workloads.push(workload);
    }

    pub async fn remove_workload(&self, namespace: &str, name: &str) {
        let mut inner = self.inner.write().await;
        inner
            .workloads
            .retain(|w| !(w.namespace == namespace && w.name == name));
    }

    /// Set one label on an existing workload. Returns false if it doesn't exist.
    pub async fn set_workload_label(
        &self,
        namespace: &str,
        name: &str,
        key: &str,
        value: &str,
    ) -> bool {
        let mut inner = self.inner.write().await;
        match inner
            .workloads
            .iter_mut()
            .find(|w| w.namespace == namespace && w.name == name)
        {
            Some(w) => {
                w.labels.insert(key.to_string(), value.to_string());
                true
            }
            None => false,
        }
    }

    pub async fn put_instance(&self, instance: Instance) {
        let mut inner = self.inner.write().await;
        inner
            .instances
            .retain(|i| !(i.namespace == instance.namespace && i.name == instance.name));
        inner.instances.push(instance);
    }

    pub async fn set_faults(&self, faults: Faults) {
        self.inner.write().await.faults = faults;
    }

    pub async fn instances(&self) -> Vec<Instance> {
        self.inner.read().await.instances.clone()
    }

    pub async fn deletions(&self) -> Vec<Deletion> {
        self.inner.read().await.deletions.clone()
    }

    pub async fn events(&self) -> Vec<AuditEvent> {
        self.inner.read().await.events.clone()
    }
}

#[async_trait]
impl ClusterClient for InMemoryCluster {
    async fn list_workloads(&self) -> ClusterResult<Vec<WorkloadObject>> {
        let inner = self.inner.read().await;
        if inner.faults.fail_list_workloads {
            return Err(ClusterError::Unavailable("list workloads".to_string()));
        }
        Ok(inner.workloads.clone())
    }

    async fn get_workload_metadata(&self, namespace: &str, name: &str) -> ClusterResult<Labels> {
        let inner = self.inner.read().await;
        if inner.faults.fail_metadata {
            return Err(ClusterError::Unavailable("get workload".to_string()));
        }
        inner
            .workloads
            .iter()
            .find(|w| w.namespace == namespace && w.name == name)
            .map(|w| w.labels.clone())
            .ok_or_else(|| ClusterError::not_found("deployment", namespace, name))
    }

    async fn list_instances(
        &self,
        namespace: &str,
        selector: &Selector,
    ) -> ClusterResult<Vec<Instance>> {
        let inner = self.inner.read().await;
        if inner.faults.fail_list_instances {
            return Err(ClusterError::Unavailable("list pods".to_string()));
        }
        Ok(inner
            .instances
            .iter()
            .filter(|i| i.namespace == namespace && selector.matches(&i.labels))
            .cloned()
            .collect())
    }

    async fn delete_instance(
        &self,
        namespace: &str,
        name: &str,
        grace_period_seconds: u64,
    ) -> ClusterResult<()> {
        let latency = self.inner.read().await.faults.delete_latency;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let mut inner = self.inner.write().await;
        if inner.faults.fail_deletes {
            return Err(ClusterError::Rejected(format!("delete pod {namespace}/{name}")));
        }
        let before = inner.instances.len();
        inner
            .instances
            .retain(|i| !(i.namespace == namespace && i.name == name));
        if inner.instances.len() == before {
            return Err(ClusterError::not_found("pod", namespace, name));
        }
        inner.deletions.push(Deletion {
            namespace: namespace.to_string(),
            name: name.to_string(),
            grace_period_seconds,
        });
        debug!(%namespace, pod = %name, grace_period_seconds, "pod deleted");
        Ok(())
    }

    async fn create_event(&self, event: &AuditEvent) -> ClusterResult<()> {
        let mut inner = self.inner.write().await;
        if inner.faults.fail_events {
            return Err(ClusterError::Rejected("create event".to_string()));
        }
        inner.events.push(event.clone());
        Ok(())
    }

    async fn list_events(&self, namespace: &str) -> ClusterResult<Vec<AuditEvent>> {
        let inner = self.inner.read().await;
        if inner.faults.fail_list_events {
            return Err(ClusterError::Unavailable("list events".to_string()));
        }
        Ok(inner
            .events
            .iter()
            .filter(|e| e.namespace == namespace)
            .cloned()
            .collect())
    }

    async fn server_version(&self) -> ClusterResult<String> {
        Ok("in-memory".to_string())
    }
}
