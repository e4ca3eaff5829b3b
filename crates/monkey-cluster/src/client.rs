//! The collaborator interface the chaos loop consumes.

use async_trait::async_trait;

use crate::error::ClusterResult;
use crate::types::{AuditEvent, Instance, Labels, Selector, WorkloadObject};

/// Read and mutate cluster state.
///
/// Every call observes live state; callers must not cache results across
/// a scheduling cycle.
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// All workloads in every namespace.
    async fn list_workloads(&self) -> ClusterResult<Vec<WorkloadObject>>;

    /// Current labels of one workload.
    async fn get_workload_metadata(&self, namespace: &str, name: &str) -> ClusterResult<Labels>;

    /// Pods in `namespace` whose labels match `selector`.
    async fn list_instances(
        &self,
        namespace: &str,
        selector: &Selector,
    ) -> ClusterResult<Vec<Instance>>;

    /// Delete a pod, giving it `grace_period_seconds` to shut down.
    async fn delete_instance(
        &self,
        namespace: &str,
        name: &str,
        grace_period_seconds: u64,
    ) -> ClusterResult<()>;

    async fn create_event(&self, event: &AuditEvent) -> ClusterResult<()>;

    async fn list_events(&self, namespace: &str) -> ClusterResult<Vec<AuditEvent>>;

    /// Used at startup to verify the client can reach the cluster.
    async fn server_version(&self) -> ClusterResult<String>;
}
