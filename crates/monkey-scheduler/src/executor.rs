//! Executor — carries out one schedule entry at its fire time.
//!
//! ```text
//! re-validate eligibility ─ not eligible ──► Skipped
//!        │
//! list pods (fresh) ─ error ──► Failed(ListInstances)
//!        │
//! keep Running pods ─ none ──► NoEligibleInstance
//!        │
//! kill_all? all : one at random
//!        │
//! dry run? ──► DryRun (logged, nothing deleted)
//!        │
//! delete each (grace period, bounded call) ──► event per deleted pod
//! ```
//!
//! Every failure is contained in the returned [`ChaosResult`].

use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};

use monkey_cluster::{ClusterClient, Instance};
use monkey_core::Settings;

use crate::audit;
use crate::eligibility::EligibilityFilter;
use crate::error::ExecutionError;
use crate::random::RandomSource;
use crate::result::{ChaosResult, SkipReason};
use crate::schedule::ScheduleEntry;
use crate::workload::{Workload, WorkloadRef};

#[derive(Clone)]
pub struct Executor {
    cluster: Arc<dyn ClusterClient>,
    settings: Arc<Settings>,
    random: Arc<dyn RandomSource>,
    filter: EligibilityFilter,
}

impl Executor {
    pub fn new(
        cluster: Arc<dyn ClusterClient>,
        settings: Arc<Settings>,
        random: Arc<dyn RandomSource>,
    ) -> Self {
        let filter = EligibilityFilter::new(cluster.clone(), settings.clone());
        Self {
            cluster,
            settings,
            random,
            filter,
        }
    }

    pub async fn execute(&self, entry: &ScheduleEntry) -> ChaosResult {
        let target = &entry.workload;

        let evaluation = self.filter.evaluate(target).await;
        if let Some(reason) = evaluation.status.skip_reason() {
            info!(workload = %target, ?reason, "no longer eligible, skipping termination");
            return ChaosResult::skipped(target.clone(), entry.kill_all, reason);
        }

        // The identifier may have been relabelled since the schedule was built.
        let labels = evaluation.labels.unwrap_or_default();
        let workload = match Workload::from_labels(&target.namespace, &target.name, &labels) {
            Ok(w) => w,
            Err(e) => {
                warn!(workload = %target, error = %e, "labels no longer valid, skipping termination");
                return ChaosResult::skipped(
                    target.clone(),
                    entry.kill_all,
                    SkipReason::InvalidMetadata(e.to_string()),
                );
            }
        };

        let kill_all = evaluation.status.kill_all_requested;
        if kill_all != entry.kill_all {
            info!(workload = %target, kill_all, "kill-all changed since schedule was built");
        }

        let pods = match self
            .cluster
            .list_instances(workload.namespace(), &workload.selector())
            .await
        {
            Ok(pods) => pods,
            Err(source) => {
                error!(workload = %target, error = %source, "failed to list pods");
                return ChaosResult::failed(
                    target.clone(),
                    kill_all,
                    ExecutionError::ListInstances {
                        workload: target.clone(),
                        source,
                    },
                );
            }
        };

        let mut running: Vec<Instance> = pods.into_iter().filter(Instance::is_running).collect();
        if running.is_empty() {
            warn!(workload = %target, "no running pods to kill");
            return ChaosResult::failed(
                target.clone(),
                kill_all,
                ExecutionError::NoEligibleInstance {
                    workload: target.clone(),
                },
            );
        }

        let victims = if kill_all {
            running
        } else {
            let index = self.random.below(running.len() as u64) as usize;
            vec![running.swap_remove(index.min(running.len() - 1))]
        };
        let names: Vec<String> = victims.iter().map(|p| p.name.clone()).collect();

        if self.settings.dry_run {
            for pod in &victims {
                let event = audit::termination_event(pod, target, Utc::now());
                info!(
                    dry_run = true,
                    workload = %target,
                    pod = %pod.name,
                    grace_period_seconds = self.settings.grace_period_seconds,
                    message = %event.message,
                    "would kill pod"
                );
            }
            return ChaosResult::dry_run(target.clone(), kill_all, names);
        }

        let mut terminated = Vec::with_capacity(victims.len());
        let mut first_error = None;
        for pod in &victims {
            match self.terminate(pod).await {
                Ok(()) => {
                    info!(workload = %target, pod = %pod.name, "pod killed");
                    terminated.push(pod.name.clone());
                    self.emit_audit(pod, target).await;
                }
                Err(e) => {
                    error!(workload = %target, pod = %pod.name, error = %e, "failed to kill pod");
                    first_error.get_or_insert(e);
                }
            }
        }

        ChaosResult::attempted(target.clone(), kill_all, names, terminated, first_error)
    }

    async fn terminate(&self, pod: &Instance) -> Result<(), ExecutionError> {
        let timeout = self.settings.termination_timeout;
        let call = self.cluster.delete_instance(
            &pod.namespace,
            &pod.name,
            self.settings.grace_period_seconds,
        );

        match tokio::time::timeout(timeout, call).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(source)) => Err(ExecutionError::Termination {
                namespace: pod.namespace.clone(),
                instance: pod.name.clone(),
                source,
            }),
            Err(_) => Err(ExecutionError::Timeout {
                namespace: pod.namespace.clone(),
                instance: pod.name.clone(),
                timeout,
            }),
        }
    }

    /// Failures are logged only; the kill itself already happened.
    async fn emit_audit(&self, pod: &Instance, workload: &WorkloadRef) {
        let event = audit::termination_event(pod, workload, Utc::now());
        if let Err(e) = self.cluster.create_event(&event).await {
            warn!(pod = %pod.name, error = %e, "failed to record chaos event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use chrono::Utc;
    use monkey_cluster::{Faults, InMemoryCluster, InstancePhase, Labels, WorkloadObject};
    use monkey_core::labels::{
        ENABLED_LABEL_KEY, ENABLED_LABEL_VALUE, IDENT_LABEL_KEY, KILL_ALL_LABEL_KEY,
        KILL_ALL_LABEL_VALUE, MTBF_LABEL_KEY,
    };

    use crate::random::ScriptedRandom;
    use crate::result::Outcome;

    fn deployment(namespace: &str, name: &str) -> WorkloadObject {
        WorkloadObject::new(namespace, name)
            .with_label(ENABLED_LABEL_KEY, ENABLED_LABEL_VALUE)
            .with_label(IDENT_LABEL_KEY, name)
            .with_label(MTBF_LABEL_KEY, "1")
    }

    fn pod(namespace: &str, ident: &str, index: u32, phase: InstancePhase) -> Instance {
        let mut labels = Labels::new();
        labels.insert(IDENT_LABEL_KEY.into(), ident.into());
        Instance {
            namespace: namespace.into(),
            name: format!("{ident}-{index}"),
            uid: format!("uid-{ident}-{index}"),
            labels,
            phase,
        }
    }

    fn entry(namespace: &str, name: &str, kill_all: bool) -> ScheduleEntry {
        ScheduleEntry {
            workload: WorkloadRef::new(namespace, name),
            fire_at: Utc::now().with_timezone(&chrono_tz::UTC),
            kill_all,
        }
    }

    fn live_settings() -> Settings {
        Settings {
            dry_run: false,
            ..Settings::default()
        }
    }

    fn executor(
        cluster: Arc<InMemoryCluster>,
        settings: Settings,
        random: ScriptedRandom,
    ) -> Executor {
        Executor::new(cluster, Arc::new(settings), Arc::new(random))
    }

    fn three_pods() -> Arc<InMemoryCluster> {
        Arc::new(InMemoryCluster::from_parts(
            vec![deployment("default", "api")],
            (0..3)
                .map(|i| pod("default", "api", i, InstancePhase::Running))
                .collect(),
        ))
    }

    #[tokio::test]
    async fn kills_one_random_running_pod() {
        let cluster = three_pods();
        let ex = executor(cluster.clone(), live_settings(), ScriptedRandom::new().with_integers([1]));

        let result = ex.execute(&entry("default", "api", false)).await;

        assert_eq!(result.outcome(), &Outcome::Terminated);
        assert!(result.is_success());
        assert_eq!(result.terminated(), ["api-1".to_string()]);
        let deletions = cluster.deletions().await;
        assert_eq!(deletions.len(), 1);
        assert_eq!(deletions[0].name, "api-1");
        assert_eq!(deletions[0].grace_period_seconds, 5);
        assert_eq!(cluster.events().await.len(), 1);
    }

    #[tokio::test]
    async fn kill_all_kills_every_running_pod() {
        let cluster = three_pods();
        cluster.put_instance(pod("default", "api", 9, InstancePhase::Pending)).await;
        cluster
            .set_workload_label("default", "api", KILL_ALL_LABEL_KEY, KILL_ALL_LABEL_VALUE)
            .await;
        let ex = executor(cluster.clone(), live_settings(), ScriptedRandom::new());

        let result = ex.execute(&entry("default", "api", true)).await;

        assert_eq!(result.outcome(), &Outcome::Terminated);
        assert!(result.kill_all());
        assert_eq!(result.terminated().len(), 3);
        let remaining = cluster.instances().await;
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].name, "api-9");
        assert_eq!(cluster.events().await.len(), 3);
    }

    #[tokio::test]
    async fn kill_all_is_reconfirmed_at_fire_time() {
        // Built with kill-all, label removed since.
        let cluster = three_pods();
        let ex = executor(cluster.clone(), live_settings(), ScriptedRandom::new());

        let result = ex.execute(&entry("default", "api", true)).await;

        assert!(!result.kill_all());
        assert_eq!(cluster.deletions().await.len(), 1);
    }

    #[tokio::test]
    async fn unenrolled_since_build_is_skipped() {
        let cluster = three_pods();
        cluster
            .set_workload_label("default", "api", ENABLED_LABEL_KEY, "disabled")
            .await;
        let ex = executor(cluster.clone(), live_settings(), ScriptedRandom::new());

        let result = ex.execute(&entry("default", "api", false)).await;

        assert_eq!(result.outcome(), &Outcome::Skipped(SkipReason::NotEnrolled));
        assert!(result.error().is_none());
        assert!(cluster.deletions().await.is_empty());
    }

    #[tokio::test]
    async fn deleted_workload_is_skipped() {
        let cluster = three_pods();
        cluster.remove_workload("default", "api").await;
        let ex = executor(cluster.clone(), live_settings(), ScriptedRandom::new());

        let result = ex.execute(&entry("default", "api", false)).await;

        assert!(result.is_skipped());
        assert!(cluster.deletions().await.is_empty());
    }

    #[tokio::test]
    async fn blacklisted_at_fire_time_is_skipped() {
        let cluster = three_pods();
        let mut settings = live_settings();
        settings.blacklisted_namespaces.insert("default".into());
        let ex = executor(cluster.clone(), settings, ScriptedRandom::new());

        let result = ex.execute(&entry("default", "api", false)).await;

        assert_eq!(result.outcome(), &Outcome::Skipped(SkipReason::Blacklisted));
        assert!(cluster.deletions().await.is_empty());
    }

    #[tokio::test]
    async fn broken_labels_at_fire_time_are_skipped() {
        let cluster = three_pods();
        cluster
            .set_workload_label("default", "api", MTBF_LABEL_KEY, "never")
            .await;
        let ex = executor(cluster.clone(), live_settings(), ScriptedRandom::new());

        let result = ex.execute(&entry("default", "api", false)).await;

        assert!(matches!(
            result.outcome(),
            Outcome::Skipped(SkipReason::InvalidMetadata(_))
        ));
    }

    #[tokio::test]
    async fn only_running_pods_are_targeted() {
        let cluster = Arc::new(InMemoryCluster::from_parts(
            vec![deployment("default", "api")],
            vec![
                pod("default", "api", 0, InstancePhase::Pending),
                pod("default", "api", 1, InstancePhase::Succeeded),
                pod("default", "api", 2, InstancePhase::Running),
            ],
        ));
        let ex = executor(cluster.clone(), live_settings(), ScriptedRandom::new().with_integers([0]));

        let result = ex.execute(&entry("default", "api", false)).await;

        assert_eq!(result.terminated(), ["api-2".to_string()]);
    }

    #[tokio::test]
    async fn no_running_pods_is_reported() {
        let cluster = Arc::new(InMemoryCluster::from_parts(
            vec![deployment("default", "api")],
            vec![pod("default", "api", 0, InstancePhase::Failed)],
        ));
        let ex = executor(cluster.clone(), live_settings(), ScriptedRandom::new());

        let result = ex.execute(&entry("default", "api", false)).await;

        assert_eq!(result.outcome(), &Outcome::NoEligibleInstance);
        assert!(matches!(
            result.error(),
            Some(ExecutionError::NoEligibleInstance { .. })
        ));
        assert!(cluster.deletions().await.is_empty());
    }

    #[tokio::test]
    async fn listing_failure_is_reported() {
        let cluster = three_pods();
        cluster
            .set_faults(Faults {
                fail_list_instances: true,
                ..Faults::default()
            })
            .await;
        let ex = executor(cluster, live_settings(), ScriptedRandom::new());

        let result = ex.execute(&entry("default", "api", false)).await;

        assert_eq!(result.outcome(), &Outcome::Failed);
        assert!(matches!(
            result.error(),
            Some(ExecutionError::ListInstances { .. })
        ));
    }

    #[tokio::test]
    async fn delete_failure_is_reported_not_fatal() {
        let cluster = three_pods();
        cluster
            .set_faults(Faults {
                fail_deletes: true,
                ..Faults::default()
            })
            .await;
        let ex = executor(cluster.clone(), live_settings(), ScriptedRandom::new());

        let result = ex.execute(&entry("default", "api", false)).await;

        assert_eq!(result.outcome(), &Outcome::Failed);
        assert!(matches!(
            result.error(),
            Some(ExecutionError::Termination { .. })
        ));
        assert!(result.terminated().is_empty());
        assert!(cluster.events().await.is_empty());
        assert_eq!(cluster.instances().await.len(), 3);
    }

    #[tokio::test]
    async fn slow_delete_times_out() {
        let cluster = three_pods();
        cluster
            .set_faults(Faults {
                delete_latency: Some(Duration::from_secs(5)),
                ..Faults::default()
            })
            .await;
        let mut settings = live_settings();
        settings.termination_timeout = Duration::from_millis(50);
        let ex = executor(cluster, settings, ScriptedRandom::new());

        let result = ex.execute(&entry("default", "api", false)).await;

        assert!(matches!(result.error(), Some(ExecutionError::Timeout { .. })));
    }

    #[tokio::test]
    async fn audit_failure_does_not_fail_the_kill() {
        let cluster = three_pods();
        cluster
            .set_faults(Faults {
                fail_events: true,
                ..Faults::default()
            })
            .await;
        let ex = executor(cluster.clone(), live_settings(), ScriptedRandom::new());

        let result = ex.execute(&entry("default", "api", false)).await;

        assert_eq!(result.outcome(), &Outcome::Terminated);
        assert!(result.is_success());
        assert_eq!(cluster.deletions().await.len(), 1);
    }

    #[tokio::test]
    async fn dry_run_chooses_but_does_not_delete() {
        let cluster = three_pods();
        let ex = executor(cluster.clone(), Settings::default(), ScriptedRandom::new().with_integers([2]));

        let result = ex.execute(&entry("default", "api", false)).await;

        assert_eq!(result.outcome(), &Outcome::DryRun);
        assert!(result.is_success());
        assert_eq!(result.targets(), ["api-2".to_string()]);
        assert!(result.terminated().is_empty());
        assert!(cluster.deletions().await.is_empty());
        assert!(cluster.events().await.is_empty());
    }
}
