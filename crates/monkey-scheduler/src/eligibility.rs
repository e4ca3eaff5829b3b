//! Eligibility filter.
//!
//! Re-derived from live labels both when the schedule is built and when an
//! entry fires. Lookup failures resolve to "not enrolled" and "not
//! kill-all": an unreachable API never makes a workload more killable.

use std::sync::Arc;

use tracing::{debug, warn};

use monkey_cluster::{ClusterClient, ClusterError, ClusterResult, Labels};
use monkey_core::labels::{
    ENABLED_LABEL_KEY, ENABLED_LABEL_VALUE, KILL_ALL_LABEL_KEY, KILL_ALL_LABEL_VALUE,
};
use monkey_core::Settings;

use crate::result::SkipReason;
use crate::workload::{Workload, WorkloadRef};

/// Eligibility facts for one workload at one point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EligibilityStatus {
    pub enrolled: bool,
    pub blacklisted: bool,
    pub whitelisted: bool,
    pub kill_all_requested: bool,
}

impl EligibilityStatus {
    /// Derive from labels. `None` means the lookup failed.
    pub fn from_labels(namespace: &str, labels: Option<&Labels>, settings: &Settings) -> Self {
        let label_is = |key: &str, value: &str| {
            labels
                .and_then(|l| l.get(key))
                .is_some_and(|v| v == value)
        };
        Self {
            enrolled: label_is(ENABLED_LABEL_KEY, ENABLED_LABEL_VALUE),
            blacklisted: settings.is_blacklisted(namespace),
            whitelisted: settings.is_whitelisted(namespace),
            kill_all_requested: label_is(KILL_ALL_LABEL_KEY, KILL_ALL_LABEL_VALUE),
        }
    }

    pub fn is_eligible(&self) -> bool {
        self.skip_reason().is_none()
    }

    pub fn skip_reason(&self) -> Option<SkipReason> {
        if !self.enrolled {
            Some(SkipReason::NotEnrolled)
        } else if self.blacklisted {
            Some(SkipReason::Blacklisted)
        } else if !self.whitelisted {
            Some(SkipReason::NotWhitelisted)
        } else {
            None
        }
    }
}

/// Result of [`EligibilityFilter::evaluate`].
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub status: EligibilityStatus,
    /// Labels as read, if the lookup succeeded.
    pub labels: Option<Labels>,
    /// The lookup failure that was resolved to the fail-safe status.
    pub lookup_error: Option<ClusterError>,
}

/// A constructed workload and its build-time eligibility.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub workload: Workload,
    pub status: EligibilityStatus,
}

#[derive(Clone)]
pub struct EligibilityFilter {
    cluster: Arc<dyn ClusterClient>,
    settings: Arc<Settings>,
}

impl EligibilityFilter {
    pub fn new(cluster: Arc<dyn ClusterClient>, settings: Arc<Settings>) -> Self {
        Self { cluster, settings }
    }

    pub async fn evaluate(&self, workload: &WorkloadRef) -> Evaluation {
        let lookup = self
            .cluster
            .get_workload_metadata(&workload.namespace, &workload.name)
            .await;

        let (labels, lookup_error) = match lookup {
            Ok(labels) => (Some(labels), None),
            Err(e) => {
                debug!(%workload, error = %e, "metadata lookup failed, treating as not enrolled");
                (None, Some(e))
            }
        };

        Evaluation {
            status: EligibilityStatus::from_labels(
                &workload.namespace,
                labels.as_ref(),
                &self.settings,
            ),
            labels,
            lookup_error,
        }
    }

    /// List every workload, construct the valid ones, and evaluate them.
    ///
    /// Construction failures exclude only that workload. A failed listing
    /// fails the whole cycle.
    pub async fn candidates(&self) -> ClusterResult<Vec<Candidate>> {
        let objects = self.cluster.list_workloads().await?;
        let mut candidates = Vec::with_capacity(objects.len());

        for object in &objects {
            let workload = match Workload::from_object(object) {
                Ok(w) => w,
                Err(e) => {
                    let opted_in = object
                        .labels
                        .get(ENABLED_LABEL_KEY)
                        .is_some_and(|v| v == ENABLED_LABEL_VALUE);
                    if opted_in {
                        warn!(error = %e, "enrolled deployment has invalid labels, skipping");
                    } else {
                        debug!(error = %e, "deployment not eligible");
                    }
                    continue;
                }
            };

            let evaluation = self.evaluate(&workload.reference()).await;
            candidates.push(Candidate {
                workload,
                status: evaluation.status,
            });
        }

        debug!(listed = objects.len(), candidates = candidates.len(), "candidates collected");
        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use monkey_cluster::{Faults, InMemoryCluster, WorkloadObject};
    use monkey_core::labels::{IDENT_LABEL_KEY, MTBF_LABEL_KEY};

    fn enrolled(namespace: &str, name: &str) -> WorkloadObject {
        WorkloadObject::new(namespace, name)
            .with_label(ENABLED_LABEL_KEY, ENABLED_LABEL_VALUE)
            .with_label(IDENT_LABEL_KEY, name)
            .with_label(MTBF_LABEL_KEY, "1")
    }

    fn filter(cluster: Arc<InMemoryCluster>) -> EligibilityFilter {
        EligibilityFilter::new(cluster, Arc::new(Settings::default()))
    }

    #[test]
    fn status_requires_all_conditions() {
        let settings = Settings::default();
        let mut labels = Labels::new();
        labels.insert(ENABLED_LABEL_KEY.into(), ENABLED_LABEL_VALUE.into());

        let status = EligibilityStatus::from_labels("default", Some(&labels), &settings);
        assert!(status.is_eligible());
        assert!(!status.kill_all_requested);

        let status = EligibilityStatus::from_labels("kube-system", Some(&labels), &settings);
        assert_eq!(status.skip_reason(), Some(SkipReason::Blacklisted));

        let status = EligibilityStatus::from_labels("staging", Some(&labels), &settings);
        assert_eq!(status.skip_reason(), Some(SkipReason::NotWhitelisted));

        labels.insert(ENABLED_LABEL_KEY.into(), "disabled".into());
        let status = EligibilityStatus::from_labels("default", Some(&labels), &settings);
        assert_eq!(status.skip_reason(), Some(SkipReason::NotEnrolled));
    }

    #[test]
    fn failed_lookup_is_fail_safe() {
        let status = EligibilityStatus::from_labels("default", None, &Settings::default());
        assert!(!status.enrolled);
        assert!(!status.kill_all_requested);
        assert!(!status.is_eligible());
    }

    #[test]
    fn kill_all_requires_exact_value() {
        let settings = Settings::default();
        let mut labels = Labels::new();
        labels.insert(KILL_ALL_LABEL_KEY.into(), "yes".into());
        assert!(!EligibilityStatus::from_labels("default", Some(&labels), &settings).kill_all_requested);

        labels.insert(KILL_ALL_LABEL_KEY.into(), KILL_ALL_LABEL_VALUE.into());
        assert!(EligibilityStatus::from_labels("default", Some(&labels), &settings).kill_all_requested);
    }

    #[tokio::test]
    async fn evaluate_reads_live_labels() {
        let cluster = Arc::new(InMemoryCluster::from_parts(vec![enrolled("default", "api")], vec![]));
        let filter = filter(cluster.clone());
        let api = WorkloadRef::new("default", "api");

        assert!(filter.evaluate(&api).await.status.is_eligible());

        cluster
            .set_workload_label("default", "api", ENABLED_LABEL_KEY, "disabled")
            .await;
        let evaluation = filter.evaluate(&api).await;
        assert!(!evaluation.status.enrolled);
        assert!(evaluation.lookup_error.is_none());
    }

    #[tokio::test]
    async fn evaluate_missing_workload_is_not_enrolled() {
        let filter = filter(Arc::new(InMemoryCluster::new()));
        let evaluation = filter.evaluate(&WorkloadRef::new("default", "gone")).await;
        assert!(!evaluation.status.enrolled);
        assert!(matches!(
            evaluation.lookup_error,
            Some(ClusterError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn evaluate_unreachable_api_is_not_enrolled() {
        let cluster = Arc::new(InMemoryCluster::from_parts(vec![enrolled("default", "api")], vec![]));
        cluster
            .set_faults(Faults {
                fail_metadata: true,
                ..Faults::default()
            })
            .await;
        let evaluation = filter(cluster).evaluate(&WorkloadRef::new("default", "api")).await;
        assert!(!evaluation.status.is_eligible());
        assert!(evaluation.labels.is_none());
    }

    #[tokio::test]
    async fn candidates_exclude_invalid_workloads() {
        let cluster = Arc::new(InMemoryCluster::from_parts(
            vec![
                enrolled("default", "api"),
                WorkloadObject::new("default", "no-ident")
                    .with_label(ENABLED_LABEL_KEY, ENABLED_LABEL_VALUE)
                    .with_label(MTBF_LABEL_KEY, "2"),
                WorkloadObject::new("default", "zero-mtbf")
                    .with_label(ENABLED_LABEL_KEY, ENABLED_LABEL_VALUE)
                    .with_label(IDENT_LABEL_KEY, "zero")
                    .with_label(MTBF_LABEL_KEY, "0"),
                enrolled("kube-system", "dns"),
            ],
            vec![],
        ));

        let candidates = filter(cluster).candidates().await.unwrap();
        let names: Vec<_> = candidates.iter().map(|c| c.workload.name()).collect();
        assert_eq!(names, vec!["api", "dns"]);
        assert!(candidates[0].status.is_eligible());
        assert!(candidates[1].status.blacklisted);
    }

    #[tokio::test]
    async fn candidates_propagate_listing_failure() {
        let cluster = Arc::new(InMemoryCluster::new());
        cluster
            .set_faults(Faults {
                fail_list_workloads: true,
                ..Faults::default()
            })
            .await;
        assert!(filter(cluster).candidates().await.is_err());
    }
}
