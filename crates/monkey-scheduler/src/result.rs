//! Outcome of one execution attempt.

use crate::error::ExecutionError;
use crate::workload::WorkloadRef;

/// Why an entry was dropped at fire time without touching any pod.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    NotEnrolled,
    Blacklisted,
    NotWhitelisted,
    /// Labels changed since the schedule was built and no longer form a
    /// valid workload.
    InvalidMetadata(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Every target pod was deleted.
    Terminated,
    /// Dry run: targets were chosen but not deleted.
    DryRun,
    Skipped(SkipReason),
    NoEligibleInstance,
    Failed,
}

/// Result of executing one schedule entry. Not retried.
#[derive(Debug, Clone)]
pub struct ChaosResult {
    workload: WorkloadRef,
    outcome: Outcome,
    kill_all: bool,
    targets: Vec<String>,
    terminated: Vec<String>,
    error: Option<ExecutionError>,
}

impl ChaosResult {
    pub(crate) fn skipped(workload: WorkloadRef, kill_all: bool, reason: SkipReason) -> Self {
        Self {
            workload,
            outcome: Outcome::Skipped(reason),
            kill_all,
            targets: Vec::new(),
            terminated: Vec::new(),
            error: None,
        }
    }

    pub(crate) fn failed(workload: WorkloadRef, kill_all: bool, error: ExecutionError) -> Self {
        let outcome = match error {
            ExecutionError::NoEligibleInstance { .. } => Outcome::NoEligibleInstance,
            _ => Outcome::Failed,
        };
        Self {
            workload,
            outcome,
            kill_all,
            targets: Vec::new(),
            terminated: Vec::new(),
            error: Some(error),
        }
    }

    pub(crate) fn dry_run(workload: WorkloadRef, kill_all: bool, targets: Vec<String>) -> Self {
        Self {
            workload,
            outcome: Outcome::DryRun,
            kill_all,
            targets,
            terminated: Vec::new(),
            error: None,
        }
    }

    /// Outcome after attempting every target. The first failure wins.
    pub(crate) fn attempted(
        workload: WorkloadRef,
        kill_all: bool,
        targets: Vec<String>,
        terminated: Vec<String>,
        error: Option<ExecutionError>,
    ) -> Self {
        let outcome = if error.is_some() {
            Outcome::Failed
        } else {
            Outcome::Terminated
        };
        Self {
            workload,
            outcome,
            kill_all,
            targets,
            terminated,
            error,
        }
    }

    pub fn workload(&self) -> &WorkloadRef {
        &self.workload
    }

    pub fn outcome(&self) -> &Outcome {
        &self.outcome
    }

    /// Kill mode as confirmed at fire time (or as built, if skipped).
    pub fn kill_all(&self) -> bool {
        self.kill_all
    }

    /// Pods chosen for termination.
    pub fn targets(&self) -> &[String] {
        &self.targets
    }

    /// Pods actually deleted.
    pub fn terminated(&self) -> &[String] {
        &self.terminated
    }

    /// `None` on success, dry run, and skip.
    pub fn error(&self) -> Option<&ExecutionError> {
        self.error.as_ref()
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self.outcome, Outcome::Skipped(_))
    }
}
