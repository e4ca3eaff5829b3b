//! Scheduler error types.

use std::time::Duration;

use monkey_cluster::ClusterError;
use thiserror::Error;

use crate::workload::WorkloadRef;

/// Why a listed workload could not be turned into a [`crate::Workload`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WorkloadError {
    #[error("deployment {workload} does not have {label} label")]
    MissingLabel {
        workload: WorkloadRef,
        label: &'static str,
    },

    #[error("deployment {workload} has non-integer mtbf {value:?}")]
    InvalidMtbf { workload: WorkloadRef, value: String },

    #[error("deployment {workload} has out-of-range mtbf {value:?}")]
    MtbfOutOfRange { workload: WorkloadRef, value: String },

    #[error("deployment {workload} has non-positive mtbf {value}")]
    NonPositiveMtbf { workload: WorkloadRef, value: i64 },
}

/// Failures of a single execution attempt. None of these are fatal.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExecutionError {
    #[error("failed to list pods for {workload}: {source}")]
    ListInstances {
        workload: WorkloadRef,
        #[source]
        source: ClusterError,
    },

    #[error("no running pods for {workload}")]
    NoEligibleInstance { workload: WorkloadRef },

    #[error("failed to delete pod {namespace}/{instance}: {source}")]
    Termination {
        namespace: String,
        instance: String,
        #[source]
        source: ClusterError,
    },

    #[error("deleting pod {namespace}/{instance} timed out after {timeout:?}")]
    Timeout {
        namespace: String,
        instance: String,
        timeout: Duration,
    },
}
