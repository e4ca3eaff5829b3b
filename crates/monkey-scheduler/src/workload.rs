//! Workloads enrolled in chaos.
//!
//! A [`Workload`] only exists if its labels carry a usable identifier and a
//! positive MTBF. It is rebuilt from the live listing every cycle and never
//! cached across the day.

use std::fmt;
use std::num::{IntErrorKind, NonZeroU64, ParseIntError};

use serde::Serialize;

use monkey_cluster::{Labels, Selector, WorkloadObject};
use monkey_core::labels::{IDENT_LABEL_KEY, MTBF_LABEL_KEY};

use crate::error::WorkloadError;

/// Identity of a workload: where to look it up again.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct WorkloadRef {
    pub namespace: String,
    pub name: String,
}

impl WorkloadRef {
    pub fn new(namespace: &str, name: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            name: name.to_string(),
        }
    }
}

impl fmt::Display for WorkloadRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workload {
    name: String,
    namespace: String,
    identifier: String,
    mtbf: NonZeroU64,
}

impl Workload {
    pub fn from_object(object: &WorkloadObject) -> Result<Self, WorkloadError> {
        Self::from_labels(&object.namespace, &object.name, &object.labels)
    }

    pub fn from_labels(namespace: &str, name: &str, labels: &Labels) -> Result<Self, WorkloadError> {
        let reference = WorkloadRef::new(namespace, name);
        let identifier = identifier(&reference, labels)?;
        let mtbf = mean_time_between_failures(&reference, labels)?;
        Ok(Self {
            name: name.to_string(),
            namespace: namespace.to_string(),
            identifier,
            mtbf,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Mean days between induced failures.
    pub fn mtbf(&self) -> u64 {
        self.mtbf.get()
    }

    pub fn reference(&self) -> WorkloadRef {
        WorkloadRef::new(&self.namespace, &self.name)
    }

    /// Probability of being killed on any given day.
    pub fn daily_kill_probability(&self) -> f64 {
        1.0 / self.mtbf.get() as f64
    }

    /// Selects the pods belonging to this workload. Pods inherit the
    /// identifier label from their deployment.
    pub fn selector(&self) -> Selector {
        Selector::equals(IDENT_LABEL_KEY, &self.identifier)
    }
}

fn identifier(reference: &WorkloadRef, labels: &Labels) -> Result<String, WorkloadError> {
    match labels.get(IDENT_LABEL_KEY) {
        Some(ident) if !ident.is_empty() => Ok(ident.clone()),
        _ => Err(WorkloadError::MissingLabel {
            workload: reference.clone(),
            label: IDENT_LABEL_KEY,
        }),
    }
}

fn mean_time_between_failures(
    reference: &WorkloadRef,
    labels: &Labels,
) -> Result<NonZeroU64, WorkloadError> {
    let raw = labels
        .get(MTBF_LABEL_KEY)
        .ok_or_else(|| WorkloadError::MissingLabel {
            workload: reference.clone(),
            label: MTBF_LABEL_KEY,
        })?;

    // No trimming: " 3 " is not an integer.
    let value: i64 = raw.parse().map_err(|e: ParseIntError| match e.kind() {
        IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => WorkloadError::MtbfOutOfRange {
            workload: reference.clone(),
            value: raw.clone(),
        },
        _ => WorkloadError::InvalidMtbf {
            workload: reference.clone(),
            value: raw.clone(),
        },
    })?;

    u64::try_from(value)
        .ok()
        .and_then(NonZeroU64::new)
        .ok_or_else(|| WorkloadError::NonPositiveMtbf {
            workload: reference.clone(),
            value,
        })
}
