//! Audit events for terminations.

use chrono::{DateTime, Utc};

use monkey_cluster::{AuditEvent, Instance, ObjectReference};
use monkey_core::labels::APP_NAME;

use crate::workload::WorkloadRef;

pub const EVENT_TYPE: &str = "Warning";
pub const EVENT_REASON: &str = "Chaos";

/// Build the event recording that `instance` of `workload` was killed.
pub fn termination_event(
    instance: &Instance,
    workload: &WorkloadRef,
    now: DateTime<Utc>,
) -> AuditEvent {
    AuditEvent {
        // Events are keyed by name, so suffix a timestamp to keep
        // repeated kills of a same-named pod distinct.
        name: format!(
            "{APP_NAME}-{}.{:x}",
            instance.name,
            now.timestamp_nanos_opt().unwrap_or_default()
        ),
        namespace: instance.namespace.clone(),
        source_component: APP_NAME.to_string(),
        event_type: EVENT_TYPE.to_string(),
        reason: EVENT_REASON.to_string(),
        message: format!(
            "{APP_NAME} killed pod {} in deployment {}",
            instance.name, workload.name
        ),
        involved_object: ObjectReference {
            kind: "Pod".to_string(),
            namespace: instance.namespace.clone(),
            name: instance.name.clone(),
            uid: instance.uid.clone(),
        },
        first_timestamp: now,
        last_timestamp: now,
        count: 1,
    }
}
