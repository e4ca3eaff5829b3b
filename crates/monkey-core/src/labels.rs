//! Opt-in label keys and values read from workload metadata.
//!
//! There is no value in making these configurable, so they are consts.

/// Name the daemon acts under in audit events.
pub const APP_NAME: &str = "kube-monkey";

/// Stable selector value shared by a workload and its pods.
pub const IDENT_LABEL_KEY: &str = "kube-monkey/identifier";

pub const ENABLED_LABEL_KEY: &str = "kube-monkey/enabled";
pub const ENABLED_LABEL_VALUE: &str = "enabled";

/// Mean days between induced failures, as a decimal string.
pub const MTBF_LABEL_KEY: &str = "kube-monkey/mtbf";

pub const KILL_ALL_LABEL_KEY: &str = "kube-monkey/kill-all";
pub const KILL_ALL_LABEL_VALUE: &str = "kill-all";

pub const KUBE_SYSTEM_NAMESPACE: &str = "kube-system";
pub const DEFAULT_NAMESPACE: &str = "default";
