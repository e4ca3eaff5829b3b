//! config.toml parser and validation.
//!
//! The raw [`MonkeyConfig`] mirrors the file. [`MonkeyConfig::validate`]
//! turns it into an immutable [`Settings`] snapshot that the rest of the
//! daemon reads; nothing downstream looks at the raw file again.

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::labels::{DEFAULT_NAMESPACE, KUBE_SYSTEM_NAMESPACE};

/// Default location of the config file inside the container.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/kube-monkey/config.toml";

/// Errors raised while loading or validating configuration.
///
/// All of these are fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("{field} must be in [0, 23], got {value}")]
    HourOutOfRange { field: &'static str, value: u32 },

    #[error("run_hour ({run_hour}) must be less than start_hour ({start_hour})")]
    RunHourNotBeforeStart { run_hour: u32, start_hour: u32 },

    #[error("start_hour ({start_hour}) must not be greater than end_hour ({end_hour})")]
    StartAfterEnd { start_hour: u32, end_hour: u32 },

    #[error("unknown time zone: {0}")]
    InvalidTimeZone(String),

    #[error("termination_timeout_seconds must be greater than zero")]
    ZeroTerminationTimeout,
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MonkeyConfig {
    pub kubemonkey: KubeMonkeyConfig,
    pub debug: DebugConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KubeMonkeyConfig {
    /// Log terminations without issuing them.
    pub dry_run: bool,
    pub time_zone: String,
    /// Hour at which the daily schedule is built.
    pub run_hour: u32,
    /// First hour in which terminations may fire.
    pub start_hour: u32,
    /// Terminations fire strictly before this hour.
    pub end_hour: u32,
    /// Seconds a pod is given to shut down before a hard kill.
    pub grace_period_seconds: u64,
    pub blacklisted_namespaces: Vec<String>,
    pub whitelisted_namespaces: Vec<String>,
    /// Build an empty schedule on Saturdays and Sundays.
    pub skip_weekends: bool,
    /// Upper bound on a single termination call.
    pub termination_timeout_seconds: u64,
}

impl Default for KubeMonkeyConfig {
    fn default() -> Self {
        Self {
            dry_run: true,
            time_zone: "UTC".to_string(),
            run_hour: 2,
            start_hour: 10,
            end_hour: 16,
            grace_period_seconds: 5,
            blacklisted_namespaces: vec![KUBE_SYSTEM_NAMESPACE.to_string()],
            whitelisted_namespaces: vec![DEFAULT_NAMESPACE.to_string()],
            skip_weekends: false,
            termination_timeout_seconds: 30,
        }
    }
}

/// Debug-only overrides. Never enable these in production.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    /// Run the first scheduling cycle `schedule_delay_seconds` after start.
    pub enabled: bool,
    pub schedule_delay_seconds: u64,
    /// Kill probability of 1 for every eligible workload.
    pub force_should_kill: bool,
    /// Fire at now + `schedule_delay_seconds` instead of inside the window.
    pub schedule_immediate_kill: bool,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            schedule_delay_seconds: 30,
            force_should_kill: false,
            schedule_immediate_kill: false,
        }
    }
}

impl MonkeyConfig {
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Check hour ordering and the time zone, and freeze the result.
    pub fn validate(&self) -> ConfigResult<Settings> {
        let km = &self.kubemonkey;

        for (field, value) in [
            ("run_hour", km.run_hour),
            ("start_hour", km.start_hour),
            ("end_hour", km.end_hour),
        ] {
            if value > 23 {
                return Err(ConfigError::HourOutOfRange { field, value });
            }
        }
        if km.run_hour >= km.start_hour {
            return Err(ConfigError::RunHourNotBeforeStart {
                run_hour: km.run_hour,
                start_hour: km.start_hour,
            });
        }
        if km.start_hour > km.end_hour {
            return Err(ConfigError::StartAfterEnd {
                start_hour: km.start_hour,
                end_hour: km.end_hour,
            });
        }
        if km.termination_timeout_seconds == 0 {
            return Err(ConfigError::ZeroTerminationTimeout);
        }

        let time_zone: Tz = km
            .time_zone
            .parse()
            .map_err(|_| ConfigError::InvalidTimeZone(km.time_zone.clone()))?;

        Ok(Settings {
            dry_run: km.dry_run,
            time_zone,
            run_hour: km.run_hour,
            start_hour: km.start_hour,
            end_hour: km.end_hour,
            grace_period_seconds: km.grace_period_seconds,
            blacklisted_namespaces: km.blacklisted_namespaces.iter().cloned().collect(),
            whitelisted_namespaces: km.whitelisted_namespaces.iter().cloned().collect(),
            skip_weekends: km.skip_weekends,
            termination_timeout: Duration::from_secs(km.termination_timeout_seconds),
            debug: DebugSettings {
                enabled: self.debug.enabled,
                schedule_delay: Duration::from_secs(self.debug.schedule_delay_seconds),
                force_should_kill: self.debug.force_should_kill,
                schedule_immediate_kill: self.debug.schedule_immediate_kill,
            },
        })
    }
}

/// Validated, immutable configuration snapshot.
///
/// Namespace lists are held as sets since membership is checked for every
/// workload on every cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub dry_run: bool,
    pub time_zone: Tz,
    pub run_hour: u32,
    pub start_hour: u32,
    pub end_hour: u32,
    pub grace_period_seconds: u64,
    pub blacklisted_namespaces: HashSet<String>,
    pub whitelisted_namespaces: HashSet<String>,
    pub skip_weekends: bool,
    pub termination_timeout: Duration,
    pub debug: DebugSettings,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DebugSettings {
    pub enabled: bool,
    pub schedule_delay: Duration,
    pub force_should_kill: bool,
    pub schedule_immediate_kill: bool,
}

impl Settings {
    pub fn is_blacklisted(&self, namespace: &str) -> bool {
        self.blacklisted_namespaces.contains(namespace)
    }

    pub fn is_whitelisted(&self, namespace: &str) -> bool {
        self.whitelisted_namespaces.contains(namespace)
    }
}

impl Default for Settings {
    fn default() -> Self {
        // The built-in defaults always pass validation.
        Self {
            dry_run: true,
            time_zone: Tz::UTC,
            run_hour: 2,
            start_hour: 10,
            end_hour: 16,
            grace_period_seconds: 5,
            blacklisted_namespaces: HashSet::from([KUBE_SYSTEM_NAMESPACE.to_string()]),
            whitelisted_namespaces: HashSet::from([DEFAULT_NAMESPACE.to_string()]),
            skip_weekends: false,
            termination_timeout: Duration::from_secs(30),
            debug: DebugSettings {
                enabled: false,
                schedule_delay: Duration::from_secs(30),
                force_should_kill: false,
                schedule_immediate_kill: false,
            },
        }
    }
}
