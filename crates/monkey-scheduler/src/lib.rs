//! monkey-scheduler — decides which pods die today, and kills them.
//!
//! Once a day at the configured run hour the controller lists workloads,
//! keeps the ones that opted in, and draws a Bernoulli trial per workload
//! with probability `1 / mtbf`. Winners get a random fire time inside the
//! `[start_hour, end_hour)` window. At fire time, eligibility is checked
//! again against live cluster state before any pod is touched.
//!
//! # Architecture
//!
//! ```text
//! DayCycleController
//!   ├── EligibilityFilter (labels → EligibilityStatus, fail-safe)
//!   ├── ScheduleBuilder   (Bernoulli draw + fire time, RandomSource)
//!   └── per-entry task
//!       └── Executor      (re-validate → list pods → delete → audit)
//!               └── ChaosResult → controller (logged, kept for the day)
//! ```
//!
//! No scheduling state is shared between entry tasks. Each task owns one
//! [`ScheduleEntry`] and at most one entry exists per workload per day.

pub mod audit;
pub mod cycle;
pub mod eligibility;
pub mod error;
pub mod executor;
pub mod random;
pub mod result;
pub mod schedule;
pub mod workload;

pub use cycle::{next_run_at, CyclePhase, DayCycleController};
pub use eligibility::{Candidate, EligibilityFilter, EligibilityStatus, Evaluation};
pub use error::{ExecutionError, WorkloadError};
pub use executor::Executor;
pub use random::{RandomSource, ScriptedRandom, SeededRandom};
pub use result::{ChaosResult, Outcome, SkipReason};
pub use schedule::{ScheduleBuilder, ScheduleEntry};
pub use workload::{Workload, WorkloadRef};
