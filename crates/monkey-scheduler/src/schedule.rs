//! Daily kill schedule.
//!
//! ```text
//! for each eligible workload:
//!     p = 1 / mtbf                      # mtbf in days
//!     if force_should_kill or U[0,1) < p:
//!         fire_at = today(tz) at start_hour + U[0, (end_hour - start_hour) h)
//! ```
//!
//! Fire times are whole seconds. With `schedule_immediate_kill` the window
//! is bypassed and entries fire `schedule_delay` after the build.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{
    DateTime, Datelike, NaiveDateTime, NaiveTime, SubsecRound, TimeDelta, TimeZone, Utc,
    Weekday,
};
use chrono_tz::Tz;
use serde::Serialize;
use tracing::{debug, info, warn};

use monkey_core::Settings;

use crate::eligibility::Candidate;
use crate::random::RandomSource;
use crate::workload::{Workload, WorkloadRef};

/// One planned termination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduleEntry {
    /// Looked up again at fire time.
    pub workload: WorkloadRef,
    pub fire_at: DateTime<Tz>,
    /// As seen at build time; re-confirmed at fire time.
    pub kill_all: bool,
}

#[derive(Clone)]
pub struct ScheduleBuilder {
    settings: Arc<Settings>,
    random: Arc<dyn RandomSource>,
}

impl ScheduleBuilder {
    pub fn new(settings: Arc<Settings>, random: Arc<dyn RandomSource>) -> Self {
        Self { settings, random }
    }

    /// Build today's entries from evaluated candidates.
    ///
    /// At most one entry per workload. Ineligible candidates never draw.
    pub fn build(&self, candidates: &[Candidate], now: DateTime<Utc>) -> Vec<ScheduleEntry> {
        let today = now.with_timezone(&self.settings.time_zone);
        if self.settings.skip_weekends && matches!(today.weekday(), Weekday::Sat | Weekday::Sun) {
            info!(day = %today.weekday(), "weekend, no terminations scheduled");
            return Vec::new();
        }

        let mut seen = HashSet::new();
        let mut entries = Vec::new();

        for candidate in candidates {
            let reference = candidate.workload.reference();

            if let Some(reason) = candidate.status.skip_reason() {
                debug!(workload = %reference, ?reason, "not eligible for scheduling");
                continue;
            }
            if !seen.insert(reference.clone()) {
                warn!(workload = %reference, "duplicate candidate ignored");
                continue;
            }
            if !self.should_kill(&candidate.workload) {
                debug!(workload = %reference, mtbf = candidate.workload.mtbf(), "not selected today");
                continue;
            }

            let Some(fire_at) = self.fire_time(now) else {
                warn!(workload = %reference, "kill window has no valid instant today, skipping");
                continue;
            };
            info!(
                workload = %reference,
                %fire_at,
                kill_all = candidate.status.kill_all_requested,
                "termination scheduled"
            );
            entries.push(ScheduleEntry {
                workload: reference,
                fire_at,
                kill_all: candidate.status.kill_all_requested,
            });
        }

        info!(entries = entries.len(), candidates = candidates.len(), "schedule built");
        entries
    }

    /// Daily Bernoulli trial with `p = 1 / mtbf`.
    pub fn should_kill(&self, workload: &Workload) -> bool {
        if self.settings.debug.force_should_kill {
            return true;
        }
        self.random.unit() < workload.daily_kill_probability()
    }

    /// Random fire time in today's `[start_hour, end_hour)` window.
    ///
    /// The draw is over real instants, so on a DST day the window may be
    /// shorter or longer than `end_hour - start_hour`. Returns `None` when a
    /// DST jump leaves no instant inside the window.
    pub fn fire_time(&self, now: DateTime<Utc>) -> Option<DateTime<Tz>> {
        let tz = self.settings.time_zone;

        if self.settings.debug.schedule_immediate_kill {
            let delay = TimeDelta::from_std(self.settings.debug.schedule_delay)
                .unwrap_or(TimeDelta::zero());
            return Some((now + delay).trunc_subsecs(0).with_timezone(&tz));
        }

        let date = now.with_timezone(&tz).date_naive();
        let wall = |hour: u32| {
            date.and_time(NaiveTime::from_hms_opt(hour, 0, 0).unwrap_or(NaiveTime::MIN))
        };
        let start = first_instant_from(tz, wall(self.settings.start_hour))?;
        if self.settings.start_hour == self.settings.end_hour {
            return Some(start);
        }
        let end = first_instant_from(tz, wall(self.settings.end_hour))?;

        let window_secs = u64::try_from((end - start).num_seconds()).unwrap_or(0);
        if window_secs == 0 {
            return None;
        }
        let offset = self.random.below(window_secs);
        Some(start + TimeDelta::seconds(offset as i64))
    }
}

/// Earliest instant whose wall clock in `tz` reads `naive` or, if `naive`
/// falls in a DST gap, the instant the gap ends.
fn first_instant_from(tz: Tz, naive: NaiveDateTime) -> Option<DateTime<Tz>> {
    (0..=24 * 60).find_map(|minutes| {
        tz.from_local_datetime(&(naive + TimeDelta::minutes(minutes)))
            .earliest()
    })
}
