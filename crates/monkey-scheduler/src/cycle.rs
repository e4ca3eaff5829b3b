//! Day cycle controller — the long-running chaos loop.
//!
//! ```text
//! Idle ──(run hour)──► BuildingSchedule ──► Dispatching ──(all fired)──► Idle
//! ```
//!
//! Each entry is handed to its own task, which sleeps until the entry's
//! fire time and then runs the [`Executor`]. Results come back over a
//! channel and are logged here. Reaching the next run hour while entries
//! are still pending discards them before rebuilding, so two schedules
//! never overlap.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveTime, TimeDelta, Utc};
use chrono_tz::Tz;
use tokio::sync::{mpsc, watch, RwLock};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use monkey_cluster::{ClusterClient, ClusterResult};
use monkey_core::Settings;

use crate::eligibility::EligibilityFilter;
use crate::executor::Executor;
use crate::random::RandomSource;
use crate::result::{ChaosResult, Outcome};
use crate::schedule::{ScheduleBuilder, ScheduleEntry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclePhase {
    Idle,
    BuildingSchedule,
    Dispatching,
}

enum Wake {
    RunHour,
    Reported(ChaosResult),
    TaskDone,
    Shutdown,
}

pub struct DayCycleController {
    settings: Arc<Settings>,
    filter: EligibilityFilter,
    builder: ScheduleBuilder,
    executor: Executor,
    phase: watch::Sender<CyclePhase>,
    /// Results of the current day's entries.
    results: RwLock<Vec<ChaosResult>>,
}

impl DayCycleController {
    pub fn new(
        cluster: Arc<dyn ClusterClient>,
        settings: Arc<Settings>,
        random: Arc<dyn RandomSource>,
    ) -> Self {
        let (phase, _) = watch::channel(CyclePhase::Idle);
        Self {
            filter: EligibilityFilter::new(cluster.clone(), settings.clone()),
            builder: ScheduleBuilder::new(settings.clone(), random.clone()),
            executor: Executor::new(cluster, settings.clone(), random),
            settings,
            phase,
            results: RwLock::new(Vec::new()),
        }
    }

    pub fn phase(&self) -> CyclePhase {
        *self.phase.borrow()
    }

    pub fn subscribe_phase(&self) -> watch::Receiver<CyclePhase> {
        self.phase.subscribe()
    }

    /// Results reported since the last schedule was built.
    pub async fn results(&self) -> Vec<ChaosResult> {
        self.results.read().await.clone()
    }

    /// Evaluate every workload and build today's schedule.
    pub async fn build_schedule(&self, now: DateTime<Utc>) -> ClusterResult<Vec<ScheduleEntry>> {
        self.set_phase(CyclePhase::BuildingSchedule);
        let candidates = match self.filter.candidates().await {
            Ok(c) => c,
            Err(e) => {
                self.set_phase(CyclePhase::Idle);
                return Err(e);
            }
        };
        Ok(self.builder.build(&candidates, now))
    }

    /// Spawn one task per entry. Each sends its result on `results`.
    pub fn dispatch(
        &self,
        entries: Vec<ScheduleEntry>,
        results: mpsc::UnboundedSender<ChaosResult>,
    ) -> JoinSet<()> {
        let mut tasks = JoinSet::new();
        self.set_phase(if entries.is_empty() {
            CyclePhase::Idle
        } else {
            CyclePhase::Dispatching
        });

        for entry in entries {
            let executor = self.executor.clone();
            let results = results.clone();
            tasks.spawn(async move {
                tokio::time::sleep(until(&entry.fire_at)).await;
                debug!(workload = %entry.workload, fire_at = %entry.fire_at, "entry fired");
                let result = executor.execute(&entry).await;
                let _ = results.send(result);
            });
        }
        tasks
    }

    /// Build, dispatch, and wait for every entry to finish.
    pub async fn run_once(&self, now: DateTime<Utc>) -> ClusterResult<Vec<ChaosResult>> {
        let entries = self.build_schedule(now).await?;
        self.results.write().await.clear();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut tasks = self.dispatch(entries, tx);
        while tasks.join_next().await.is_some() {}
        self.set_phase(CyclePhase::Idle);

        let mut results = Vec::new();
        while let Ok(result) = rx.try_recv() {
            self.report(&result).await;
            results.push(result);
        }
        Ok(results)
    }

    /// Run daily cycles until `shutdown` flips. Pending entries are dropped
    /// on shutdown; nothing is resumed after a restart.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let tz = self.settings.time_zone;
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut pending: JoinSet<()> = JoinSet::new();
        let mut first_delay = self
            .settings
            .debug
            .enabled
            .then_some(self.settings.debug.schedule_delay);

        info!(run_hour = self.settings.run_hour, time_zone = %tz, dry_run = self.settings.dry_run, "chaos loop started");

        loop {
            let wait = match first_delay.take() {
                Some(delay) => {
                    info!(delay_secs = delay.as_secs(), "debug mode, scheduling after delay");
                    delay
                }
                None => {
                    let next = next_run_at(Utc::now(), tz, self.settings.run_hour);
                    info!(next_run = %next, "waiting for next scheduling run");
                    until(&next)
                }
            };

            let sleep = tokio::time::sleep(wait);
            tokio::pin!(sleep);
            loop {
                let wake = tokio::select! {
                    _ = &mut sleep => Wake::RunHour,
                    Some(result) = rx.recv() => Wake::Reported(result),
                    Some(_) = pending.join_next(), if !pending.is_empty() => Wake::TaskDone,
                    _ = shutdown.changed() => Wake::Shutdown,
                };

                match wake {
                    Wake::RunHour => break,
                    Wake::Reported(result) => self.report(&result).await,
                    Wake::TaskDone => {
                        if pending.is_empty() {
                            self.set_phase(CyclePhase::Idle);
                        }
                    }
                    Wake::Shutdown => {
                        if !pending.is_empty() {
                            info!(pending = pending.len(), "dropping pending terminations");
                        }
                        pending.shutdown().await;
                        self.set_phase(CyclePhase::Idle);
                        info!("chaos loop shutting down");
                        return;
                    }
                }
            }

            if !pending.is_empty() {
                warn!(pending = pending.len(), "run hour reached with terminations still pending, discarding them");
                pending.shutdown().await;
            }
            self.drain_reports(&mut rx).await;

            match self.build_schedule(Utc::now()).await {
                Ok(entries) => {
                    self.results.write().await.clear();
                    pending = self.dispatch(entries, tx.clone());
                }
                Err(e) => {
                    error!(error = %e, "failed to build schedule, retrying at next run hour");
                }
            }
        }
    }

    /// Report whatever the previous day's tasks already sent, so nothing
    /// from that day lands in the next day's results.
    async fn drain_reports(&self, rx: &mut mpsc::UnboundedReceiver<ChaosResult>) {
        while let Ok(result) = rx.try_recv() {
            self.report(&result).await;
        }
    }

    async fn report(&self, result: &ChaosResult) {
        let workload = result.workload();
        match (result.outcome(), result.error()) {
            (Outcome::Terminated, _) => {
                info!(%workload, pods = ?result.terminated(), "chaos result: terminated")
            }
            (Outcome::DryRun, _) => {
                info!(%workload, pods = ?result.targets(), "chaos result: dry run")
            }
            (Outcome::Skipped(reason), _) => {
                info!(%workload, ?reason, "chaos result: skipped")
            }
            (_, Some(e)) => error!(%workload, error = %e, "chaos result: failed"),
            (_, None) => error!(%workload, "chaos result: failed"),
        }
        self.results.write().await.push(result.clone());
    }

    fn set_phase(&self, phase: CyclePhase) {
        self.phase.send_replace(phase);
    }
}

/// Next occurrence of `run_hour:00` in `tz` strictly after `now`.
pub fn next_run_at(now: DateTime<Utc>, tz: Tz, run_hour: u32) -> DateTime<Tz> {
    let local = now.with_timezone(&tz);
    let at = NaiveTime::from_hms_opt(run_hour, 0, 0).unwrap_or(NaiveTime::MIN);
    let mut date = local.date_naive();
    loop {
        let candidate = date.and_time(at);
        if let Some(run) = candidate.and_local_timezone(tz).earliest() {
            if run > local {
                return run;
            }
        }
        date += TimeDelta::days(1);
    }
}

fn until(at: &DateTime<Tz>) -> Duration {
    (at.with_timezone(&Utc) - Utc::now())
        .to_std()
        .unwrap_or(Duration::ZERO)
}
