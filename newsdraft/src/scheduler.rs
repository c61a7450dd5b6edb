use anyhow::Result;
use chrono::{Duration as ChronoDuration, Local, NaiveDateTime, NaiveTime};
use common::{parse_daily_time, SchedulerConfig};
use std::sync::Arc;
use std::time::Duration;
use tokio::select;
use tokio::sync::Notify;
use tracing::{error, info};

use crate::workflow::{RunOutcome, Workflow};

/// A once-a-day wall-clock trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailySchedule {
    at: NaiveTime,
}

impl DailySchedule {
    /// Parse a 24h "HH:MM" time.
    pub fn parse(value: &str) -> Result<Self> {
        Ok(Self {
            at: parse_daily_time(value)?,
        })
    }

    pub fn time(&self) -> NaiveTime {
        self.at
    }

    /// First trigger strictly after `now`.
    pub fn next_after(&self, now: NaiveDateTime) -> NaiveDateTime {
        let today = now.date().and_time(self.at);
        if today > now {
            today
        } else {
            today + ChronoDuration::days(1)
        }
    }
}

type Clock = Arc<dyn Fn() -> NaiveDateTime + Send + Sync>;

/// Drives workflow runs: optionally once at start, then daily until shutdown
pub struct Scheduler {
    schedule: DailySchedule,
    run_on_start: bool,
    poll_interval: Duration,
    clock: Clock,
}

impl Scheduler {
    pub fn new(schedule: DailySchedule, run_on_start: bool, poll_interval: Duration) -> Self {
        Self {
            schedule,
            run_on_start,
            poll_interval,
            clock: Arc::new(|| Local::now().naive_local()),
        }
    }

    /// Replace the local wall clock used to decide when a run is due.
    pub fn with_clock(mut self, clock: impl Fn() -> NaiveDateTime + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn from_config(config: &SchedulerConfig) -> Result<Self> {
        Ok(Self::new(
            DailySchedule::parse(&config.time)?,
            config.run_on_start,
            Duration::from_secs(config.poll_interval_seconds),
        ))
    }

    /// Run until `shutdown` is notified. Runs never overlap: each one completes
    /// (or is interrupted by shutdown) before the clock is checked again.
    pub async fn run(&self, workflow: Arc<Workflow>, shutdown: Arc<Notify>) {
        info!("Scheduling job daily at {}", self.schedule.time().format("%H:%M"));
        // Computed before the startup run so a run crossing the trigger time still fires it
        let mut next_run = self.schedule.next_after((self.clock)());

        if self.run_on_start {
            info!("Running job once immediately on start...");
            select! {
                _ = run_once(workflow.clone()) => {},
                _ = shutdown.notified() => {
                    info!("scheduler: shutdown requested during startup run");
                    return;
                }
            }
        }

        info!("Scheduler started. Next run at {}", next_run);

        loop {
            select! {
                _ = tokio::time::sleep(self.poll_interval) => {},
                _ = shutdown.notified() => {
                    info!("scheduler: shutdown requested, exiting loop");
                    break;
                }
            }

            if (self.clock)() < next_run {
                continue;
            }

            select! {
                _ = run_once(workflow.clone()) => {},
                _ = shutdown.notified() => {
                    info!("scheduler: shutdown requested during run");
                    break;
                }
            }
            next_run = self.schedule.next_after((self.clock)());
            info!("Next run at {}", next_run);
        }
    }
}

/// Execute one workflow run in its own task so an error or panic is logged
/// without tearing down the caller.
pub async fn run_once(workflow: Arc<Workflow>) -> Option<RunOutcome> {
    match tokio::spawn(async move { workflow.run().await }).await {
        Ok(Ok(outcome)) => {
            info!(?outcome, "workflow run finished");
            Some(outcome)
        }
        Ok(Err(e)) => {
            error!("workflow run failed: {:#}", e);
            None
        }
        Err(join_err) if join_err.is_panic() => {
            error!(%join_err, "workflow run panicked");
            None
        }
        Err(join_err) => {
            error!(%join_err, "workflow run was cancelled");
            None
        }
    }
}
