//! Immediate and recurring-daily execution of dispatch runs.
//!
//! Two modes, selected once at startup:
//!
//! - **Immediate**: [`run_once`] invokes the dispatch exactly once.
//! - **Recurring**: [`Scheduler::daily`] arms a daily trigger at a local
//!   time-of-day. The loop wakes at a bounded polling interval (default 60s,
//!   plenty for minute-granularity schedules), fires at most once per day,
//!   and awaits each firing to completion before evaluating the next tick:
//!   run N+1 never starts before run N returns. An error escaping a firing
//!   is logged and the scheduler stays armed.
//!
//! The loop is cancellable between runs through a [`StopHandle`]; there is no
//! mid-run cancellation. Time flows through the [`Clock`] seam so tests can
//! drive the due check deterministically.

use std::future::Future;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Local, NaiveDate, NaiveTime};
use thiserror::Error;
use tokio::sync::watch;

use crate::mail::RunSummary;

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("invalid time of day (expected HH:MM): {0}")]
    InvalidTimeOfDay(String),
}

/// Daily time-of-day trigger, interpreted in local time.
///
/// Parsed from 24-hour `HH:MM` form. The engine holds exactly one active
/// schedule at a time; triggers never overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleSpec {
    time_of_day: NaiveTime,
}

impl ScheduleSpec {
    pub fn new(time_of_day: NaiveTime) -> Self {
        Self { time_of_day }
    }

    pub fn time_of_day(&self) -> NaiveTime {
        self.time_of_day
    }
}

impl FromStr for ScheduleSpec {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveTime::parse_from_str(s.trim(), "%H:%M")
            .map(Self::new)
            .map_err(|_| ScheduleError::InvalidTimeOfDay(s.to_string()))
    }
}

impl std::fmt::Display for ScheduleSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.time_of_day.format("%H:%M"))
    }
}

/// Local-time source for the due check.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> DateTime<Local>;
}

/// Wall-clock [`Clock`] used outside of tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Stops a recurring [`Scheduler`] at the next tick boundary.
///
/// Dropping the handle stops the scheduler too; a loop nobody can reach
/// should not keep running.
pub struct StopHandle {
    tx: watch::Sender<bool>,
}

impl StopHandle {
    pub fn stop(&self) {
        let _ = self.tx.send(true);
    }
}

/// Recurring-daily driver for dispatch runs.
///
/// ```ignore
/// let (scheduler, handle) = Scheduler::daily("09:00".parse()?);
/// scheduler.run(|| async { dispatch().await }).await;
/// ```
pub struct Scheduler<C: Clock = SystemClock> {
    spec: ScheduleSpec,
    clock: C,
    poll_interval: Duration,
    stop_rx: watch::Receiver<bool>,
}

impl Scheduler<SystemClock> {
    /// Arm a daily trigger. Returns the scheduler and the handle that stops it.
    pub fn daily(spec: ScheduleSpec) -> (Self, StopHandle) {
        let (tx, stop_rx) = watch::channel(false);
        (
            Self {
                spec,
                clock: SystemClock,
                poll_interval: Duration::from_secs(60),
                stop_rx,
            },
            StopHandle { tx },
        )
    }
}

impl<C: Clock> Scheduler<C> {
    /// Substitute the time source (tests drive a fake clock through this).
    pub fn with_clock<D: Clock>(self, clock: D) -> Scheduler<D> {
        Scheduler {
            spec: self.spec,
            clock,
            poll_interval: self.poll_interval,
            stop_rx: self.stop_rx,
        }
    }

    /// How often to check for a due trigger (default: 60s). The wait is a
    /// plain async sleep, never a busy poll.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Drive the trigger loop until stopped.
    ///
    /// `firing` is invoked on each calendar day the local time-of-day passes
    /// the configured trigger, and awaited inline: firings are strictly
    /// serialized. When
    /// the scheduler arms after today's time has already passed, the first
    /// firing is the next day.
    pub async fn run<F, Fut, E>(mut self, mut firing: F)
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<RunSummary, E>>,
        E: std::fmt::Display,
    {
        let armed_at = self.clock.now();
        let mut last_fired: Option<NaiveDate> = None;
        if armed_at.time() >= self.spec.time_of_day() {
            last_fired = Some(armed_at.date_naive());
        }

        tracing::info!(at = %self.spec, "scheduler armed, dispatching daily");

        loop {
            tokio::select! {
                changed = self.stop_rx.changed() => {
                    match changed {
                        Ok(()) if !*self.stop_rx.borrow() => continue,
                        // Stop requested, or the handle was dropped.
                        _ => break,
                    }
                }
                _ = tokio::time::sleep(self.poll_interval) => {}
            }

            let now = self.clock.now();
            if last_fired == Some(now.date_naive()) || now.time() < self.spec.time_of_day() {
                continue;
            }
            last_fired = Some(now.date_naive());

            match firing().await {
                Ok(summary) => tracing::info!(
                    delivered = summary.delivered,
                    failed = summary.failed,
                    "scheduled dispatch complete"
                ),
                Err(e) => {
                    tracing::error!(error = %e, "scheduled dispatch failed, staying armed");
                }
            }
        }

        tracing::info!("scheduler stopped");
    }
}

/// Immediate mode: invoke the dispatch exactly once and report its summary.
pub async fn run_once<F, Fut, E>(firing: F) -> Result<RunSummary, E>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<RunSummary, E>>,
{
    let summary = firing().await?;
    tracing::info!(
        delivered = summary.delivered,
        failed = summary.failed,
        "dispatch complete"
    );
    Ok(summary)
}
