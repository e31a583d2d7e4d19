//! Recurring-scheduler behavior, driven by a fake clock.

use std::convert::Infallible;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Local, TimeZone};
use mailfan::{Clock, DeliverError, RunSummary, ScheduleSpec, Scheduler};

const POLL: Duration = Duration::from_millis(5);
const SETTLE: Duration = Duration::from_millis(100);

#[derive(Clone)]
struct FakeClock(Arc<Mutex<DateTime<Local>>>);

impl FakeClock {
    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> Self {
        Self(Arc::new(Mutex::new(
            Local.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap(),
        )))
    }

    fn set(&self, y: i32, mo: u32, d: u32, h: u32, mi: u32) {
        *self.0.lock().unwrap() = Local.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap();
    }
}

impl Clock for FakeClock {
    fn now(&self) -> DateTime<Local> {
        *self.0.lock().unwrap()
    }
}

fn counting_firing(
    counter: Arc<AtomicUsize>,
) -> impl FnMut() -> std::future::Ready<Result<RunSummary, Infallible>> {
    move || {
        counter.fetch_add(1, Ordering::SeqCst);
        std::future::ready(Ok(RunSummary::default()))
    }
}

#[tokio::test]
async fn fires_once_when_time_of_day_passes_and_stays_armed() {
    let clock = FakeClock::at(2025, 3, 10, 8, 59);
    let spec: ScheduleSpec = "09:00".parse().unwrap();
    let (scheduler, handle) = Scheduler::daily(spec);
    let scheduler = scheduler.with_clock(clock.clone()).poll_interval(POLL);

    let fired = Arc::new(AtomicUsize::new(0));
    let firing = counting_firing(fired.clone());
    let task = tokio::spawn(async move { scheduler.run(firing).await });

    tokio::time::sleep(SETTLE).await;
    assert_eq!(fired.load(Ordering::SeqCst), 0, "before time of day");

    clock.set(2025, 3, 10, 9, 0);
    tokio::time::sleep(SETTLE).await;
    assert_eq!(fired.load(Ordering::SeqCst), 1, "first tick past time of day");

    tokio::time::sleep(SETTLE).await;
    assert_eq!(fired.load(Ordering::SeqCst), 1, "at most once per day");
    assert!(!task.is_finished(), "scheduler remains armed");

    handle.stop();
    task.await.unwrap();
}

#[tokio::test]
async fn arming_after_todays_time_defers_to_tomorrow() {
    let clock = FakeClock::at(2025, 3, 10, 10, 0);
    let spec: ScheduleSpec = "09:00".parse().unwrap();
    let (scheduler, handle) = Scheduler::daily(spec);
    let scheduler = scheduler.with_clock(clock.clone()).poll_interval(POLL);

    let fired = Arc::new(AtomicUsize::new(0));
    let firing = counting_firing(fired.clone());
    let task = tokio::spawn(async move { scheduler.run(firing).await });

    tokio::time::sleep(SETTLE).await;
    assert_eq!(fired.load(Ordering::SeqCst), 0, "no catch-up firing today");

    clock.set(2025, 3, 11, 9, 0);
    tokio::time::sleep(SETTLE).await;
    assert_eq!(fired.load(Ordering::SeqCst), 1, "fires the next day");

    handle.stop();
    task.await.unwrap();
}

#[tokio::test]
async fn stop_ends_the_loop_without_firing() {
    let clock = FakeClock::at(2025, 3, 10, 8, 0);
    let spec: ScheduleSpec = "09:00".parse().unwrap();
    let (scheduler, handle) = Scheduler::daily(spec);
    let scheduler = scheduler.with_clock(clock.clone()).poll_interval(POLL);

    let fired = Arc::new(AtomicUsize::new(0));
    let firing = counting_firing(fired.clone());
    let task = tokio::spawn(async move { scheduler.run(firing).await });

    tokio::time::sleep(SETTLE).await;
    handle.stop();
    task.await.unwrap();

    assert_eq!(fired.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn firing_error_leaves_scheduler_armed() {
    let clock = FakeClock::at(2025, 3, 10, 8, 59);
    let spec: ScheduleSpec = "09:00".parse().unwrap();
    let (scheduler, handle) = Scheduler::daily(spec);
    let scheduler = scheduler.with_clock(clock.clone()).poll_interval(POLL);

    let attempts = Arc::new(AtomicUsize::new(0));
    let seen = attempts.clone();
    let firing = move || {
        let n = seen.fetch_add(1, Ordering::SeqCst);
        std::future::ready(if n == 0 {
            Err(DeliverError::Connect("connection refused".to_string()))
        } else {
            Ok(RunSummary::default())
        })
    };
    let task = tokio::spawn(async move { scheduler.run(firing).await });

    tokio::time::sleep(SETTLE).await;
    clock.set(2025, 3, 10, 9, 0);
    tokio::time::sleep(SETTLE).await;
    assert_eq!(attempts.load(Ordering::SeqCst), 1, "failing firing happened");
    assert!(!task.is_finished(), "error did not crash the scheduler");

    clock.set(2025, 3, 11, 9, 0);
    tokio::time::sleep(SETTLE).await;
    assert_eq!(attempts.load(Ordering::SeqCst), 2, "fires again the next day");

    handle.stop();
    task.await.unwrap();
}

#[tokio::test]
async fn dropping_the_handle_stops_the_scheduler() {
    let clock = FakeClock::at(2025, 3, 10, 8, 0);
    let spec: ScheduleSpec = "09:00".parse().unwrap();
    let (scheduler, handle) = Scheduler::daily(spec);
    let scheduler = scheduler.with_clock(clock).poll_interval(POLL);

    let fired = Arc::new(AtomicUsize::new(0));
    let firing = counting_firing(fired.clone());
    let task = tokio::spawn(async move { scheduler.run(firing).await });

    drop(handle);
    tokio::time::sleep(SETTLE).await;
    assert!(task.is_finished());
}
