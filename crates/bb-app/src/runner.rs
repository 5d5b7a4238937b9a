//! The driving loop: clock, stop signal and main loop.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use bb_results::RecordSink;
use chrono::{Local, NaiveDateTime};
use tracing::info;

use crate::control_loop::{ControlLoop, TaskOutcome};
use crate::device::BlowerDevice;

/// Time source for the loop.
///
/// `now_s` is monotonic seconds for scheduling; `wall` is local wall-clock
/// time for log rows and file rotation.
pub trait Clock {
    fn now_s(&self) -> f64;
    fn wall(&self) -> NaiveDateTime;
    fn sleep(&mut self, secs: f64);
}

/// Real time: monotonic seconds since construction plus the local clock.
pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_s(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }

    fn wall(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }

    fn sleep(&mut self, secs: f64) {
        if secs > 0.0 {
            std::thread::sleep(Duration::from_secs_f64(secs));
        }
    }
}

/// Cloneable stop request shared with whoever ends the run.
#[derive(Clone, Debug, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    /// Longest sleep between stop-signal checks (seconds).
    pub tick_resolution_s: f64,
    /// Stop on its own after this many seconds.
    pub max_runtime_s: Option<f64>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            tick_resolution_s: 0.05,
            max_runtime_s: None,
        }
    }
}

/// Counts of task outcomes over a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub ticks: u64,
    pub completed: u64,
    pub skipped: u64,
    pub failed: u64,
}

/// Drive the loop until `stop` is raised (or the optional runtime elapses).
///
/// The stop signal is checked once per base tick, between tasks; a task in
/// progress always runs to completion. Between ticks the driver sleeps until
/// the next task is due, but never longer than the tick resolution.
pub fn run_loop<D, S, C>(
    control: &mut ControlLoop<D, S>,
    clock: &mut C,
    stop: &StopHandle,
    opts: RunOptions,
) -> RunSummary
where
    D: BlowerDevice,
    S: RecordSink,
    C: Clock,
{
    let mut summary = RunSummary::default();
    let started = clock.now_s();
    info!(
        resolution_s = opts.tick_resolution_s,
        max_runtime_s = ?opts.max_runtime_s,
        "control loop running"
    );

    while !stop.is_stopped() {
        let now = clock.now_s();
        if opts.max_runtime_s.is_some_and(|limit| now - started >= limit) {
            break;
        }

        summary.ticks += 1;
        for (_, outcome) in control.tick(now, clock.wall()) {
            match outcome {
                TaskOutcome::Completed => summary.completed += 1,
                TaskOutcome::Skipped(_) => summary.skipped += 1,
                TaskOutcome::Failed(_) => summary.failed += 1,
            }
        }

        let wait = control
            .time_until_next(clock.now_s())
            .min(opts.tick_resolution_s);
        clock.sleep(wait);
    }

    info!(?summary, "control loop stopped");
    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_handle_is_shared() {
        let stop = StopHandle::new();
        let other = stop.clone();
        assert!(!stop.is_stopped());
        other.stop();
        assert!(stop.is_stopped());
    }

    #[test]
    fn system_clock_is_monotonic() {
        let mut clock = SystemClock::new();
        let a = clock.now_s();
        clock.sleep(0.001);
        assert!(clock.now_s() > a);
    }
}
