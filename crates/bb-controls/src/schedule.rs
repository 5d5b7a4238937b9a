//! Cooperative periodic scheduling for sampled tasks.
//!
//! Each task owns a [`SampleClock`] that tracks when it is next due. The
//! [`PeriodicScheduler`] evaluates all clocks against a single driving time
//! and reports the due tasks in priority order (the order they were added),
//! so a task that produces data is always run before the task consuming it
//! within the same tick.
//!
//! Runs are never queued. A task that falls a whole interval or more behind
//! is rescheduled one interval after the current time, so the missed runs
//! are simply dropped.

use crate::error::{ControlError, ControlResult};
use bb_core::{ensure_finite, ensure_positive};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use tracing::debug;

/// Sample clock tracks when a periodic task should execute.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SampleClock {
    /// Period in seconds.
    pub interval: f64,
    /// Time of next scheduled run.
    pub next_due: f64,
}

impl SampleClock {
    /// Create a clock whose first run is one interval after `start`.
    pub fn new(interval: f64, start: f64) -> ControlResult<Self> {
        let interval = ensure_positive(interval, "task interval must be positive")?;
        let start = ensure_finite(start, "scheduler start time must be finite")?;
        Ok(Self {
            interval,
            next_due: start + interval,
        })
    }

    /// Returns `true` if `now >= next_due`.
    pub fn is_due(&self, now: f64) -> bool {
        now >= self.next_due
    }

    /// Move to the next run after one has executed at `now`.
    ///
    /// Returns the number of whole runs dropped because the task fell behind.
    pub fn advance(&mut self, now: f64) -> u64 {
        let next = self.next_due + self.interval;
        if next > now {
            self.next_due = next;
            return 0;
        }
        let skipped = ((now - self.next_due) / self.interval).floor() as u64;
        self.next_due = now + self.interval;
        skipped
    }

    /// Restart the cadence from `now`.
    pub fn reset(&mut self, now: f64) {
        self.next_due = now + self.interval;
    }

    /// Time until the next run (zero if already due).
    pub fn time_until_due(&self, now: f64) -> f64 {
        (self.next_due - now).max(0.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
struct ScheduledTask<K> {
    key: K,
    clock: SampleClock,
}

/// Single-threaded scheduler over a fixed set of keyed tasks.
///
/// # Example
///
/// ```
/// use bb_controls::PeriodicScheduler;
///
/// #[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// enum Task { Sample, Control }
///
/// let mut sched = PeriodicScheduler::new(0.0);
/// sched.add_task(Task::Sample, 0.25).unwrap();
/// sched.add_task(Task::Control, 1.0).unwrap();
///
/// assert_eq!(sched.poll(0.25), vec![Task::Sample]);
/// assert_eq!(sched.poll(1.0), vec![Task::Sample, Task::Control]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodicScheduler<K> {
    start: f64,
    tasks: Vec<ScheduledTask<K>>,
}

impl<K: Copy + Eq + Debug> PeriodicScheduler<K> {
    /// Create an empty scheduler whose clocks start at `start` seconds.
    pub fn new(start: f64) -> Self {
        Self {
            start,
            tasks: Vec::new(),
        }
    }

    /// Register a task. Tasks added earlier run first within a tick.
    pub fn add_task(&mut self, key: K, interval: f64) -> ControlResult<()> {
        if self.tasks.iter().any(|t| t.key == key) {
            return Err(ControlError::InvalidArg {
                what: "task already scheduled",
            });
        }
        let clock = SampleClock::new(interval, self.start)?;
        self.tasks.push(ScheduledTask { key, clock });
        Ok(())
    }

    /// Tasks due at `now`, in priority order, without advancing them.
    pub fn due(&self, now: f64) -> Vec<K> {
        self.tasks
            .iter()
            .filter(|t| t.clock.is_due(now))
            .map(|t| t.key)
            .collect()
    }

    /// Collect the tasks due at `now` in priority order and advance their clocks.
    pub fn poll(&mut self, now: f64) -> Vec<K> {
        let mut due = Vec::new();
        for task in self.tasks.iter_mut().filter(|t| t.clock.is_due(now)) {
            let skipped = task.clock.advance(now);
            if skipped > 0 {
                debug!(task = ?task.key, skipped, "task fell behind; dropping missed runs");
            }
            due.push(task.key);
        }
        due
    }

    /// Run every due task to completion, one after another.
    pub fn run_pending(&mut self, now: f64, mut run: impl FnMut(K)) -> usize {
        let due = self.poll(now);
        for &key in &due {
            run(key);
        }
        due.len()
    }

    /// Earliest time any task is due.
    pub fn next_due(&self) -> Option<f64> {
        self.tasks
            .iter()
            .map(|t| t.clock.next_due)
            .min_by(|a, b| a.total_cmp(b))
    }

    /// Time until the earliest task is due (zero if one already is).
    pub fn time_until_next(&self, now: f64) -> Option<f64> {
        self.next_due().map(|t| (t - now).max(0.0))
    }

    pub fn clock(&self, key: K) -> Option<&SampleClock> {
        self.tasks.iter().find(|t| t.key == key).map(|t| &t.clock)
    }

    /// Restart all cadences from `now`.
    pub fn reset(&mut self, now: f64) {
        for task in &mut self.tasks {
            task.clock.reset(now);
        }
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
