//! Rolling mean of recent transducer voltages.
//!
//! The sampler runs faster than the controller; the controller acts on the
//! mean of the samples taken since its previous step. The window therefore
//! holds about one control interval's worth of samples.

use crate::error::{ControlError, ControlResult};
use bb_core::ensure_positive;
use std::collections::VecDeque;

/// Largest window `for_intervals` will build.
pub const MAX_WINDOW: usize = 10_000;

/// Bounded FIFO window of voltage samples.
#[derive(Debug, Clone, PartialEq)]
pub struct VoltageAverager {
    window: VecDeque<f64>,
    capacity: usize,
}

impl VoltageAverager {
    /// Create an averager holding at most `capacity` samples (at least one).
    ///
    /// Storage grows as samples arrive, so a large bound costs nothing up front.
    pub fn new(capacity: usize) -> Self {
        Self {
            window: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    /// Size the window as `max(1, round(control_interval / sample_interval))`,
    /// rejecting ratios above [`MAX_WINDOW`].
    pub fn for_intervals(control_interval_s: f64, sample_interval_s: f64) -> ControlResult<Self> {
        let control = ensure_positive(control_interval_s, "control interval must be positive")?;
        let sample = ensure_positive(sample_interval_s, "sample interval must be positive")?;
        let ratio = (control / sample).round();
        if ratio > MAX_WINDOW as f64 {
            return Err(ControlError::InvalidArg {
                what: "control interval spans too many samples",
            });
        }
        Ok(Self::new(ratio as usize))
    }

    /// Append a sample, evicting the oldest once full.
    pub fn record(&mut self, volts: f64) {
        if self.window.len() == self.capacity {
            self.window.pop_front();
        }
        self.window.push_back(volts);
    }

    /// Arithmetic mean of the samples currently held.
    pub fn average(&self) -> ControlResult<f64> {
        if self.window.is_empty() {
            return Err(ControlError::EmptyWindow);
        }
        let sum: f64 = self.window.iter().sum();
        Ok(sum / self.window.len() as f64)
    }

    /// Most recent sample, if any.
    pub fn latest(&self) -> Option<f64> {
        self.window.back().copied()
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.window.clear();
    }
}
