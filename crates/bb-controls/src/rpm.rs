//! Blower speed from the encoder's timer/counter pair.
//!
//! The device reports a free-running timer (clocked at `timer_base_hz`) and a
//! pulse counter (`ticks_per_revolution` pulses per turn). Speed is the
//! counter delta over the timer delta between two snapshots.

use crate::error::{ControlError, ControlResult};
use bb_core::ensure_positive;
use serde::{Deserialize, Serialize};

/// One timer/counter reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncoderSnapshot {
    /// Elapsed timer ticks.
    pub timer_ticks: u64,
    /// Elapsed encoder pulses.
    pub counter_ticks: u64,
}

impl EncoderSnapshot {
    pub fn new(timer_ticks: u64, counter_ticks: u64) -> Self {
        Self {
            timer_ticks,
            counter_ticks,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RpmEstimator {
    pub ticks_per_revolution: f64,
    pub timer_base_hz: f64,
}

impl Default for RpmEstimator {
    fn default() -> Self {
        Self {
            ticks_per_revolution: 6.0,
            timer_base_hz: 4_000_000.0,
        }
    }
}

impl RpmEstimator {
    pub fn new(ticks_per_revolution: f64, timer_base_hz: f64) -> ControlResult<Self> {
        ensure_positive(ticks_per_revolution, "ticks_per_revolution must be positive")?;
        ensure_positive(timer_base_hz, "timer_base_hz must be positive")?;
        Ok(Self {
            ticks_per_revolution,
            timer_base_hz,
        })
    }

    /// Estimate RPM between a previous and a current snapshot.
    ///
    /// Returns `Ok(None)` when there is no previous snapshot yet.
    ///
    /// # Errors
    ///
    /// * [`ControlError::DivisionByZero`] if both snapshots share a timer value
    /// * [`ControlError::NonMonotonic`] if either reading went backwards
    pub fn estimate(
        &self,
        prev: Option<EncoderSnapshot>,
        curr: EncoderSnapshot,
    ) -> ControlResult<Option<f64>> {
        let Some(prev) = prev else {
            return Ok(None);
        };
        if curr.timer_ticks < prev.timer_ticks {
            return Err(ControlError::NonMonotonic {
                what: "encoder timer went backwards",
            });
        }
        if curr.counter_ticks < prev.counter_ticks {
            return Err(ControlError::NonMonotonic {
                what: "encoder counter went backwards",
            });
        }

        let time_diff_s = (curr.timer_ticks - prev.timer_ticks) as f64 / self.timer_base_hz;
        if time_diff_s == 0.0 {
            return Err(ControlError::DivisionByZero {
                what: "encoder snapshots share a timer value",
            });
        }
        let tick_diff = (curr.counter_ticks - prev.counter_ticks) as f64;
        let revolutions = tick_diff / self.ticks_per_revolution;
        Ok(Some(revolutions / (time_diff_s / 60.0)))
    }
}
