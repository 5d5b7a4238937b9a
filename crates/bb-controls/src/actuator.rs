//! First-order lag with rate limiting.
//!
//! Models the response between a commanded value and the physical quantity
//! that follows it, e.g. blower speed following the DAC voltage:
//! - **First-order lag**: time constant `tau`
//! - **Rate limiting**: the value never moves faster than `rate_limit` per second

use crate::error::{ControlError, ControlResult};
use serde::{Deserialize, Serialize};

/// State of a first-order lag.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LagState {
    pub value: f64,
}

/// Dynamics: `dv/dt = (cmd - v) / tau`, clamped to `[-rate_limit, rate_limit]`.
///
/// # Example
///
/// ```
/// use bb_controls::{FirstOrderLag, LagState};
///
/// let lag = FirstOrderLag::new(0.2, 5.0).unwrap();
/// let mut state = LagState { value: 0.0 };
///
/// for _ in 0..100 {
///     state = lag.step(&state, 0.01, 1.0);
/// }
///
/// assert!(state.value > 0.9);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FirstOrderLag {
    /// Time constant (seconds), must be positive
    pub tau: f64,
    /// Rate limit (units/second), must be positive
    pub rate_limit: f64,
}

impl FirstOrderLag {
    /// Create a new first-order lag.
    ///
    /// # Errors
    ///
    /// Returns error if `tau` or `rate_limit` are not positive.
    pub fn new(tau: f64, rate_limit: f64) -> ControlResult<Self> {
        if tau <= 0.0 {
            return Err(ControlError::InvalidArg {
                what: "tau must be positive",
            });
        }
        if rate_limit <= 0.0 {
            return Err(ControlError::InvalidArg {
                what: "rate_limit must be positive",
            });
        }
        Ok(Self { tau, rate_limit })
    }

    /// Derivative of the value given the current command.
    pub fn rate(&self, value: f64, command: f64) -> f64 {
        let raw = (command - value) / self.tau;
        raw.clamp(-self.rate_limit, self.rate_limit)
    }

    /// Advance by `dt` seconds with explicit Euler.
    ///
    /// Steps longer than `tau` are split so a slow caller cannot overshoot.
    pub fn step(&self, state: &LagState, dt: f64, command: f64) -> LagState {
        let substeps = (dt / self.tau).ceil().max(1.0) as usize;
        let h = dt / substeps as f64;
        let mut value = state.value;
        for _ in 0..substeps {
            value += self.rate(value, command) * h;
        }
        LagState { value }
    }
}
