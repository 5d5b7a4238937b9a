//! PID controller for the blower flow loop.
//!
//! The law is the textbook parallel form with a constant bias:
//!
//! ```text
//! u = bias + kp·e + ki·∫e dt + kd·Δe/dt,   e = sp - pv
//! ```
//!
//! The bias is the controller's starting output, so the very first actuation
//! is a sensible blower voltage rather than zero. Output is clamped to
//! `[out_min, out_max]`. Integral clamping on saturation (anti-windup) is
//! available but off by default, which matches how the rig has been tuned.

use crate::error::{ControlError, ControlResult};
use bb_core::{ensure_finite, ensure_positive};
use serde::{Deserialize, Serialize};

/// PID controller configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PIDController {
    /// Proportional gain (V per L/min).
    pub kp: f64,
    /// Integral gain (V per L/min·s).
    pub ki: f64,
    /// Derivative gain (V·s per L/min).
    pub kd: f64,
    /// Minimum output value.
    pub out_min: f64,
    /// Maximum output value.
    pub out_max: f64,
    /// Output before the first update; also the constant bias of the law.
    pub starting_output: f64,
    /// Freeze the integral while the output is saturated.
    #[serde(default)]
    pub anti_windup: bool,
}

impl PIDController {
    /// Create a new PID controller.
    ///
    /// # Arguments
    ///
    /// * `kp`, `ki`, `kd` - Gains, all non-negative
    /// * `out_min`, `out_max` - Output range
    /// * `starting_output` - Bias, must lie inside the output range
    pub fn new(
        kp: f64,
        ki: f64,
        kd: f64,
        out_min: f64,
        out_max: f64,
        starting_output: f64,
    ) -> ControlResult<Self> {
        for (gain, what) in [
            (kp, "kp must be finite and non-negative"),
            (ki, "ki must be finite and non-negative"),
            (kd, "kd must be finite and non-negative"),
        ] {
            if !gain.is_finite() || gain < 0.0 {
                return Err(ControlError::InvalidArg { what });
            }
        }
        ensure_finite(out_min, "out_min must be finite")?;
        ensure_finite(out_max, "out_max must be finite")?;
        if out_min >= out_max {
            return Err(ControlError::InvalidArg {
                what: "out_min must be less than out_max",
            });
        }
        if !(out_min..=out_max).contains(&starting_output) {
            return Err(ControlError::InvalidArg {
                what: "starting_output must lie within [out_min, out_max]",
            });
        }
        Ok(Self {
            kp,
            ki,
            kd,
            out_min,
            out_max,
            starting_output,
            anti_windup: false,
        })
    }

    /// Enable integral freezing while saturated.
    pub fn with_anti_windup(mut self, enabled: bool) -> Self {
        self.anti_windup = enabled;
        self
    }

    /// State before any update has run.
    pub fn initial_state(&self) -> PIDControllerState {
        PIDControllerState {
            integral: 0.0,
            prev_error: None,
            output: self.starting_output,
        }
    }

    /// Compute controller output given process variable and setpoint.
    ///
    /// # Arguments
    ///
    /// * `state` - Controller state
    /// * `pv` - Process variable (measured flow)
    /// * `sp` - Setpoint (target flow)
    /// * `dt` - Time since last update (seconds)
    ///
    /// # Returns
    ///
    /// Updated state and output value.
    pub fn update(
        &self,
        state: &PIDControllerState,
        pv: f64,
        sp: f64,
        dt: f64,
    ) -> (PIDControllerState, f64) {
        // Positive error means flow is below setpoint
        let error = sp - pv;

        let p_term = self.kp * error;

        let new_integral = state.integral + error * dt;
        let i_term = self.ki * new_integral;

        // No derivative kick on the first sample
        let d_term = match state.prev_error {
            Some(prev) => self.kd * (error - prev) / dt,
            None => 0.0,
        };

        let output_raw = self.starting_output + p_term + i_term + d_term;
        let output = output_raw.clamp(self.out_min, self.out_max);

        let integral = if self.anti_windup && output != output_raw {
            state.integral
        } else {
            new_integral
        };

        let new_state = PIDControllerState {
            integral,
            prev_error: Some(error),
            output,
        };

        (new_state, output)
    }
}

/// PID controller state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PIDControllerState {
    /// Accumulated `error * dt`.
    pub integral: f64,
    /// Error seen at the previous update.
    pub prev_error: Option<f64>,
    /// Last commanded output.
    pub output: f64,
}

/// A PID controller bound to a setpoint and owning its state.
///
/// This is the piece the control loop holds for the life of the process.
#[derive(Debug, Clone, PartialEq)]
pub struct PIDLoop {
    controller: PIDController,
    state: PIDControllerState,
    setpoint: f64,
}

impl PIDLoop {
    pub fn new(controller: PIDController, setpoint: f64) -> ControlResult<Self> {
        ensure_finite(setpoint, "setpoint must be finite")?;
        let state = controller.initial_state();
        Ok(Self {
            controller,
            state,
            setpoint,
        })
    }

    /// Feed one measurement and return the new clamped output.
    pub fn step(&mut self, measurement: f64, dt: f64) -> ControlResult<f64> {
        ensure_finite(measurement, "measurement must be finite")?;
        ensure_positive(dt, "dt must be positive")?;
        let (state, output) = self
            .controller
            .update(&self.state, measurement, self.setpoint, dt);
        self.state = state;
        Ok(output)
    }

    /// Current output (the starting output until the first step).
    pub fn output(&self) -> f64 {
        self.state.output
    }

    pub fn setpoint(&self) -> f64 {
        self.setpoint
    }

    /// Change the target; accumulated state is kept.
    pub fn set_setpoint(&mut self, setpoint: f64) -> ControlResult<()> {
        self.setpoint = ensure_finite(setpoint, "setpoint must be finite")?;
        Ok(())
    }

    pub fn controller(&self) -> &PIDController {
        &self.controller
    }

    pub fn state(&self) -> &PIDControllerState {
        &self.state
    }

    /// Drop accumulated history and return to the starting output.
    pub fn reset(&mut self) {
        self.state = self.controller.initial_state();
    }
}
