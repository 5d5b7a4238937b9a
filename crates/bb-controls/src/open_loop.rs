//! Open-loop blower drive from a fixed setpoint calibration.
//!
//! Without feedback the blower voltage comes straight from a linear fit of
//! measured flow against DAC voltage. Below the blower's start-up voltage the
//! motor stalls rather than turning slowly, so that region is driven as off.

use crate::error::ControlResult;
use bb_core::ensure_finite;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OpenLoopCalibration {
    /// Volts per L/min.
    pub slope: f64,
    /// Volts at zero flow.
    pub intercept: f64,
    /// Commands below this voltage are sent as 0 V.
    pub off_below: f64,
}

impl Default for OpenLoopCalibration {
    fn default() -> Self {
        Self {
            slope: 0.0131,
            intercept: 0.7221,
            off_below: 2.0,
        }
    }
}

impl OpenLoopCalibration {
    /// DAC voltage for a flow setpoint.
    pub fn voltage_for_setpoint(&self, setpoint_lpm: f64) -> ControlResult<f64> {
        let setpoint = ensure_finite(setpoint_lpm, "setpoint must be finite")?;
        let volts = self.slope * setpoint + self.intercept;
        Ok(if volts < self.off_below { 0.0 } else { volts })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_fit_above_floor() {
        let cal = OpenLoopCalibration::default();
        let volts = cal.voltage_for_setpoint(200.0).unwrap();
        assert!((volts - (0.0131 * 200.0 + 0.7221)).abs() < 1e-12);
    }

    #[test]
    fn below_floor_is_off() {
        let cal = OpenLoopCalibration::default();
        // 0.0131 * 90 + 0.7221 = 1.9011 V
        assert_eq!(cal.voltage_for_setpoint(90.0).unwrap(), 0.0);
        assert_eq!(cal.voltage_for_setpoint(0.0).unwrap(), 0.0);
    }

    #[test]
    fn floor_boundary_is_kept() {
        let cal = OpenLoopCalibration {
            slope: 1.0,
            intercept: 0.0,
            off_below: 2.0,
        };
        assert_eq!(cal.voltage_for_setpoint(2.0).unwrap(), 2.0);
    }

    #[test]
    fn rejects_nan() {
        assert!(
            OpenLoopCalibration::default()
                .voltage_for_setpoint(f64::NAN)
                .is_err()
        );
    }
}
