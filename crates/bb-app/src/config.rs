//! Loop configuration, loaded from YAML.
//!
//! Every key has a default matching the rig's tuned constants, so an empty
//! file (or no file) gives the standard setup.

use std::path::{Path, PathBuf};

use bb_controls::{
    OpenLoopCalibration, PIDController, PIDLoop, RpmEstimator, VoltageAverager,
};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopConfig {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
    /// Target flow, L/min.
    pub setpoint_lpm: f64,
    pub sample_interval_s: f64,
    pub control_interval_s: f64,
    pub log_interval_s: f64,
    pub output_min: f64,
    pub output_max: f64,
    pub starting_output: f64,
    /// Closed-loop PID when true, open-loop calibration when false.
    pub feedback_enabled: bool,
    pub anti_windup: bool,
    /// Analog input wired to the pressure transducer.
    pub sensor_channel: u8,
    /// Longest the driver sleeps between checks of the stop signal.
    pub tick_resolution_s: f64,
    /// Directory for the daily CSV logs.
    pub data_dir: PathBuf,
    pub ticks_per_revolution: f64,
    pub timer_base_hz: f64,
    pub open_loop: OpenLoopCalibration,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            kp: 0.0034,
            ki: 0.0001722,
            kd: 0.0003,
            setpoint_lpm: 400.0,
            sample_interval_s: 0.25,
            control_interval_s: 1.0,
            log_interval_s: 1.0,
            output_min: 0.0,
            output_max: 5.0,
            starting_output: 3.75,
            feedback_enabled: false,
            anti_windup: false,
            sensor_channel: 1,
            tick_resolution_s: 0.05,
            data_dir: PathBuf::from("Blower_Data"),
            ticks_per_revolution: 6.0,
            timer_base_hz: 4_000_000.0,
            open_loop: OpenLoopCalibration::default(),
        }
    }
}

impl LoopConfig {
    /// Check that the configuration describes a runnable loop.
    pub fn validate(&self) -> AppResult<()> {
        let intervals = [
            (self.sample_interval_s, "sample_interval_s"),
            (self.control_interval_s, "control_interval_s"),
            (self.log_interval_s, "log_interval_s"),
            (self.tick_resolution_s, "tick_resolution_s"),
        ];
        for (value, name) in intervals {
            if !(value.is_finite() && value > 0.0) {
                return Err(AppError::Config(format!(
                    "{name} must be positive, got {value}"
                )));
            }
        }
        if !self.setpoint_lpm.is_finite() || self.setpoint_lpm < 0.0 {
            return Err(AppError::Config(format!(
                "setpoint_lpm must be non-negative, got {}",
                self.setpoint_lpm
            )));
        }
        // Gain, output range and encoder checks live with the types they build
        self.pid_loop()?;
        self.averager()?;
        self.rpm_estimator()?;
        Ok(())
    }

    pub fn pid_controller(&self) -> AppResult<PIDController> {
        let pid = PIDController::new(
            self.kp,
            self.ki,
            self.kd,
            self.output_min,
            self.output_max,
            self.starting_output,
        )?;
        Ok(pid.with_anti_windup(self.anti_windup))
    }

    pub fn pid_loop(&self) -> AppResult<PIDLoop> {
        Ok(PIDLoop::new(self.pid_controller()?, self.setpoint_lpm)?)
    }

    pub fn averager(&self) -> AppResult<VoltageAverager> {
        Ok(VoltageAverager::for_intervals(
            self.control_interval_s,
            self.sample_interval_s,
        )?)
    }

    pub fn rpm_estimator(&self) -> AppResult<RpmEstimator> {
        Ok(RpmEstimator::new(
            self.ticks_per_revolution,
            self.timer_base_hz,
        )?)
    }
}

/// Load and validate a config from a YAML file.
pub fn load_config(path: &Path) -> AppResult<LoopConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| AppError::ConfigFileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    let config: LoopConfig = serde_yaml::from_str(&content)
        .map_err(|e| AppError::Config(format!("Failed to parse config YAML: {}", e)))?;
    config.validate()?;

    Ok(config)
}

/// Save a config to a YAML file.
pub fn save_config(path: &Path, config: &LoopConfig) -> AppResult<()> {
    let content = serde_yaml::to_string(config)
        .map_err(|e| AppError::Config(format!("Failed to serialize config: {}", e)))?;

    std::fs::write(path, content).map_err(|e| AppError::ConfigFileWrite {
        path: path.to_path_buf(),
        source: e,
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_rig_constants() {
        let config = LoopConfig::default();
        assert_eq!(config.kp, 0.0034);
        assert_eq!(config.ki, 0.0001722);
        assert_eq!(config.kd, 0.0003);
        assert_eq!(config.setpoint_lpm, 400.0);
        assert_eq!(config.starting_output, 3.75);
        assert!(config.validate().is_ok());
        assert_eq!(config.averager().unwrap().capacity(), 4);
    }

    #[test]
    fn empty_yaml_gives_defaults() {
        let config: LoopConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config, LoopConfig::default());
    }

    #[test]
    fn partial_yaml_overrides() {
        let yaml = "setpoint_lpm: 350.0\nfeedback_enabled: true\nsample_interval_s: 0.5\n";
        let config: LoopConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.setpoint_lpm, 350.0);
        assert!(config.feedback_enabled);
        assert_eq!(config.averager().unwrap().capacity(), 2);
        assert_eq!(config.kp, 0.0034);
    }

    #[test]
    fn rejects_bad_intervals_and_ranges() {
        let config = LoopConfig {
            control_interval_s: 0.0,
            ..LoopConfig::default()
        };
        assert!(matches!(config.validate(), Err(AppError::Config(_))));

        let config = LoopConfig {
            output_min: 5.0,
            output_max: 0.0,
            ..LoopConfig::default()
        };
        assert!(matches!(config.validate(), Err(AppError::Control(_))));

        let config = LoopConfig {
            timer_base_hz: 0.0,
            ..LoopConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_window_too_large_to_allocate() {
        let config = LoopConfig {
            sample_interval_s: 1e-12,
            ..LoopConfig::default()
        };
        assert!(matches!(config.validate(), Err(AppError::Control(_))));
        assert!(config.averager().is_err());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blower.yaml");
        let config = LoopConfig {
            setpoint_lpm: 420.0,
            anti_windup: true,
            ..LoopConfig::default()
        };
        save_config(&path, &config).unwrap();
        assert_eq!(load_config(&path).unwrap(), config);
    }

    #[test]
    fn missing_file_reports_path() {
        let err = load_config(Path::new("/nonexistent/blower.yaml")).unwrap_err();
        assert!(matches!(err, AppError::ConfigFileRead { .. }));
    }
}
