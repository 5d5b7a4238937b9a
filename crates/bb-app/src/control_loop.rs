//! Blower control loop orchestration.
//!
//! Three periodic tasks share one [`OrchestratorState`]:
//!
//! - **Sample**: read the transducer and push the voltage into the averager
//! - **Control**: averaged voltage → flow → PID → DAC (or the open-loop
//!   calibration when feedback is off)
//! - **Log**: encoder snapshot → RPM, instantaneous and averaged flow → CSV
//!
//! Tasks run one at a time on the caller's thread. A failing task only loses
//! its own effect for that tick; the schedule carries on.

use bb_controls::{
    ControlError, EncoderSnapshot, OpenLoopCalibration, PIDLoop, PeriodicScheduler,
    RpmEstimator, VoltageAverager,
};
use bb_flow::{FlowError, FlowModel};
use bb_results::{LogRecord, RecordSink};
use chrono::NaiveDateTime;
use tracing::{debug, error, info, warn};

use crate::config::LoopConfig;
use crate::device::{BlowerDevice, DeviceError};
use crate::error::AppResult;

/// The periodic tasks, in the order they run within a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoopTask {
    Sample,
    Control,
    Log,
}

/// Why a task ran but had no effect.
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    /// No voltage samples recorded yet.
    EmptyWindow,
    /// The averaged voltage implies sub-atmospheric pressure.
    InvalidReading { volts: f64 },
    /// The flow computation overflowed or produced NaN.
    NonFinite { what: &'static str },
    /// The flow model refused the reading for another reason.
    FlowUnavailable(FlowError),
    /// First logging tick; the encoder snapshot was stored for next time.
    AwaitingSnapshot,
    /// The controller refused the input.
    Rejected(ControlError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum TaskFailure {
    Device(DeviceError),
    Persistence(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum TaskOutcome {
    Completed,
    Skipped(SkipReason),
    Failed(TaskFailure),
}

impl TaskOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, TaskOutcome::Completed)
    }
}

/// All mutable loop state, owned by the loop for the life of the process.
#[derive(Debug, Clone)]
pub struct OrchestratorState {
    pub averager: VoltageAverager,
    pub pid: PIDLoop,
    pub feedback_enabled: bool,
    /// Encoder reading from the previous logging tick.
    pub prev_snapshot: Option<EncoderSnapshot>,
    /// Voltage most recently written to the blower.
    pub last_commanded: Option<f64>,
    pub last_rpm: Option<f64>,
    pub last_flow_lpm: Option<f64>,
    pub last_avg_flow_lpm: Option<f64>,
}

/// Read-only view of the loop for display.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoopStatus {
    pub feedback_enabled: bool,
    pub setpoint_lpm: f64,
    pub commanded_voltage: Option<f64>,
    pub rpm: Option<f64>,
    pub flow_lpm: Option<f64>,
    pub avg_flow_lpm: Option<f64>,
}

pub struct ControlLoop<D, S> {
    config: LoopConfig,
    device: D,
    sink: S,
    flow_model: FlowModel,
    rpm_estimator: RpmEstimator,
    open_loop: OpenLoopCalibration,
    scheduler: PeriodicScheduler<LoopTask>,
    state: OrchestratorState,
}

impl<D: BlowerDevice, S: RecordSink> ControlLoop<D, S> {
    /// Build the loop from a validated configuration. Task clocks start at `start_s`.
    pub fn new(config: LoopConfig, device: D, sink: S, start_s: f64) -> AppResult<Self> {
        config.validate()?;

        let mut scheduler = PeriodicScheduler::new(start_s);
        scheduler.add_task(LoopTask::Sample, config.sample_interval_s)?;
        scheduler.add_task(LoopTask::Control, config.control_interval_s)?;
        scheduler.add_task(LoopTask::Log, config.log_interval_s)?;

        let state = OrchestratorState {
            averager: config.averager()?,
            pid: config.pid_loop()?,
            feedback_enabled: config.feedback_enabled,
            prev_snapshot: None,
            last_commanded: None,
            last_rpm: None,
            last_flow_lpm: None,
            last_avg_flow_lpm: None,
        };

        info!(
            feedback = config.feedback_enabled,
            setpoint_lpm = config.setpoint_lpm,
            window = state.averager.capacity(),
            "control loop ready"
        );

        Ok(Self {
            rpm_estimator: config.rpm_estimator()?,
            open_loop: config.open_loop,
            flow_model: FlowModel::default(),
            config,
            device,
            sink,
            scheduler,
            state,
        })
    }

    /// Replace the flow model (e.g. for a different duct).
    pub fn with_flow_model(mut self, flow_model: FlowModel) -> Self {
        self.flow_model = flow_model;
        self
    }

    /// Run every task due at `now_s`, in priority order.
    pub fn tick(&mut self, now_s: f64, wall: NaiveDateTime) -> Vec<(LoopTask, TaskOutcome)> {
        let due = self.scheduler.poll(now_s);
        due.into_iter()
            .map(|task| (task, self.run_task(task, wall)))
            .collect()
    }

    /// Seconds until the next task is due.
    pub fn time_until_next(&self, now_s: f64) -> f64 {
        self.scheduler
            .time_until_next(now_s)
            .unwrap_or(self.config.tick_resolution_s)
    }

    /// Run a single task immediately, outside the schedule.
    pub fn run_task(&mut self, task: LoopTask, wall: NaiveDateTime) -> TaskOutcome {
        let outcome = match task {
            LoopTask::Sample => self.sample(),
            LoopTask::Control => self.control(),
            LoopTask::Log => self.log(wall),
        };
        match &outcome {
            TaskOutcome::Completed => {}
            TaskOutcome::Skipped(reason) => warn!(?task, ?reason, "task skipped"),
            TaskOutcome::Failed(failure) => error!(?task, ?failure, "task failed"),
        }
        outcome
    }

    fn sample(&mut self) -> TaskOutcome {
        let channel = self.config.sensor_channel;
        match self.device.read_analog_input(channel) {
            Ok(volts) if !volts.is_finite() => TaskOutcome::Failed(TaskFailure::Device(
                DeviceError::NonFiniteReading {
                    channel,
                    value: volts,
                },
            )),
            Ok(volts) => {
                self.state.averager.record(volts);
                debug!(volts, "sampled transducer");
                TaskOutcome::Completed
            }
            Err(e) => TaskOutcome::Failed(TaskFailure::Device(e)),
        }
    }

    fn control(&mut self) -> TaskOutcome {
        if self.state.feedback_enabled {
            self.control_feedback()
        } else {
            self.control_open_loop()
        }
    }

    fn control_feedback(&mut self) -> TaskOutcome {
        let avg = match self.state.averager.average() {
            Ok(avg) => avg,
            Err(_) => return TaskOutcome::Skipped(SkipReason::EmptyWindow),
        };
        let flow = match self.flow_model.flow_rate_lpm(avg) {
            Ok(flow) => flow,
            Err(FlowError::InvalidReading { volts, .. }) => {
                return TaskOutcome::Skipped(SkipReason::InvalidReading { volts });
            }
            Err(FlowError::NonFinite { what, .. }) => {
                return TaskOutcome::Skipped(SkipReason::NonFinite { what });
            }
            Err(e) => return TaskOutcome::Skipped(SkipReason::FlowUnavailable(e)),
        };
        self.state.last_avg_flow_lpm = Some(flow);

        let output = match self.state.pid.step(flow, self.config.control_interval_s) {
            Ok(output) => output,
            Err(e) => return TaskOutcome::Skipped(SkipReason::Rejected(e)),
        };
        debug!(avg_volts = avg, flow_lpm = flow, output_v = output, "pid step");
        self.command(output)
    }

    fn control_open_loop(&mut self) -> TaskOutcome {
        // The DAC takes the calibration line as is; only the PID output is range-limited
        let volts = match self.open_loop.voltage_for_setpoint(self.state.pid.setpoint()) {
            Ok(volts) => volts,
            Err(e) => return TaskOutcome::Skipped(SkipReason::Rejected(e)),
        };
        self.command(volts)
    }

    fn command(&mut self, volts: f64) -> TaskOutcome {
        match self.device.write_actuator_voltage(volts, 0.0) {
            Ok(()) => {
                self.state.last_commanded = Some(volts);
                TaskOutcome::Completed
            }
            Err(e) => TaskOutcome::Failed(TaskFailure::Device(e)),
        }
    }

    fn log(&mut self, wall: NaiveDateTime) -> TaskOutcome {
        let snapshot = match self.device.read_encoder_snapshot() {
            Ok(snapshot) => snapshot,
            Err(e) => return TaskOutcome::Failed(TaskFailure::Device(e)),
        };
        let Some(prev) = self.state.prev_snapshot.replace(snapshot) else {
            return TaskOutcome::Skipped(SkipReason::AwaitingSnapshot);
        };

        let rpm = match self.rpm_estimator.estimate(Some(prev), snapshot) {
            Ok(rpm) => rpm,
            Err(e) => {
                warn!(error = %e, "no rpm estimate this tick");
                None
            }
        };
        self.state.last_rpm = rpm;

        let volts = match self.device.read_analog_input(self.config.sensor_channel) {
            Ok(volts) => volts,
            Err(e) => return TaskOutcome::Failed(TaskFailure::Device(e)),
        };
        let flow = self.flow_or_warn(volts);
        let avg_flow = self
            .state
            .averager
            .average()
            .ok()
            .and_then(|avg| self.flow_or_warn(avg));
        self.state.last_flow_lpm = flow;
        self.state.last_avg_flow_lpm = avg_flow;

        let record = LogRecord {
            commanded_voltage: self.state.last_commanded,
            rpm,
            flow_lpm: flow,
            avg_flow_lpm: avg_flow,
            timestamp: wall,
        };
        info!(
            volts = ?record.commanded_voltage,
            rpm = ?record.rpm,
            flow_lpm = ?record.flow_lpm,
            avg_flow_lpm = ?record.avg_flow_lpm,
            "blower"
        );
        match self.sink.append_record(&record) {
            Ok(()) => TaskOutcome::Completed,
            Err(e) => TaskOutcome::Failed(TaskFailure::Persistence(e.to_string())),
        }
    }

    fn flow_or_warn(&self, volts: f64) -> Option<f64> {
        match self.flow_model.flow_rate_lpm(volts) {
            Ok(flow) => Some(flow),
            Err(e) => {
                warn!(error = %e, "flow unavailable");
                None
            }
        }
    }

    /// Switch between PID feedback and the open-loop calibration.
    pub fn set_feedback_enabled(&mut self, enabled: bool) {
        if self.state.feedback_enabled != enabled {
            info!(enabled, "feedback control toggled");
        }
        self.state.feedback_enabled = enabled;
    }

    /// Change the flow target; controller history is kept.
    pub fn set_setpoint(&mut self, setpoint_lpm: f64) -> AppResult<()> {
        self.state.pid.set_setpoint(setpoint_lpm)?;
        info!(setpoint_lpm, "setpoint changed");
        Ok(())
    }

    /// Return the controller to its starting output.
    pub fn reset_controller(&mut self) {
        self.state.pid.reset();
    }

    pub fn status(&self) -> LoopStatus {
        LoopStatus {
            feedback_enabled: self.state.feedback_enabled,
            setpoint_lpm: self.state.pid.setpoint(),
            commanded_voltage: self.state.last_commanded,
            rpm: self.state.last_rpm,
            flow_lpm: self.state.last_flow_lpm,
            avg_flow_lpm: self.state.last_avg_flow_lpm,
        }
    }

    pub fn state(&self) -> &OrchestratorState {
        &self.state
    }

    pub fn config(&self) -> &LoopConfig {
        &self.config
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Tear the loop down, handing back the device and sink.
    pub fn into_parts(self) -> (D, S) {
        (self.device, self.sink)
    }
}
