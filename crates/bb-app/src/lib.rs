//! Blower control loop service layer.
//!
//! Wires the flow model, controller, averager and RPM estimator to a device
//! and a log sink, and drives them from a cooperative scheduler:
//!
//! - `config`: YAML-backed loop configuration
//! - `device`: the hardware seam (analog in, encoder, DAC)
//! - `control_loop`: per-task orchestration over explicit loop state
//! - `runner`: the driving clock, stop handle and main loop
//! - `sim`: a simulated blower for running without hardware

pub mod config;
pub mod control_loop;
pub mod device;
pub mod error;
pub mod runner;
pub mod sim;

pub use config::{LoopConfig, load_config, save_config};
pub use control_loop::{
    ControlLoop, LoopStatus, LoopTask, OrchestratorState, SkipReason, TaskFailure, TaskOutcome,
};
pub use device::{BlowerDevice, DeviceError, DeviceResult};
pub use error::{AppError, AppResult};
pub use runner::{Clock, RunOptions, RunSummary, StopHandle, SystemClock, run_loop};
pub use sim::SimulatedBlower;
