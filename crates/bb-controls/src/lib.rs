//! Control primitives for the blower rig.
//!
//! Everything the control loop needs short of device access:
//! - a PID law with saturating output and a stateful setpoint loop around it
//! - the rolling voltage averager feeding the controller
//! - encoder-based RPM estimation
//! - a cooperative periodic scheduler built on sample clocks
//! - the open-loop blower calibration
//! - a first-order lag used to model actuator/plant response
//!
//! # Design Principles
//!
//! - **Pure laws, explicit state**: controller maths is a pure function of
//!   configuration and state; the mutable wrapper owns exactly one state value
//! - **Saturate, never wrap**: every actuator command is clamped to its range
//! - **Single writer**: nothing here locks; callers run it on one thread

pub mod actuator;
pub mod averager;
pub mod controller;
pub mod error;
pub mod open_loop;
pub mod rpm;
pub mod schedule;

pub use actuator::{FirstOrderLag, LagState};
pub use averager::{MAX_WINDOW, VoltageAverager};
pub use controller::{PIDController, PIDControllerState, PIDLoop};
pub use error::{ControlError, ControlResult};
pub use open_loop::OpenLoopCalibration;
pub use rpm::{EncoderSnapshot, RpmEstimator};
pub use schedule::{PeriodicScheduler, SampleClock};
