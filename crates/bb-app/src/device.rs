//! Hardware seam for the blower rig.
//!
//! The rig's DAQ exposes analog inputs, a timer/counter pair wired to the
//! blower's tachometer, and a two-channel DAC driving the blower. Drivers
//! own their own retry/reconnect policy; calls here are expected to return
//! promptly and are never retried by the loop.

use bb_controls::EncoderSnapshot;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum DeviceError {
    #[error("Device I/O error: {0}")]
    Io(String),

    #[error("Device disconnected")]
    Disconnected,

    #[error("Analog channel {0} is not available")]
    NoSuchChannel(u8),

    #[error("Analog channel {channel} returned non-finite value {value}")]
    NonFiniteReading { channel: u8, value: f64 },
}

pub type DeviceResult<T> = Result<T, DeviceError>;

pub trait BlowerDevice {
    /// Read one analog input, in volts.
    fn read_analog_input(&mut self, channel: u8) -> DeviceResult<f64>;

    /// Read the free-running timer and tachometer counter together.
    fn read_encoder_snapshot(&mut self) -> DeviceResult<EncoderSnapshot>;

    /// Set both DAC outputs, in volts.
    fn write_actuator_voltage(&mut self, channel_a: f64, channel_b: f64) -> DeviceResult<()>;
}

impl<D: BlowerDevice + ?Sized> BlowerDevice for Box<D> {
    fn read_analog_input(&mut self, channel: u8) -> DeviceResult<f64> {
        (**self).read_analog_input(channel)
    }

    fn read_encoder_snapshot(&mut self) -> DeviceResult<EncoderSnapshot> {
        (**self).read_encoder_snapshot()
    }

    fn write_actuator_voltage(&mut self, channel_a: f64, channel_b: f64) -> DeviceResult<()> {
        (**self).write_actuator_voltage(channel_a, channel_b)
    }
}
