//! Simulated blower rig for running the loop without hardware.
//!
//! The blower is modelled as a first-order lag from DAC volts to duct flow.
//! The transducer voltage is the flow model run backwards, and the encoder
//! timer/counter advance with simulated time and blower speed.

use std::time::Instant;

use bb_controls::{EncoderSnapshot, FirstOrderLag, LagState, RpmEstimator};
use bb_flow::FlowModel;
use tracing::trace;

use crate::device::{BlowerDevice, DeviceError, DeviceResult};
use crate::error::AppResult;

pub struct SimulatedBlower {
    flow_model: FlowModel,
    encoder: RpmEstimator,
    lag: FirstOrderLag,
    flow: LagState,
    sensor_channel: u8,
    /// Steady-state flow per DAC volt (L/min/V).
    lpm_per_volt: f64,
    /// Blower speed per unit flow (rpm per L/min).
    rpm_per_lpm: f64,
    command: f64,
    elapsed_s: f64,
    pulses: f64,
    realtime: Option<Instant>,
}

impl SimulatedBlower {
    /// A blower whose time only moves through [`SimulatedBlower::advance`].
    pub fn manual(sensor_channel: u8) -> AppResult<Self> {
        Ok(Self {
            flow_model: FlowModel::default(),
            encoder: RpmEstimator::default(),
            lag: FirstOrderLag::new(2.0, 200.0)?,
            flow: LagState::default(),
            sensor_channel,
            lpm_per_volt: 110.0,
            rpm_per_lpm: 7.5,
            command: 0.0,
            elapsed_s: 0.0,
            pulses: 0.0,
            realtime: None,
        })
    }

    /// A blower that follows the wall clock between device calls.
    pub fn realtime(sensor_channel: u8) -> AppResult<Self> {
        let mut sim = Self::manual(sensor_channel)?;
        sim.realtime = Some(Instant::now());
        Ok(sim)
    }

    pub fn with_encoder(mut self, encoder: RpmEstimator) -> Self {
        self.encoder = encoder;
        self
    }

    /// Advance the plant by `dt` seconds under the current command.
    pub fn advance(&mut self, dt: f64) {
        if dt <= 0.0 {
            return;
        }
        let target = self.lpm_per_volt * self.command;
        self.flow = self.lag.step(&self.flow, dt, target);
        self.flow.value = self.flow.value.max(0.0);
        let rpm = self.flow.value * self.rpm_per_lpm;
        self.pulses += rpm / 60.0 * self.encoder.ticks_per_revolution * dt;
        self.elapsed_s += dt;
        trace!(
            command = self.command,
            flow_lpm = self.flow.value,
            rpm,
            "sim advanced"
        );
    }

    fn sync(&mut self) {
        if let Some(last) = self.realtime {
            let now = Instant::now();
            self.advance(now.duration_since(last).as_secs_f64());
            self.realtime = Some(now);
        }
    }

    pub fn flow_lpm(&self) -> f64 {
        self.flow.value
    }

    pub fn command(&self) -> f64 {
        self.command
    }
}

impl BlowerDevice for SimulatedBlower {
    fn read_analog_input(&mut self, channel: u8) -> DeviceResult<f64> {
        self.sync();
        if channel != self.sensor_channel {
            return Err(DeviceError::NoSuchChannel(channel));
        }
        self.flow_model
            .voltage_for_flow(self.flow.value)
            .map_err(|e| DeviceError::Io(e.to_string()))
    }

    fn read_encoder_snapshot(&mut self) -> DeviceResult<EncoderSnapshot> {
        self.sync();
        Ok(EncoderSnapshot::new(
            (self.elapsed_s * self.encoder.timer_base_hz) as u64,
            self.pulses as u64,
        ))
    }

    fn write_actuator_voltage(&mut self, channel_a: f64, _channel_b: f64) -> DeviceResult<()> {
        self.sync();
        if !channel_a.is_finite() {
            return Err(DeviceError::Io(format!("invalid DAC voltage {channel_a}")));
        }
        self.command = channel_a;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flow_follows_command() {
        let mut sim = SimulatedBlower::manual(1).unwrap();
        sim.write_actuator_voltage(4.0, 0.0).unwrap();
        for _ in 0..100 {
            sim.advance(0.25);
        }
        assert!((sim.flow_lpm() - 440.0).abs() < 1.0);
    }

    #[test]
    fn sensor_voltage_reads_back_flow() {
        let mut sim = SimulatedBlower::manual(1).unwrap();
        sim.write_actuator_voltage(3.0, 0.0).unwrap();
        sim.advance(30.0);
        let volts = sim.read_analog_input(1).unwrap();
        let flow = FlowModel::default().flow_rate_lpm(volts).unwrap();
        assert!((flow - sim.flow_lpm()).abs() < 1e-6);
    }

    #[test]
    fn wrong_channel_is_an_error() {
        let mut sim = SimulatedBlower::manual(1).unwrap();
        assert_eq!(
            sim.read_analog_input(0),
            Err(DeviceError::NoSuchChannel(0))
        );
    }

    #[test]
    fn encoder_counts_match_speed() {
        let mut sim = SimulatedBlower::manual(1).unwrap();
        sim.write_actuator_voltage(4.0, 0.0).unwrap();
        sim.advance(60.0);
        let before = sim.read_encoder_snapshot().unwrap();
        sim.advance(1.0);
        let after = sim.read_encoder_snapshot().unwrap();
        let rpm = RpmEstimator::default()
            .estimate(Some(before), after)
            .unwrap()
            .unwrap();
        // 440 L/min at 7.5 rpm per L/min, within pulse quantisation
        assert!((rpm - 3300.0).abs() < 20.0, "rpm {rpm}");
    }
}
