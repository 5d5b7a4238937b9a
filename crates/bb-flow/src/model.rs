//! Transducer linearisation and Bernoulli duct flow.

use crate::error::{FlowError, FlowResult};
use bb_core::units::constants::{AIR_DENSITY_KGPM3, ATMOSPHERE_PA, INCH_WC_PA};
use bb_core::units::{Area, Density, Length, Pressure, Velocity, VolumeRate};
use bb_core::{ensure_finite, ensure_positive};
use std::f64::consts::PI;

/// Linear scale of the differential-pressure transducer.
///
/// The analog input sees the transducer's current loop across a sense
/// resistor, so `mA = ma_per_volt * volts`. The 4-20 mA loop spans
/// `inwc = mA * inwc_per_ma - inwc_offset`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransducerScale {
    pub ma_per_volt: f64,
    pub inwc_per_ma: f64,
    pub inwc_offset: f64,
}

impl Default for TransducerScale {
    fn default() -> Self {
        Self {
            ma_per_volt: 8.475,
            inwc_per_ma: 1.0 / 64.0,
            inwc_offset: 1.0 / 16.0,
        }
    }
}

impl TransducerScale {
    /// Current-loop equivalent of an analog reading, in mA.
    pub fn milliamps(&self, volts: f64) -> f64 {
        self.ma_per_volt * volts
    }

    /// Gauge pressure in inches of water column.
    pub fn inches_water(&self, volts: f64) -> f64 {
        self.milliamps(volts) * self.inwc_per_ma - self.inwc_offset
    }

    /// Voltage that would read the given gauge pressure.
    pub fn volts_for_inches_water(&self, inwc: f64) -> f64 {
        (inwc + self.inwc_offset) / self.inwc_per_ma / self.ma_per_volt
    }
}

/// Pure voltage → flow-rate conversion for the blower duct.
///
/// # Example
///
/// ```
/// use bb_flow::FlowModel;
///
/// let model = FlowModel::default();
/// let q = model.flow_rate_lpm(1.0).unwrap();
/// assert!((q - 648.16).abs() < 0.01);
///
/// // Below the transducer's zero point the reading is rejected.
/// assert!(model.flow_rate_lpm(0.0).is_err());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct FlowModel {
    pub transducer: TransducerScale,
    /// Inner diameter of the circular duct.
    pub duct_diameter: Length,
    pub air_density: Density,
    pub atmosphere: Pressure,
}

impl Default for FlowModel {
    fn default() -> Self {
        Self {
            transducer: TransducerScale::default(),
            duct_diameter: bb_core::inches(2.0),
            air_density: bb_core::kgpm3(AIR_DENSITY_KGPM3),
            atmosphere: bb_core::pa(ATMOSPHERE_PA),
        }
    }
}

impl FlowModel {
    /// Create a model for a different duct or air density.
    pub fn new(duct_diameter: Length, air_density: Density) -> FlowResult<Self> {
        ensure_positive(duct_diameter.value, "duct diameter must be positive")?;
        ensure_positive(air_density.value, "air density must be positive")?;
        Ok(Self {
            duct_diameter,
            air_density,
            ..Self::default()
        })
    }

    /// Cross-sectional area of the duct, `π/4 d²`.
    pub fn duct_area(&self) -> Area {
        let d = self.duct_diameter.value;
        bb_core::m2(PI / 4.0 * d * d)
    }

    /// Absolute pressure seen by the transducer.
    pub fn absolute_pressure(&self, volts: f64) -> Pressure {
        let gauge_pa = self.transducer.inches_water(volts) * INCH_WC_PA;
        bb_core::pa(gauge_pa + self.atmosphere.value)
    }

    /// Differential pressure relative to the reference atmosphere.
    pub fn differential_pressure(&self, volts: f64) -> Pressure {
        self.absolute_pressure(volts) - self.atmosphere
    }

    /// Bernoulli velocity for the reading.
    ///
    /// Fails with [`FlowError::InvalidReading`] when the differential pressure
    /// is negative.
    pub fn velocity(&self, volts: f64) -> FlowResult<Velocity> {
        ensure_finite(volts, "sensor voltage")?;
        let delta_p = self.differential_pressure(volts).value;
        if delta_p < 0.0 {
            return Err(FlowError::InvalidReading {
                volts,
                delta_p_pa: delta_p,
            });
        }
        let v = (2.0 * delta_p / self.air_density.value).sqrt();
        Ok(bb_core::mps(ensure_finite(v, "duct velocity")?))
    }

    /// Volumetric flow through the duct.
    pub fn flow_rate(&self, volts: f64) -> FlowResult<VolumeRate> {
        let velocity = self.velocity(volts)?;
        Ok(bb_core::m3ps(self.duct_area().value * velocity.value))
    }

    /// Volumetric flow in liters per minute.
    pub fn flow_rate_lpm(&self, volts: f64) -> FlowResult<f64> {
        Ok(bb_core::to_lpm(self.flow_rate(volts)?))
    }

    /// Inverse of [`FlowModel::flow_rate_lpm`]: the transducer voltage that
    /// reads the given flow.
    pub fn voltage_for_flow(&self, flow_lpm: f64) -> FlowResult<f64> {
        ensure_finite(flow_lpm, "flow rate")?;
        if flow_lpm < 0.0 {
            return Err(FlowError::InvalidArg {
                what: "flow rate must be non-negative",
            });
        }
        let velocity = bb_core::lpm(flow_lpm).value / self.duct_area().value;
        let delta_p = 0.5 * self.air_density.value * velocity * velocity;
        Ok(self.transducer.volts_for_inches_water(delta_p / INCH_WC_PA))
    }
}
