// bb-core/src/units.rs

use uom::si::f64::{
    Area as UomArea, Length as UomLength, MassDensity as UomMassDensity,
    Pressure as UomPressure, Time as UomTime, Velocity as UomVelocity,
    VolumeRate as UomVolumeRate,
};

// Public canonical unit types (SI, f64)
pub type Area = UomArea;
pub type Length = UomLength;
pub type Density = UomMassDensity;
pub type Pressure = UomPressure;
pub type Time = UomTime;
pub type Velocity = UomVelocity;
pub type VolumeRate = UomVolumeRate;

#[inline]
pub fn pa(v: f64) -> Pressure {
    use uom::si::pressure::pascal;
    Pressure::new::<pascal>(v)
}

#[inline]
pub fn m(v: f64) -> Length {
    use uom::si::length::meter;
    Length::new::<meter>(v)
}

#[inline]
pub fn m2(v: f64) -> Area {
    use uom::si::area::square_meter;
    Area::new::<square_meter>(v)
}

#[inline]
pub fn inches(v: f64) -> Length {
    use uom::si::length::inch;
    Length::new::<inch>(v)
}

#[inline]
pub fn s(v: f64) -> Time {
    use uom::si::time::second;
    Time::new::<second>(v)
}

#[inline]
pub fn kgpm3(v: f64) -> Density {
    use uom::si::mass_density::kilogram_per_cubic_meter;
    Density::new::<kilogram_per_cubic_meter>(v)
}

#[inline]
pub fn mps(v: f64) -> Velocity {
    use uom::si::velocity::meter_per_second;
    Velocity::new::<meter_per_second>(v)
}

#[inline]
pub fn m3ps(v: f64) -> VolumeRate {
    use uom::si::volume_rate::cubic_meter_per_second;
    VolumeRate::new::<cubic_meter_per_second>(v)
}

#[inline]
pub fn lpm(v: f64) -> VolumeRate {
    use uom::si::volume_rate::liter_per_minute;
    VolumeRate::new::<liter_per_minute>(v)
}

/// Read a volume rate back out in liters per minute.
#[inline]
pub fn to_lpm(q: VolumeRate) -> f64 {
    use uom::si::volume_rate::liter_per_minute;
    q.get::<liter_per_minute>()
}

pub mod constants {
    use super::*;

    /// Reference atmosphere used to make transducer readings absolute.
    pub const ATMOSPHERE_PA: f64 = 101_325.0;

    /// Pascals per inch of water column, as calibrated for the rig's transducer.
    pub const INCH_WC_PA: f64 = 248.84;

    /// Air density at the rig (kg/m^3).
    pub const AIR_DENSITY_KGPM3: f64 = 1.225;

    #[inline]
    pub fn atmosphere() -> Pressure {
        pa(ATMOSPHERE_PA)
    }

    #[inline]
    pub fn air_density() -> Density {
        kgpm3(AIR_DENSITY_KGPM3)
    }
}
