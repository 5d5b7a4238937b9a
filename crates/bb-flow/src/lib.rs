//! Flow measurement for the blower duct.
//!
//! Converts the differential-pressure transducer's analog voltage into a
//! volumetric flow rate. The chain is:
//!
//! 1. voltage → current-loop equivalent (mA)
//! 2. current → differential pressure (inches of water column)
//! 3. inches of water → absolute pressure (Pa, referenced to one atmosphere)
//! 4. Bernoulli: `v = sqrt(2 ΔP / ρ)`
//! 5. `Q = A v` over a circular duct, reported in liters per minute
//!
//! A reading that implies a pressure below atmosphere has no real velocity
//! and is reported as [`FlowError::InvalidReading`].

pub mod error;
pub mod model;

pub use error::{FlowError, FlowResult};
pub use model::{FlowModel, TransducerScale};
