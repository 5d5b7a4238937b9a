//! bb-core: shared foundation for the blower rig crates.
//!
//! Contains:
//! - units (uom SI types + constructors used by the flow model)
//! - numeric (Real + tolerances + float helpers)
//! - error (shared error types)

pub mod error;
pub mod numeric;
pub mod units;

pub use error::{CoreError, CoreResult};
pub use numeric::*;
pub use units::*;
