//! Error types for flow conversion.

use bb_core::CoreError;
use thiserror::Error;

/// Errors produced while converting transducer readings to flow.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FlowError {
    /// The voltage implies a differential pressure below atmosphere.
    #[error("Invalid reading: {volts} V implies negative differential pressure ({delta_p_pa} Pa)")]
    InvalidReading { volts: f64, delta_p_pa: f64 },

    #[error("Non-finite value for {what}: {value}")]
    NonFinite { what: &'static str, value: f64 },

    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },
}

pub type FlowResult<T> = Result<T, FlowError>;

impl From<CoreError> for FlowError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::NonFinite { what, value } => FlowError::NonFinite { what, value },
            CoreError::InvalidArg { what } => FlowError::InvalidArg { what },
        }
    }
}
