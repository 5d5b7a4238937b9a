//! Error types for control operations.

use bb_core::CoreError;
use thiserror::Error;

/// Result type for control operations.
pub type ControlResult<T> = Result<T, ControlError>;

/// Errors that can occur in control operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ControlError {
    /// Invalid argument provided to a control function.
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    /// Average requested before any sample was recorded.
    #[error("Averaging window is empty")]
    EmptyWindow,

    /// A rate was requested over a zero-length interval.
    #[error("Division by zero: {what}")]
    DivisionByZero { what: &'static str },

    /// A counter that must only grow went backwards.
    #[error("Non-monotonic reading: {what}")]
    NonMonotonic { what: &'static str },
}

impl From<CoreError> for ControlError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::NonFinite { what, .. } | CoreError::InvalidArg { what } => {
                ControlError::InvalidArg { what }
            }
        }
    }
}
