//! Error types for the bb-app service layer.

use std::path::PathBuf;

/// Application error type wrapping errors from the backend crates.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to read config file: {path}")]
    ConfigFileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write config file: {path}")]
    ConfigFileWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Device error: {0}")]
    Device(#[from] crate::device::DeviceError),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Flow error: {0}")]
    Flow(String),

    #[error("Control error: {0}")]
    Control(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for bb-app operations.
pub type AppResult<T> = Result<T, AppError>;

impl From<bb_flow::FlowError> for AppError {
    fn from(err: bb_flow::FlowError) -> Self {
        AppError::Flow(err.to_string())
    }
}

impl From<bb_controls::ControlError> for AppError {
    fn from(err: bb_controls::ControlError) -> Self {
        AppError::Control(err.to_string())
    }
}

impl From<bb_results::ResultsError> for AppError {
    fn from(err: bb_results::ResultsError) -> Self {
        AppError::Persistence(err.to_string())
    }
}
