//! bb-results: append-only CSV logging of blower runs.

pub mod csv_log;
pub mod types;

pub use csv_log::{CsvLogSink, HEADER};
pub use types::{LogRecord, RecordSink};

pub type ResultsResult<T> = Result<T, ResultsError>;

#[derive(thiserror::Error, Debug)]
pub enum ResultsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid path: {message}")]
    InvalidPath { message: String },
}
