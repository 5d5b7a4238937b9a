//! Log record types and the sink seam.

use crate::ResultsResult;
use chrono::NaiveDateTime;

/// One logging tick's worth of data.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    /// Voltage last sent to the blower. `None` asks the sink to repeat the
    /// previously logged voltage.
    pub commanded_voltage: Option<f64>,
    /// Blower speed; `None` when no estimate was possible this tick.
    pub rpm: Option<f64>,
    /// Flow from the instantaneous transducer reading (L/min).
    pub flow_lpm: Option<f64>,
    /// Flow from the averaged window (L/min).
    pub avg_flow_lpm: Option<f64>,
    /// Local wall-clock time of the tick.
    pub timestamp: NaiveDateTime,
}

/// Destination for log records.
pub trait RecordSink {
    fn append_record(&mut self, record: &LogRecord) -> ResultsResult<()>;
}
