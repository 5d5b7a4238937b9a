//! Daily-rotated CSV log.

use crate::types::{LogRecord, RecordSink};
use crate::{ResultsError, ResultsResult};
use chrono::NaiveDate;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Column names written once at the top of each file.
pub const HEADER: [&str; 4] = ["Voltage Sent", "RPM", "Flow Rate", "Current Time"];

/// Written in the voltage column when no voltage has ever been commanded.
const NO_VOLTAGE: &str = "n/a";

/// Appends one row per logging tick to `<root>/<prefix>_<MM-DD-YYYY>.csv`.
///
/// The file name follows the record's date, so a run crossing midnight
/// continues in a fresh file with its own header.
pub struct CsvLogSink {
    root_dir: PathBuf,
    prefix: String,
    current_date: Option<NaiveDate>,
    last_voltage: Option<f64>,
}

impl CsvLogSink {
    pub fn new(root_dir: PathBuf) -> ResultsResult<Self> {
        Self::with_prefix(root_dir, "blower_data")
    }

    pub fn with_prefix(root_dir: PathBuf, prefix: impl Into<String>) -> ResultsResult<Self> {
        let prefix = prefix.into();
        if prefix.is_empty() || prefix.contains(['/', '\\']) {
            return Err(ResultsError::InvalidPath {
                message: format!("invalid log file prefix '{prefix}'"),
            });
        }
        if !root_dir.exists() {
            fs::create_dir_all(&root_dir)?;
        }
        Ok(Self {
            root_dir,
            prefix,
            current_date: None,
            last_voltage: None,
        })
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    /// File that records stamped on `date` go to.
    pub fn path_for(&self, date: NaiveDate) -> PathBuf {
        self.root_dir
            .join(format!("{}_{}.csv", self.prefix, date.format("%m-%d-%Y")))
    }

    /// Voltage the sink will repeat for a record without one.
    pub fn last_voltage(&self) -> Option<f64> {
        self.last_voltage
    }

    /// Switch to the file for `date`, picking up the last logged voltage if
    /// the file already has rows from an earlier run.
    fn roll_to(&mut self, date: NaiveDate) -> ResultsResult<PathBuf> {
        let path = self.path_for(date);
        if self.current_date != Some(date) {
            if self.last_voltage.is_none() && path.exists() {
                self.last_voltage = last_logged_voltage(&path)?;
            }
            info!(path = %path.display(), "logging to");
            self.current_date = Some(date);
        }
        Ok(path)
    }

    /// Append one record, writing the header first if the file is empty.
    pub fn append(&mut self, record: &LogRecord) -> ResultsResult<PathBuf> {
        let path = self.roll_to(record.timestamp.date())?;

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let is_empty = file.metadata()?.len() == 0;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        if is_empty {
            writer.write_record(HEADER)?;
        }

        let voltage = record.commanded_voltage.or(self.last_voltage);
        let row = [
            voltage.map_or_else(|| NO_VOLTAGE.to_string(), |v| v.to_string()),
            optional(record.rpm),
            optional(record.flow_lpm),
            record.timestamp.format("%H:%M:%S").to_string(),
        ];
        writer.write_record(&row)?;
        writer.flush()?;

        if voltage.is_some() {
            self.last_voltage = voltage;
        }
        debug!(path = %path.display(), ?row, "appended log row");
        Ok(path)
    }
}

impl RecordSink for CsvLogSink {
    fn append_record(&mut self, record: &LogRecord) -> ResultsResult<()> {
        self.append(record).map(|_| ())
    }
}

fn optional(v: Option<f64>) -> String {
    v.map(|v| v.to_string()).unwrap_or_default()
}

/// Voltage column of the last data row, if it holds a number.
fn last_logged_voltage(path: &Path) -> ResultsResult<Option<f64>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;
    let mut last = None;
    for row in reader.records() {
        let row = row?;
        last = row.get(0).and_then(|v| v.trim().parse::<f64>().ok());
    }
    Ok(last)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn at(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn record(volts: Option<f64>, ts: &str) -> LogRecord {
        LogRecord {
            commanded_voltage: volts,
            rpm: Some(1200.0),
            flow_lpm: Some(400.5),
            avg_flow_lpm: Some(401.0),
            timestamp: at(ts),
        }
    }

    #[test]
    fn file_name_uses_month_day_year() {
        let dir = tempfile::tempdir().unwrap();
        let sink = CsvLogSink::new(dir.path().to_path_buf()).unwrap();
        let date = NaiveDate::from_ymd_opt(2026, 3, 7).unwrap();
        assert_eq!(
            sink.path_for(date),
            dir.path().join("blower_data_03-07-2026.csv")
        );
    }

    #[test]
    fn rejects_prefix_with_separator() {
        let dir = tempfile::tempdir().unwrap();
        assert!(CsvLogSink::with_prefix(dir.path().to_path_buf(), "a/b").is_err());
        assert!(CsvLogSink::with_prefix(dir.path().to_path_buf(), "").is_err());
    }

    #[test]
    fn creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("Blower_Data");
        CsvLogSink::new(nested.clone()).unwrap();
        assert!(nested.is_dir());
    }

    #[test]
    fn missing_values_are_blank() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = CsvLogSink::new(dir.path().to_path_buf()).unwrap();
        let rec = LogRecord {
            commanded_voltage: Some(2.5),
            rpm: None,
            flow_lpm: None,
            avg_flow_lpm: None,
            timestamp: at("2026-03-07 09:00:00"),
        };
        let path = sink.append(&rec).unwrap();
        let content = fs::read_to_string(path).unwrap();
        assert_eq!(content.lines().nth(1), Some("2.5,,,09:00:00"));
    }

    #[test]
    fn first_record_without_voltage_is_marked() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = CsvLogSink::new(dir.path().to_path_buf()).unwrap();
        let path = sink.append(&record(None, "2026-03-07 09:00:00")).unwrap();
        let content = fs::read_to_string(path).unwrap();
        assert_eq!(content.lines().nth(1), Some("n/a,1200,400.5,09:00:00"));
        assert_eq!(sink.last_voltage(), None);
    }
}
