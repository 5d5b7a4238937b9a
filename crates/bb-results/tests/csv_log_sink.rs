use bb_results::*;
use chrono::NaiveDateTime;

fn at(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
}

fn record(volts: Option<f64>, rpm: Option<f64>, ts: &str) -> LogRecord {
    LogRecord {
        commanded_voltage: volts,
        rpm,
        flow_lpm: Some(398.25),
        avg_flow_lpm: Some(399.0),
        timestamp: at(ts),
    }
}

#[test]
fn header_written_once_per_file() {
    let dir = tempfile::tempdir().unwrap();
    let mut sink = CsvLogSink::new(dir.path().to_path_buf()).unwrap();

    sink.append(&record(Some(3.75), Some(1500.0), "2026-10-19 10:00:00"))
        .unwrap();
    let path = sink
        .append(&record(Some(3.8), Some(1510.0), "2026-10-19 10:00:01"))
        .unwrap();

    let content = std::fs::read_to_string(path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(
        lines,
        vec![
            "Voltage Sent,RPM,Flow Rate,Current Time",
            "3.75,1500,398.25,10:00:00",
            "3.8,1510,398.25,10:00:01",
        ]
    );
}

#[test]
fn none_voltage_repeats_previous() {
    let dir = tempfile::tempdir().unwrap();
    let mut sink = CsvLogSink::new(dir.path().to_path_buf()).unwrap();

    sink.append(&record(Some(4.1), Some(1500.0), "2026-10-19 10:00:00"))
        .unwrap();
    let path = sink
        .append(&record(None, Some(1490.0), "2026-10-19 10:00:01"))
        .unwrap();

    let content = std::fs::read_to_string(path).unwrap();
    let last = content.lines().last().unwrap();
    assert_eq!(last, "4.1,1490,398.25,10:00:01");
}

#[test]
fn rotates_at_midnight() {
    let dir = tempfile::tempdir().unwrap();
    let mut sink = CsvLogSink::new(dir.path().to_path_buf()).unwrap();

    let before = sink
        .append(&record(Some(3.0), None, "2026-10-19 23:59:59"))
        .unwrap();
    let after = sink
        .append(&record(None, Some(1000.0), "2026-10-20 00:00:00"))
        .unwrap();

    assert_ne!(before, after);
    assert!(after.ends_with("blower_data_10-20-2026.csv"));

    let content = std::fs::read_to_string(after).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0], HEADER.join(","));
    // Carry-forward survives the rotation
    assert_eq!(lines[1], "3,1000,398.25,00:00:00");
}

#[test]
fn restart_picks_up_last_voltage_from_file() {
    let dir = tempfile::tempdir().unwrap();
    {
        let mut sink = CsvLogSink::new(dir.path().to_path_buf()).unwrap();
        sink.append(&record(Some(2.25), Some(900.0), "2026-10-19 08:00:00"))
            .unwrap();
    }

    let mut sink = CsvLogSink::new(dir.path().to_path_buf()).unwrap();
    let path = sink
        .append(&record(None, Some(905.0), "2026-10-19 08:05:00"))
        .unwrap();
    let content = std::fs::read_to_string(path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[2], "2.25,905,398.25,08:05:00");
}

#[test]
fn sink_trait_object() {
    let dir = tempfile::tempdir().unwrap();
    let mut sink: Box<dyn RecordSink> =
        Box::new(CsvLogSink::new(dir.path().to_path_buf()).unwrap());
    sink.append_record(&record(Some(1.0), Some(1.0), "2026-10-19 12:00:00"))
        .unwrap();
    assert!(dir.path().join("blower_data_10-19-2026.csv").exists());
}
