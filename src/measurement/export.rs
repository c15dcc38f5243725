//! Feed export in the same CSV layout the device serves.
use super::MeasurementSequence;
use crate::error::AppResult;
use std::io::Write;

/// Column order written by [`write_feed`].
pub const FEED_HEADER: [&str; 5] = ["time", "weight", "std", "duration", "dropping"];

fn cell(value: Option<f64>) -> String {
    value.map_or(String::new(), |v| v.to_string())
}

/// Write `sequence` as CSV. Absent optional fields are left blank.
pub fn write_feed<W: Write>(sequence: &MeasurementSequence, sink: W) -> AppResult<()> {
    let mut writer = csv::Writer::from_writer(sink);
    writer.write_record(FEED_HEADER)?;

    for m in sequence {
        writer.write_record(&[
            m.timestamp.to_string(),
            m.weight.to_string(),
            cell(m.std_dev),
            cell(m.duration),
            cell(m.dropping_weight),
        ])?;
    }

    writer.flush()?;
    tracing::debug!(rows = sequence.len(), "Exported measurement feed");
    Ok(())
}

/// Render `sequence` as a CSV string.
pub fn to_feed_string(sequence: &MeasurementSequence) -> AppResult<String> {
    let mut buf = Vec::new();
    write_feed(sequence, &mut buf)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measurement::{ingest::parse_feed, Measurement};

    #[test]
    fn export_reingests_to_same_sequence() {
        let seq: MeasurementSequence = vec![
            Measurement::new(1000, 4200.5).with_std_dev(3.25).with_duration(40.0),
            Measurement::new(2000, 4188.0).with_dropping_weight(2.0),
        ]
        .into();

        let csv = to_feed_string(&seq).unwrap();
        assert!(csv.starts_with("time,weight,std,duration,dropping\n"));
        assert_eq!(parse_feed(&csv).unwrap(), seq);
    }

    #[test]
    fn writes_blank_cells_for_absent_fields() {
        let seq: MeasurementSequence = vec![Measurement::new(1000, 50.0)].into();
        let csv = to_feed_string(&seq).unwrap();
        assert_eq!(csv.lines().nth(1), Some("1000,50,,,"));
    }
}
