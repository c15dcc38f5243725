//! Measurement feed ingestion.
//!
//! The device serves its log as CSV with a header row. Cells are dynamically typed: a
//! column may hold numbers, blanks, or junk left over from older firmware. Normalization
//! rules:
//!
//! - `time <= 0` (or blank / non-numeric) marks a sentinel row; it is dropped silently.
//! - A row with a valid `time` but no numeric `weight` makes the whole feed malformed.
//! - Optional columns (`std`/`stdDev`, `variance`, `duration`, `dropping`/`droppingWeight`)
//!   become `None` when blank or non-numeric. `std` falls back to `sqrt(variance)`.
//!
//! Rows keep their input order. The feed is expected to be sorted by time already.

use super::{Measurement, MeasurementSequence};
use crate::error::{AppResult, DashError};
use serde::Deserialize;
use std::io::Read;
use tracing::{debug, info, warn};

#[derive(Debug, Deserialize)]
struct FeedRow {
    #[serde(default, deserialize_with = "csv::invalid_option")]
    time: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    weight: Option<f64>,
    #[serde(default, alias = "stdDev", deserialize_with = "csv::invalid_option")]
    std: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    variance: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    duration: Option<f64>,
    #[serde(
        default,
        alias = "droppingWeight",
        deserialize_with = "csv::invalid_option"
    )]
    dropping: Option<f64>,
}

impl FeedRow {
    /// Timestamp in whole seconds, or `None` for sentinel rows.
    fn timestamp(&self) -> Option<i64> {
        self.time
            .filter(|t| t.is_finite() && *t > 0.0)
            .map(|t| t.trunc() as i64)
    }

    fn into_measurement(self, timestamp: i64, row: usize) -> AppResult<Measurement> {
        let weight = self.weight.filter(|w| w.is_finite()).ok_or_else(|| {
            DashError::Ingestion(format!(
                "row {row} (time {timestamp}) has no numeric weight"
            ))
        })?;

        let std_dev = finite(self.std).or_else(|| finite(self.variance).map(f64::sqrt));

        Ok(Measurement {
            timestamp,
            weight,
            std_dev,
            duration: finite(self.duration),
            dropping_weight: finite(self.dropping),
        })
    }
}

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

/// Parse a feed already held in memory.
pub fn parse_feed(raw: &str) -> AppResult<MeasurementSequence> {
    read_feed(raw.as_bytes())
}

/// Parse a feed from any reader (file, HTTP body, ...).
pub fn read_feed<R: Read>(source: R) -> AppResult<MeasurementSequence> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(b',')
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(source);

    let mut measurements = Vec::new();
    let mut discarded = 0usize;

    for (idx, record) in reader.deserialize::<FeedRow>().enumerate() {
        let row = idx + 1;
        let record = record?;
        match record.timestamp() {
            Some(timestamp) => measurements.push(record.into_measurement(timestamp, row)?),
            None => {
                debug!(row, time = ?record.time, "Discarding sentinel feed row");
                discarded += 1;
            }
        }
    }

    let sequence = MeasurementSequence::new(measurements);
    if !sequence.is_sorted() {
        warn!("Measurement feed is not sorted by time; rendering it in feed order");
    }
    info!(
        accepted = sequence.len(),
        discarded, "Ingested measurement feed"
    );
    Ok(sequence)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discards_sentinel_rows() {
        let feed = "time,weight\n1000,50\n0,999\n2000,52\n";
        let seq = parse_feed(feed).unwrap();

        let pairs: Vec<_> = seq.iter().map(|m| (m.timestamp, m.weight)).collect();
        assert_eq!(pairs, vec![(1000, 50.0), (2000, 52.0)]);
    }

    #[test]
    fn reads_optional_columns() {
        let feed = "time,weight,std,duration,dropping\n1000,4200.5,12.5,35,3\n";
        let seq = parse_feed(feed).unwrap();

        let m = seq.first().unwrap();
        assert_eq!(m.std_dev, Some(12.5));
        assert_eq!(m.duration, Some(35.0));
        assert_eq!(m.dropping_weight, Some(3.0));
    }

    #[test]
    fn accepts_camel_case_aliases() {
        let feed = "time,weight,stdDev,droppingWeight\n1000,4200,7,1.5\n";
        let m = parse_feed(feed).unwrap().first().cloned().unwrap();
        assert_eq!(m.std_dev, Some(7.0));
        assert_eq!(m.dropping_weight, Some(1.5));
    }

    #[test]
    fn derives_std_dev_from_variance() {
        let feed = "time,weight,variance\n1000,4200,16\n";
        let m = parse_feed(feed).unwrap().first().cloned().unwrap();
        assert_eq!(m.std_dev, Some(4.0));
    }

    #[test]
    fn blank_and_junk_optional_cells_become_absent() {
        let feed = "time,weight,std,duration\n1000,4200,,n/a\n";
        let m = parse_feed(feed).unwrap().first().cloned().unwrap();
        assert_eq!(m.std_dev, None);
        assert_eq!(m.duration, None);
    }

    #[test]
    fn blank_time_is_treated_as_sentinel() {
        let feed = "time,weight\n,50\n1000,51\n";
        let seq = parse_feed(feed).unwrap();
        assert_eq!(seq.len(), 1);
    }

    #[test]
    fn truncates_fractional_time() {
        let seq = parse_feed("time,weight\n1000.9,50\n").unwrap();
        assert_eq!(seq.first().unwrap().timestamp, 1000);
    }

    #[test]
    fn missing_weight_is_an_ingestion_error() {
        let err = parse_feed("time,weight\n1000,50\n2000,heavy\n").unwrap_err();
        match err {
            DashError::Ingestion(msg) => assert!(msg.contains("row 2")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn keeps_feed_order() {
        let seq = parse_feed("time,weight\n3000,1\n1000,2\n").unwrap();
        assert_eq!(seq.timestamps().collect::<Vec<_>>(), vec![3000, 1000]);
        assert!(!seq.is_sorted());
    }

    #[test]
    fn header_only_feed_is_empty() {
        assert!(parse_feed("time,weight\n").unwrap().is_empty());
    }
}
