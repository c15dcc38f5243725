//! Hour-of-day histogram of measurements.
use crate::measurement::MeasurementSequence;
use chrono::{TimeZone, Timelike};
use serde::Serialize;

/// Number of buckets in a histogram.
pub const HOURS_PER_DAY: usize = 24;

/// Visits starting in one local hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HistogramBucket {
    /// Local hour, 0..=23
    pub hour: u32,
    /// Measurements in this hour
    pub count: u32,
}

/// Count measurements per local hour in `tz`.
///
/// Always returns 24 buckets, ordered by hour. Must be fed the filtered sequence, never
/// a downsampled one.
pub fn hour_histogram<Tz: TimeZone>(sequence: &MeasurementSequence, tz: &Tz) -> Vec<HistogramBucket> {
    let mut counts = [0u32; HOURS_PER_DAY];
    for m in sequence {
        let hour = tz
            .timestamp_opt(m.timestamp, 0)
            .earliest()
            .map_or(0, |dt| dt.hour() as usize);
        counts[hour] += 1;
    }

    counts
        .iter()
        .enumerate()
        .map(|(hour, &count)| HistogramBucket {
            hour: hour as u32,
            count,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measurement::Measurement;
    use chrono::{FixedOffset, Utc};

    #[test]
    fn always_24_buckets() {
        let buckets = hour_histogram(&MeasurementSequence::default(), &Utc);
        assert_eq!(buckets.len(), 24);
        assert!(buckets.iter().all(|b| b.count == 0));
        assert_eq!(buckets[23].hour, 23);
    }

    #[test]
    fn counts_by_local_hour() {
        let seq: MeasurementSequence = vec![
            Measurement::new(0, 1.0),            // 00:00 UTC
            Measurement::new(3600 * 5 + 59, 1.0), // 05:00 UTC
            Measurement::new(3600 * 5 + 60, 1.0), // 05:01 UTC
        ]
        .into();

        let utc = hour_histogram(&seq, &Utc);
        assert_eq!(utc[0].count, 1);
        assert_eq!(utc[5].count, 2);

        let plus_two = hour_histogram(&seq, &FixedOffset::east_opt(2 * 3600).unwrap());
        assert_eq!(plus_two[2].count, 1);
        assert_eq!(plus_two[7].count, 2);
    }

    #[test]
    fn counts_sum_to_sequence_length() {
        let seq: MeasurementSequence = (0..1234)
            .map(|i| Measurement::new(i * 1800 + 17, 1.0))
            .collect();
        let total: u32 = hour_histogram(&seq, &Utc).iter().map(|b| b.count).sum();
        assert_eq!(total as usize, seq.len());
    }
}
