//! Measurement records and the ordered sequence they live in.
//!
//! A [`Measurement`] is one completed weighing reported by the scale. The full log is held
//! as a [`MeasurementSequence`], which is only ever replaced wholesale (re-ingestion) or
//! rebuilt without some entries (confirmed deletion). Views derived from it never share
//! storage with it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub mod export;
pub mod ingest;

/// One timestamped weight reading from the device.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    /// Seconds since the UNIX epoch. Unique within a sequence.
    pub timestamp: i64,
    /// Weight in grams
    pub weight: f64,
    /// Standard deviation of the samples averaged into `weight`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub std_dev: Option<f64>,
    /// How long the animal stayed on the scale, in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    /// Weight of anything left behind on the scale, in grams
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dropping_weight: Option<f64>,
}

impl Measurement {
    /// Measurement with only the required fields set.
    pub fn new(timestamp: i64, weight: f64) -> Self {
        Self {
            timestamp,
            weight,
            std_dev: None,
            duration: None,
            dropping_weight: None,
        }
    }

    /// Set the standard deviation.
    pub fn with_std_dev(mut self, std_dev: f64) -> Self {
        self.std_dev = Some(std_dev);
        self
    }

    /// Set the visit duration.
    pub fn with_duration(mut self, duration: f64) -> Self {
        self.duration = Some(duration);
        self
    }

    /// Set the dropping weight.
    pub fn with_dropping_weight(mut self, dropping_weight: f64) -> Self {
        self.dropping_weight = Some(dropping_weight);
        self
    }
}

/// Ordered measurement log.
///
/// Timestamps are expected to be non-decreasing. The sequence does not enforce this;
/// [`MeasurementSequence::is_sorted`] reports it so callers can log feeds that violate it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeasurementSequence {
    measurements: Vec<Measurement>,
}

impl MeasurementSequence {
    /// Wrap measurements in the order given.
    pub fn new(measurements: Vec<Measurement>) -> Self {
        Self { measurements }
    }

    /// Number of measurements.
    pub fn len(&self) -> usize {
        self.measurements.len()
    }

    /// Whether the sequence is empty.
    pub fn is_empty(&self) -> bool {
        self.measurements.is_empty()
    }

    /// Oldest measurement.
    pub fn first(&self) -> Option<&Measurement> {
        self.measurements.first()
    }

    /// Newest measurement.
    pub fn last(&self) -> Option<&Measurement> {
        self.measurements.last()
    }

    /// Iterate in sequence order.
    pub fn iter(&self) -> std::slice::Iter<'_, Measurement> {
        self.measurements.iter()
    }

    /// Measurements as a slice.
    pub fn as_slice(&self) -> &[Measurement] {
        &self.measurements
    }

    /// Timestamps in sequence order.
    pub fn timestamps(&self) -> impl Iterator<Item = i64> + '_ {
        self.measurements.iter().map(|m| m.timestamp)
    }

    /// Whether a measurement with `timestamp` exists.
    pub fn contains(&self, timestamp: i64) -> bool {
        self.measurements.iter().any(|m| m.timestamp == timestamp)
    }

    /// Whether timestamps are non-decreasing.
    pub fn is_sorted(&self) -> bool {
        self.measurements
            .windows(2)
            .all(|pair| pair[0].timestamp <= pair[1].timestamp)
    }

    /// Builds a new sequence keeping only measurements matching `keep`.
    pub fn filtered<F>(&self, mut keep: F) -> Self
    where
        F: FnMut(&Measurement) -> bool,
    {
        Self::new(
            self.measurements
                .iter()
                .filter(|m| keep(m))
                .cloned()
                .collect(),
        )
    }

    /// Builds a new sequence without the given timestamps.
    pub fn without(&self, timestamps: &BTreeSet<i64>) -> Self {
        self.filtered(|m| !timestamps.contains(&m.timestamp))
    }
}

impl From<Vec<Measurement>> for MeasurementSequence {
    fn from(measurements: Vec<Measurement>) -> Self {
        Self::new(measurements)
    }
}

impl FromIterator<Measurement> for MeasurementSequence {
    fn from_iter<I: IntoIterator<Item = Measurement>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a MeasurementSequence {
    type Item = &'a Measurement;
    type IntoIter = std::slice::Iter<'a, Measurement>;

    fn into_iter(self) -> Self::IntoIter {
        self.measurements.iter()
    }
}
