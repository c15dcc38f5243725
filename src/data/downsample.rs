//! Group-based downsampling of the measurement history for rendering.
//!
//! Sequences at or below [`DOWNSAMPLE_THRESHOLD`] are forwarded point-for-point. Longer
//! ones are cut into fixed-width day buckets anchored at the first timestamp (not at
//! calendar boundaries), and every bucket collapses into one averaged point:
//!
//! ```text
//! total_days     = (last.ts - first.ts) / 86400
//! days_per_group = max(1, ceil(total_days / target_points))
//! group(m)       = floor((m.ts - first.ts) / 86400 / days_per_group)
//! ```
//!
//! The group index is clamped to `0..target_points`, so a measurement landing exactly on
//! the far edge of the last bucket folds into it and the output never exceeds the budget.
//!
//! Aggregation is lossy. An aggregated point keeps the timestamps of its members so that
//! selection and deletion can address the real measurements behind it.

use crate::measurement::{Measurement, MeasurementSequence};
use crate::selection::SelectionSet;
use chrono::TimeZone;
use std::collections::BTreeMap;
use std::fmt;

/// Sequences at or below this length are not downsampled.
pub const DOWNSAMPLE_THRESHOLD: usize = 500;

const SECONDS_PER_DAY: f64 = 86_400.0;

const RAW_LABEL_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const DAY_LABEL_FORMAT: &str = "%Y-%m-%d";

/// What a render point stands for.
#[derive(Clone, Debug, PartialEq)]
pub enum PointSource {
    /// A single measurement forwarded unchanged.
    Raw(Measurement),
    /// The average of a group of measurements.
    Group {
        /// Synthesized measurement: mean weight and std dev, zeroed duration and dropping.
        summary: Measurement,
        /// Timestamps of the measurements averaged into `summary`, in sequence order.
        members: Vec<i64>,
    },
}

impl PointSource {
    /// The originating or synthesized measurement.
    pub fn measurement(&self) -> &Measurement {
        match self {
            PointSource::Raw(m) => m,
            PointSource::Group { summary, .. } => summary,
        }
    }

    /// Timestamps of the real measurements behind this point.
    pub fn member_timestamps(&self) -> Vec<i64> {
        match self {
            PointSource::Raw(m) => vec![m.timestamp],
            PointSource::Group { members, .. } => members.clone(),
        }
    }

    /// Whether this point averages a group.
    pub fn is_aggregated(&self) -> bool {
        matches!(self, PointSource::Group { .. })
    }
}

/// Unit handed to the charting layer.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderPoint {
    /// Display date (or date range for multi-day groups)
    pub label: String,
    /// Weight in grams
    pub value: f64,
    /// Measurement or group behind the point
    pub source: PointSource,
    /// Whether any measurement behind the point is selected
    pub selected: bool,
}

impl RenderPoint {
    /// Timestamp of the raw measurement, or of the group's middle member.
    pub fn timestamp(&self) -> i64 {
        self.source.measurement().timestamp
    }

    fn raw<Tz>(m: &Measurement, selection: &SelectionSet, tz: &Tz) -> Self
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        Self {
            label: format_timestamp(m.timestamp, tz, RAW_LABEL_FORMAT),
            value: m.weight,
            source: PointSource::Raw(m.clone()),
            selected: selection.contains(m.timestamp),
        }
    }
}

/// Groups and averages measurements to bound the number of render points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Downsampler {
    /// Sequences at or below this length pass through
    pub threshold: usize,
    /// Upper bound on the number of groups
    pub target_points: usize,
}

impl Downsampler {
    /// Downsampler with the default threshold. A zero budget is raised to 1.
    pub fn new(target_points: usize) -> Self {
        Self {
            threshold: DOWNSAMPLE_THRESHOLD,
            target_points: target_points.max(1),
        }
    }

    /// Override the pass-through threshold.
    pub fn with_threshold(mut self, threshold: usize) -> Self {
        self.threshold = threshold;
        self
    }

    /// Bucket width in days, or `None` when the sequence is short enough to pass through.
    pub fn days_per_group(&self, sequence: &MeasurementSequence) -> Option<u64> {
        if sequence.len() <= self.threshold {
            return None;
        }
        let (first, last) = (sequence.first()?, sequence.last()?);
        let total_days = (last.timestamp - first.timestamp) as f64 / SECONDS_PER_DAY;
        // Negative spans (unsorted input) saturate to 0 in the cast.
        let days = (total_days / self.target_points as f64).ceil() as u64;
        Some(days.max(1))
    }

    /// Produce render points for `sequence`, marking members of `selection`.
    pub fn apply<Tz>(
        &self,
        sequence: &MeasurementSequence,
        selection: &SelectionSet,
        tz: &Tz,
    ) -> Vec<RenderPoint>
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        let (Some(days_per_group), Some(first)) = (self.days_per_group(sequence), sequence.first())
        else {
            return sequence
                .iter()
                .map(|m| RenderPoint::raw(m, selection, tz))
                .collect();
        };

        let max_group = self.target_points as i64 - 1;
        let mut groups: BTreeMap<i64, Vec<&Measurement>> = BTreeMap::new();
        for m in sequence {
            let offset_days = (m.timestamp - first.timestamp) as f64 / SECONDS_PER_DAY;
            let group = (offset_days / days_per_group as f64).floor() as i64;
            groups
                .entry(group.clamp(0, max_group))
                .or_default()
                .push(m);
        }

        let mut points: Vec<RenderPoint> = groups
            .values()
            .map(|members| aggregate(members, days_per_group, selection, tz))
            .collect();
        points.sort_by_key(RenderPoint::timestamp);

        tracing::debug!(
            input = sequence.len(),
            output = points.len(),
            days_per_group,
            "Downsampled measurement history"
        );
        points
    }
}

fn aggregate<Tz>(
    members: &[&Measurement],
    days_per_group: u64,
    selection: &SelectionSet,
    tz: &Tz,
) -> RenderPoint
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    let count = members.len() as f64;
    let weight = members.iter().map(|m| m.weight).sum::<f64>() / count;
    let std_dev = members.iter().map(|m| m.std_dev.unwrap_or(0.0)).sum::<f64>() / count;
    let middle = members[members.len() / 2].timestamp;
    let first = members[0].timestamp;
    let last = members[members.len() - 1].timestamp;

    let label = if days_per_group == 1 {
        format_timestamp(first, tz, DAY_LABEL_FORMAT)
    } else {
        format!(
            "{} - {}",
            format_timestamp(first, tz, DAY_LABEL_FORMAT),
            format_timestamp(last, tz, DAY_LABEL_FORMAT)
        )
    };

    RenderPoint {
        label,
        value: weight,
        source: PointSource::Group {
            summary: Measurement {
                timestamp: middle,
                weight,
                std_dev: Some(std_dev),
                duration: Some(0.0),
                dropping_weight: Some(0.0),
            },
            members: members.iter().map(|m| m.timestamp).collect(),
        },
        selected: members.iter().any(|m| selection.contains(m.timestamp)),
    }
}

fn format_timestamp<Tz>(timestamp: i64, tz: &Tz, format: &str) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    tz.timestamp_opt(timestamp, 0)
        .single()
        .map(|dt| dt.format(format).to_string())
        .unwrap_or_else(|| timestamp.to_string())
}
