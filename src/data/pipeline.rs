//! The history view pipeline.
//!
//! `render` is the single entry point that turns the full measurement log into everything
//! the history page draws:
//!
//! ```text
//! sequence ──filter(policy, now)──► filtered ──┬─► downsample ──► points ──► smoothing ──► overlay
//!                                              └─► hour histogram
//! ```
//!
//! It is a pure function of its inputs and is re-run wholesale whenever the sequence,
//! the policy or the selection changes.

use super::downsample::{Downsampler, RenderPoint, DOWNSAMPLE_THRESHOLD};
use super::filter::{filter, RetentionPolicy};
use super::histogram::{hour_histogram, HistogramBucket};
use super::smoothing::SmoothedSeries;
use crate::measurement::MeasurementSequence;
use crate::selection::SelectionSet;
use chrono::{DateTime, TimeZone};
use std::fmt;

/// Tuning knobs for [`render`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewOptions {
    /// Sequences at or below this length are not downsampled
    pub downsample_threshold: usize,
    /// Point budget for [`RetentionPolicy::AllData`]
    pub target_points_all: usize,
    /// Point budget for the one- and three-month windows
    pub target_points_recent: usize,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            downsample_threshold: DOWNSAMPLE_THRESHOLD,
            target_points_all: RetentionPolicy::AllData.target_points(),
            target_points_recent: RetentionPolicy::LastMonth.target_points(),
        }
    }
}

impl ViewOptions {
    /// Point budget for `policy`.
    pub fn target_points(&self, policy: RetentionPolicy) -> usize {
        match policy {
            RetentionPolicy::AllData => self.target_points_all,
            RetentionPolicy::LastMonth | RetentionPolicy::LastThreeMonths => {
                self.target_points_recent
            }
        }
    }

    /// Downsampler configured for `policy`.
    pub fn downsampler(&self, policy: RetentionPolicy) -> Downsampler {
        Downsampler::new(self.target_points(policy)).with_threshold(self.downsample_threshold)
    }
}

/// Everything derived from one (sequence, policy, selection, now) input.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderedView {
    /// Policy the view was rendered with
    pub policy: RetentionPolicy,
    /// Measurements inside the retention window, un-aggregated
    pub filtered: MeasurementSequence,
    /// Chart and table rows
    pub points: Vec<RenderPoint>,
    /// Always 24 buckets, built from `filtered`
    pub histogram: Vec<HistogramBucket>,
    /// Moving average over `points`
    pub overlay: SmoothedSeries,
}

impl RenderedView {
    /// Number of rendered rows marked selected.
    pub fn selected_count(&self) -> usize {
        self.points.iter().filter(|p| p.selected).count()
    }
}

/// Run the full view pipeline.
pub fn render<Tz>(
    sequence: &MeasurementSequence,
    policy: RetentionPolicy,
    selection: &SelectionSet,
    now: &DateTime<Tz>,
    options: &ViewOptions,
) -> RenderedView
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    let tz = now.timezone();
    let filtered = filter(sequence, policy, now);
    let points = options.downsampler(policy).apply(&filtered, selection, &tz);
    let histogram = hour_histogram(&filtered, &tz);
    let overlay = SmoothedSeries::from_points(&points);

    tracing::debug!(
        %policy,
        total = sequence.len(),
        visible = filtered.len(),
        points = points.len(),
        "Rendered history view"
    );

    RenderedView {
        policy,
        filtered,
        points,
        histogram,
        overlay,
    }
}
