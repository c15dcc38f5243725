//! Centered moving-average overlay.
use super::downsample::RenderPoint;

/// The window covers 1/20th (5%) of the series.
const WINDOW_DIVISOR: usize = 20;
/// Smallest window ever used.
const MIN_WINDOW: usize = 5;

/// Window size for a series of `len` points: 5% of the length, at least 5, always odd.
pub fn window_size(len: usize) -> usize {
    let window = len.div_ceil(WINDOW_DIVISOR).max(MIN_WINDOW);
    window | 1
}

/// A symmetric moving average filter.
///
/// Each output value is the mean of the input values within `window / 2` positions on
/// either side. The window is clamped at the ends of the series, so edge values average
/// fewer points rather than padding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MovingAverage {
    window_size: usize,
}

impl MovingAverage {
    /// Filter with an explicit window. Even windows are widened by one.
    pub fn new(window_size: usize) -> Self {
        Self {
            window_size: window_size.max(1) | 1,
        }
    }

    /// Filter sized for a series of `len` points.
    pub fn for_len(len: usize) -> Self {
        Self::new(window_size(len))
    }

    /// Window width in points, always odd.
    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Smooth `values`. The output has the same length as the input.
    pub fn process(&self, values: &[f64]) -> Vec<f64> {
        let half = self.window_size / 2;

        // prefix[i] = sum of values[..i]
        let mut prefix = Vec::with_capacity(values.len() + 1);
        prefix.push(0.0);
        for v in values {
            prefix.push(prefix[prefix.len() - 1] + v);
        }

        (0..values.len())
            .map(|i| {
                let start = i.saturating_sub(half);
                let end = (i + half + 1).min(values.len());
                (prefix[end] - prefix[start]) / (end - start) as f64
            })
            .collect()
    }
}

/// Smoothed overlay aligned index-for-index with the series it was computed from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SmoothedSeries {
    /// Window used to compute `values`
    pub window_size: usize,
    /// One smoothed weight per render point
    pub values: Vec<f64>,
}

impl SmoothedSeries {
    /// Smooth the values of `points` with a window sized for their count.
    pub fn from_points(points: &[RenderPoint]) -> Self {
        let filter = MovingAverage::for_len(points.len());
        let values: Vec<f64> = points.iter().map(|p| p.value).collect();
        Self {
            window_size: filter.window_size(),
            values: filter.process(&values),
        }
    }

    /// Number of smoothed values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether there are no values.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
