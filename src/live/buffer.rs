//! Fixed-capacity buffer of the most recent live samples.
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Number of samples kept for the live chart.
pub const LIVE_CAPACITY: usize = 100;

/// One reading pushed by the scale while something is on it.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LiveSample {
    /// Device clock in milliseconds
    pub timestamp: i64,
    /// Weight in grams
    pub weight: f64,
}

/// FIFO ring of live samples. Pushing past capacity evicts the oldest sample.
#[derive(Debug, Clone)]
pub struct LiveBuffer {
    samples: VecDeque<LiveSample>,
    capacity: usize,
    start_time: Option<i64>,
}

impl Default for LiveBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl LiveBuffer {
    /// Buffer holding [`LIVE_CAPACITY`] samples.
    pub fn new() -> Self {
        Self::with_capacity(LIVE_CAPACITY)
    }

    /// Buffer holding `capacity` samples, at least 1.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity + 1),
            capacity,
            start_time: None,
        }
    }

    /// Append a sample, returning the evicted one if the buffer was full.
    pub fn push(&mut self, sample: LiveSample) -> Option<LiveSample> {
        self.start_time.get_or_insert(sample.timestamp);
        self.samples.push_back(sample);
        if self.samples.len() > self.capacity {
            self.samples.pop_front()
        } else {
            None
        }
    }

    /// Number of buffered samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether nothing has been buffered.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Maximum number of samples kept.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Most recent sample.
    pub fn latest(&self) -> Option<&LiveSample> {
        self.samples.back()
    }

    /// Samples in arrival order, oldest first.
    pub fn samples(&self) -> impl Iterator<Item = &LiveSample> + '_ {
        self.samples.iter()
    }

    /// Timestamp of the first sample this session, kept after it is evicted.
    pub fn start_time(&self) -> Option<i64> {
        self.start_time
    }

    /// Chart series as `[seconds since session start, weight]` pairs.
    pub fn series(&self) -> Vec<[f64; 2]> {
        let start = self.start_time.unwrap_or_default();
        self.samples
            .iter()
            .map(|s| [(s.timestamp - start) as f64 / 1000.0, s.weight])
            .collect()
    }
}
