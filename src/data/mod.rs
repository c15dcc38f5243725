//! History view processing: filtering, downsampling, smoothing and aggregation.
pub mod downsample;
pub mod filter;
pub mod histogram;
pub mod pipeline;
pub mod smoothing;

pub use downsample::{Downsampler, PointSource, RenderPoint};
pub use filter::RetentionPolicy;
pub use histogram::HistogramBucket;
pub use pipeline::{render, RenderedView, ViewOptions};
pub use smoothing::{MovingAverage, SmoothedSeries};
