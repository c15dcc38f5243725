//! Live readout: the push-stream consumer and the ring buffer it feeds.
pub mod buffer;
pub mod stream;

pub use buffer::{LiveBuffer, LiveSample, LIVE_CAPACITY};
pub use stream::{ConnectionState, LiveEvent, LiveFeed, LiveMonitor};
