//! # Scale Dashboard Core Library
//!
//! This crate is the engine behind the dashboard of a pet-monitoring weight scale. It
//! ingests the scale's CSV measurement log, derives the history view (time window,
//! downsampled chart points, moving-average overlay, hour-of-day histogram), reconciles
//! row selection with batch deletion on the device, and keeps a bounded buffer of the
//! live weight stream. The `scale-dash` binary (`main.rs`) is a thin CLI over it.
//!
//! ## Crate Structure
//!
//! - **`config`**: Layered application configuration (defaults, TOML file, environment).
//! - **`dashboard`**: The `Dashboard` session that owns the sequence, policy and selection
//!   and re-renders the view after every change.
//! - **`data`**: Pure view pipeline: retention filter, downsampler, smoother, histogram.
//! - **`device`**: Device configuration and system-info documents.
//! - **`error`**: The `DashError` enum and `AppResult` alias.
//! - **`live`**: Live push channel consumer and its ring buffer.
//! - **`logging`**: `tracing` subscriber setup.
//! - **`measurement`**: The `Measurement` record, feed ingestion and export.
//! - **`selection`**: Timestamp-keyed selection and the delete request.
//! - **`store`**: `MeasurementStore` trait and its HTTP client.

pub mod config;
pub mod dashboard;
pub mod data;
pub mod device;
pub mod error;
pub mod live;
pub mod logging;
pub mod measurement;
pub mod selection;
pub mod store;

pub use dashboard::{Dashboard, DeleteOutcome, RequestToken};
pub use error::{AppResult, DashError};
pub use measurement::{Measurement, MeasurementSequence};
