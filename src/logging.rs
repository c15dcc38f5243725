//! Tracing setup
//!
//! Structured logging built on `tracing` and `tracing-subscriber`:
//! - pretty, compact or JSON output
//! - `RUST_LOG` overrides the configured level
//! - initialization is skipped when a subscriber is already installed
//!
//! # Example
//! ```no_run
//! use scale_dash::{config::DashConfig, logging};
//! use tracing::info;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = DashConfig::load()?;
//! logging::init_from_config(&config)?;
//! info!(device = %config.api.base_url, "Dashboard started");
//! # Ok(())
//! # }
//! ```

use crate::config::DashConfig;
use crate::error::{AppResult, DashError};
use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

/// Output format for tracing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Pretty-printed format with colors (for development)
    Pretty,
    /// Compact single-line format
    Compact,
    /// JSON format for log aggregation
    Json,
}

/// Tracing configuration options
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: Level,
    /// Output format
    pub format: OutputFormat,
    /// Whether to include span events (NEW, CLOSE)
    pub with_span_events: bool,
    /// Whether to include file and line numbers
    pub with_file_and_line: bool,
    /// Whether to enable ANSI colors (ignored for JSON)
    pub with_ansi: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: OutputFormat::Compact,
            with_span_events: false,
            with_file_and_line: false,
            with_ansi: true,
        }
    }
}

impl TracingConfig {
    /// Create tracing config from the application configuration
    pub fn from_config(config: &DashConfig) -> AppResult<Self> {
        let level = parse_log_level(&config.application.log_level)?;

        Ok(Self {
            level,
            ..Default::default()
        })
    }

    /// Compact output at `level`.
    pub fn new(level: Level) -> Self {
        Self {
            level,
            ..Default::default()
        }
    }

    /// Set the output format.
    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    /// Log span creation and close.
    pub fn with_span_events(mut self, enabled: bool) -> Self {
        self.with_span_events = enabled;
        self
    }

    /// Enable or disable colors.
    pub fn with_ansi(mut self, enabled: bool) -> Self {
        self.with_ansi = enabled;
        self
    }
}

/// Initialize tracing from the application configuration
pub fn init_from_config(config: &DashConfig) -> AppResult<()> {
    init(TracingConfig::from_config(config)?)
}

/// Initialize tracing with custom configuration
///
/// Does nothing once a global subscriber is installed, so tests and embedding
/// applications keep their own.
pub fn init(config: TracingConfig) -> AppResult<()> {
    if tracing::dispatcher::has_been_set() {
        return Ok(());
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_str().to_lowercase()));

    tracing_subscriber::registry()
        .with(output_layer(&config).with_filter(filter))
        .try_init()
        .map_err(|e| DashError::Configuration(format!("Failed to initialize tracing: {e}")))
}

/// Formatting layer for `config`; the filter is applied by the caller.
fn output_layer(config: &TracingConfig) -> Box<dyn Layer<Registry> + Send + Sync> {
    let span_events = if config.with_span_events {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };
    let base = fmt::layer()
        .with_span_events(span_events)
        .with_file(config.with_file_and_line)
        .with_line_number(config.with_file_and_line)
        .with_ansi(config.with_ansi);

    match config.format {
        OutputFormat::Pretty => base.pretty().boxed(),
        OutputFormat::Compact => base.compact().boxed(),
        OutputFormat::Json => base.json().with_ansi(false).boxed(),
    }
}

/// Parse log level string into tracing Level
fn parse_log_level(level: &str) -> AppResult<Level> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => Err(DashError::Configuration(format!(
            "Invalid log level '{level}'. Must be one of: trace, debug, info, warn, error"
        ))),
    }
}
