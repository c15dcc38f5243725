//! Configuration loading using Figment
//!
//! Configuration is layered from:
//! 1. `config/scale_dash.toml` (base configuration)
//! 2. Environment variables prefixed with `SCALE_DASH_`, nested with `__`
//!
//! # Example
//! ```no_run
//! use scale_dash::config::DashConfig;
//!
//! let config = DashConfig::load()?;
//! println!("Device: {}", config.api.base_url);
//! # Ok::<(), scale_dash::error::DashError>(())
//! ```

use crate::data::filter::RetentionPolicy;
use crate::data::pipeline::ViewOptions;
use crate::error::{AppResult, DashError};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default location of the configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "config/scale_dash.toml";

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashConfig {
    /// Application settings
    #[serde(default)]
    pub application: ApplicationConfig,
    /// Device HTTP API
    #[serde(default)]
    pub api: ApiConfig,
    /// Live push stream
    #[serde(default)]
    pub live: LiveConfig,
    /// History view tuning
    #[serde(default)]
    pub view: ViewConfig,
}

/// Application-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Application name
    pub name: String,
    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: "scale-dash".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Device HTTP API configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the device, e.g. `http://weight-whiskers.local`
    pub base_url: String,
    /// Per-request timeout in milliseconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://weight-whiskers.local".to_string(),
            request_timeout_ms: default_request_timeout(),
        }
    }
}

impl ApiConfig {
    /// Per-request timeout as a `Duration`.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Live stream configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveConfig {
    /// WebSocket URL of the push channel
    pub url: String,
    /// Number of samples retained by the live buffer
    #[serde(default = "default_live_capacity")]
    pub capacity: usize,
    /// Reconnect after the channel drops
    #[serde(default = "default_true")]
    pub auto_reconnect: bool,
    /// Delay between reconnect attempts in milliseconds
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_ms: u64,
    /// Reconnect attempts after a failed or dropped connection (0 = unlimited)
    #[serde(default)]
    pub max_reconnect_attempts: u32,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            url: "ws://weight-whiskers.local/ws".to_string(),
            capacity: default_live_capacity(),
            auto_reconnect: true,
            reconnect_delay_ms: default_reconnect_delay(),
            max_reconnect_attempts: 0,
        }
    }
}

/// History view tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewConfig {
    /// Retention policy applied when a session starts
    #[serde(default)]
    pub default_policy: RetentionPolicy,
    /// Sequences at or below this length are rendered point-for-point
    #[serde(default = "default_downsample_threshold")]
    pub downsample_threshold: usize,
    /// Point budget for the all-data view
    #[serde(default = "default_target_points_all")]
    pub target_points_all: usize,
    /// Point budget for the last-month and last-three-months views
    #[serde(default = "default_target_points_recent")]
    pub target_points_recent: usize,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            default_policy: RetentionPolicy::default(),
            downsample_threshold: default_downsample_threshold(),
            target_points_all: default_target_points_all(),
            target_points_recent: default_target_points_recent(),
        }
    }
}

impl ViewConfig {
    /// Pipeline options built from this section.
    pub fn view_options(&self) -> ViewOptions {
        ViewOptions {
            downsample_threshold: self.downsample_threshold,
            target_points_all: self.target_points_all,
            target_points_recent: self.target_points_recent,
        }
    }
}

// Default value functions
fn default_request_timeout() -> u64 {
    5000
}

fn default_live_capacity() -> usize {
    crate::live::buffer::LIVE_CAPACITY
}

fn default_true() -> bool {
    true
}

fn default_reconnect_delay() -> u64 {
    1000
}

fn default_downsample_threshold() -> usize {
    crate::data::downsample::DOWNSAMPLE_THRESHOLD
}

fn default_target_points_all() -> usize {
    RetentionPolicy::AllData.target_points()
}

fn default_target_points_recent() -> usize {
    RetentionPolicy::LastMonth.target_points()
}

impl DashConfig {
    /// Load configuration from `config/scale_dash.toml` and environment variables
    ///
    /// Environment variables override the file with prefix `SCALE_DASH_`, e.g.
    /// `SCALE_DASH_APPLICATION__LOG_LEVEL=debug`.
    pub fn load() -> AppResult<Self> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from a specific file path
    ///
    /// A missing file is not an error; built-in defaults fill the gaps.
    pub fn load_from<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let config: DashConfig = Figment::from(Serialized::defaults(DashConfig::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("SCALE_DASH_").split("__"))
            .extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> AppResult<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.application.log_level.to_lowercase().as_str()) {
            return Err(DashError::Configuration(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.application.log_level,
                valid_levels.join(", ")
            )));
        }

        if !(self.api.base_url.starts_with("http://") || self.api.base_url.starts_with("https://"))
        {
            return Err(DashError::Configuration(format!(
                "Invalid api.base_url '{}'. Must start with http:// or https://",
                self.api.base_url
            )));
        }

        if !(self.live.url.starts_with("ws://") || self.live.url.starts_with("wss://")) {
            return Err(DashError::Configuration(format!(
                "Invalid live.url '{}'. Must start with ws:// or wss://",
                self.live.url
            )));
        }

        if self.live.capacity == 0 {
            return Err(DashError::Configuration(
                "live.capacity must be greater than 0".to_string(),
            ));
        }

        if self.view.target_points_all == 0 || self.view.target_points_recent == 0 {
            return Err(DashError::Configuration(
                "view target points must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
