//! Custom error types for the dashboard engine.
//!
//! `DashError` is the single error type returned by the library. It is built with
//! `thiserror`, and `#[from]` conversions let the `?` operator lift errors from the
//! CSV reader, the JSON decoder, the HTTP client and the configuration loader.
//!
//! ## Error Scopes
//!
//! Every variant belongs to exactly one [`ErrorScope`]:
//!
//! - **`Ingestion`**: the measurement feed could not be turned into a sequence
//!   (malformed rows, CSV syntax, or a reload response that arrived out of date).
//! - **`Delete`**: the device refused a delete request.
//! - **`Stream`**: the live push channel dropped or delivered something unreadable.
//! - **`Transport`**: the HTTP request itself failed.
//! - **`Config`**: the configuration file or an argument derived from it is invalid.
//! - **`Io`**: local file I/O.
//!
//! None of these are fatal. A failing operation leaves the session's previous sequence,
//! selection and derived views in place.

use thiserror::Error;

/// Convenience alias for results using the library error type.
pub type AppResult<T> = std::result::Result<T, DashError>;

/// Errors returned by the library.
#[derive(Error, Debug)]
pub enum DashError {
    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    /// Configuration loaded but failed validation
    #[error("Configuration validation error: {0}")]
    Configuration(String),

    /// Unrecognized retention policy name
    #[error("Unknown retention policy '{0}'")]
    UnknownPolicy(String),

    /// Local file I/O failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV syntax error in the feed
    #[error("Malformed measurement feed: {0}")]
    Csv(#[from] csv::Error),

    /// Feed parsed but a row is unusable
    #[error("Ingestion error: {0}")]
    Ingestion(String),

    /// A newer request superseded this response
    #[error("Discarded stale response for request {issued} (latest is {latest})")]
    StaleResponse {
        /// Token the response was requested with
        issued: u64,
        /// Latest token issued by the session
        latest: u64,
    },

    /// Device answered a delete with a non-200 status
    #[error("Delete request rejected with HTTP status {0}")]
    DeleteRejected(u16),

    /// HTTP request failed
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Live channel failure
    #[error("Live stream error: {0}")]
    Stream(String),

    /// JSON payload did not decode
    #[error("Undecodable live message: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<figment::Error> for DashError {
    fn from(value: figment::Error) -> Self {
        DashError::Config(Box::new(value))
    }
}

/// The operation family an error is scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorScope {
    /// Feed parsing and reloads
    Ingestion,
    /// Batch deletion
    Delete,
    /// Live push channel
    Stream,
    /// HTTP transport
    Transport,
    /// Configuration
    Config,
    /// Local files
    Io,
}

impl DashError {
    /// Which operation family this error belongs to.
    pub fn scope(&self) -> ErrorScope {
        match self {
            DashError::Ingestion(_) | DashError::Csv(_) | DashError::StaleResponse { .. } => {
                ErrorScope::Ingestion
            }
            DashError::DeleteRejected(_) => ErrorScope::Delete,
            DashError::Stream(_) | DashError::Json(_) => ErrorScope::Stream,
            DashError::Transport(_) => ErrorScope::Transport,
            DashError::Config(_) | DashError::Configuration(_) | DashError::UnknownPolicy(_) => {
                ErrorScope::Config
            }
            DashError::Io(_) => ErrorScope::Io,
        }
    }

    /// Whether retrying the triggering operation can succeed without a restart.
    ///
    /// Configuration errors need the operator to fix the file first.
    pub fn can_recover(&self) -> bool {
        self.scope() != ErrorScope::Config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delete_rejection_is_recoverable() {
        let err = DashError::DeleteRejected(500);
        assert_eq!(err.scope(), ErrorScope::Delete);
        assert!(err.can_recover());
        assert!(err.to_string().contains("500"));
    }

    #[test]
    fn stale_response_is_scoped_to_ingestion() {
        let err = DashError::StaleResponse {
            issued: 3,
            latest: 4,
        };
        assert_eq!(err.scope(), ErrorScope::Ingestion);
        assert!(err.to_string().contains("request 3"));
    }

    #[test]
    fn config_errors_are_not_recoverable() {
        let err = DashError::UnknownPolicy("last-year".into());
        assert_eq!(err.scope(), ErrorScope::Config);
        assert!(!err.can_recover());
    }

    #[test]
    fn json_errors_convert_into_stream_scope() {
        let parse: Result<serde_json::Value, _> = serde_json::from_str("{not json");
        let err: DashError = parse.unwrap_err().into();
        assert_eq!(err.scope(), ErrorScope::Stream);
    }
}
