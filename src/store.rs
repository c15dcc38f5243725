//! Client for the scale's HTTP API, the authoritative measurement store.
//!
//! [`MeasurementStore`] is the seam the dashboard session talks to; [`HttpStore`] is the
//! real implementation. Tests substitute in-memory stores.
//!
//! | Operation            | Request                                   |
//! |----------------------|-------------------------------------------|
//! | fetch feed           | `GET  /api/measurements` (CSV)            |
//! | delete measurements  | `POST /api/measurements` (JSON)           |
//! | upload feed          | `POST /api/measurements` (multipart)      |
//! | system info          | `GET  /api/system`                        |
//! | device configuration | `GET`/`POST /config`                      |

use crate::config::ApiConfig;
use crate::device::{DeviceConfig, SystemInfo};
use crate::error::{AppResult, DashError};
use crate::selection::DeleteRequest;
use async_trait::async_trait;
use reqwest::{multipart, Client, StatusCode};
use tracing::{debug, info, warn};

const MEASUREMENTS_PATH: &str = "/api/measurements";
const SYSTEM_PATH: &str = "/api/system";
const CONFIG_PATH: &str = "/config";

/// Remote store holding the measurement log and device documents.
#[async_trait]
pub trait MeasurementStore: Send + Sync {
    /// Download the raw CSV feed.
    async fn fetch_feed(&self) -> AppResult<String>;

    /// Ask the device to delete measurements. Only HTTP 200 counts as success.
    async fn delete(&self, request: &DeleteRequest) -> AppResult<()>;

    /// Replace the whole remote log with `feed`.
    async fn upload_feed(&self, feed: String) -> AppResult<()>;

    /// Read flash and WiFi status.
    async fn fetch_system_info(&self) -> AppResult<SystemInfo>;

    /// Read the persisted device configuration.
    async fn fetch_device_config(&self) -> AppResult<DeviceConfig>;

    /// Replace the device configuration.
    async fn update_device_config(&self, config: &DeviceConfig) -> AppResult<()>;
}

/// `reqwest` implementation of [`MeasurementStore`].
#[derive(Debug, Clone)]
pub struct HttpStore {
    client: Client,
    base_url: String,
}

impl HttpStore {
    /// Client for the device at `config.base_url`.
    pub fn new(config: &ApiConfig) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl MeasurementStore for HttpStore {
    async fn fetch_feed(&self) -> AppResult<String> {
        let url = self.url(MEASUREMENTS_PATH);
        debug!(url = %url, "Fetching measurement feed");
        let body = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(body)
    }

    async fn delete(&self, request: &DeleteRequest) -> AppResult<()> {
        let url = self.url(MEASUREMENTS_PATH);
        let response = self.client.post(&url).json(request).send().await?;

        let status = response.status();
        if status != StatusCode::OK {
            warn!(status = status.as_u16(), "Device rejected delete request");
            return Err(DashError::DeleteRejected(status.as_u16()));
        }
        info!(count = request.timestamps.len(), "Device deleted measurements");
        Ok(())
    }

    async fn upload_feed(&self, feed: String) -> AppResult<()> {
        let url = self.url(MEASUREMENTS_PATH);
        let part = multipart::Part::text(feed)
            .file_name("measurements.csv")
            .mime_str("text/csv")?;
        let form = multipart::Form::new().part("measurements", part);

        self.client
            .post(&url)
            .multipart(form)
            .send()
            .await?
            .error_for_status()?;
        info!("Uploaded measurement feed");
        Ok(())
    }

    async fn fetch_system_info(&self) -> AppResult<SystemInfo> {
        let info = self
            .client
            .get(self.url(SYSTEM_PATH))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(info)
    }

    async fn fetch_device_config(&self) -> AppResult<DeviceConfig> {
        let config = self
            .client
            .get(self.url(CONFIG_PATH))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(config)
    }

    async fn update_device_config(&self, config: &DeviceConfig) -> AppResult<()> {
        self.client
            .post(self.url(CONFIG_PATH))
            .json(config)
            .send()
            .await?
            .error_for_status()?;
        info!("Updated device configuration");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_base_url_without_double_slash() {
        let store = HttpStore::new(&ApiConfig {
            base_url: "http://scale.local/".to_string(),
            request_timeout_ms: 1000,
        })
        .unwrap();
        assert_eq!(
            store.url(MEASUREMENTS_PATH),
            "http://scale.local/api/measurements"
        );
    }
}
