//! Documents exchanged with the scale besides the measurement log.
//!
//! [`DeviceConfig`] is the firmware's persisted configuration. It is read from and posted
//! back to `/config` as snake_case JSON, and fields missing from the device's answer take
//! the firmware defaults. [`SystemInfo`] is the read-only health report served at
//! `/api/system`. The firmware may omit any part of it.

use serde::{Deserialize, Serialize};

/// Persisted firmware configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// MQTT broker host
    pub mqtt_server: String,
    /// MQTT broker port
    pub mqtt_port: u16,
    /// Topic receiving the averaged weight once the animal leaves the scale
    pub mqtt_topic_cat_weight: String,
    /// Topic receiving the instantaneous weight
    pub mqtt_topic_current_weight: String,
    /// HX711 scale factor, recomputed by calibration
    pub scale_calib_value: f64,
    /// Reference weight used for calibration, grams
    pub scale_calib_weight: u32,
    /// Readings above this many grams mean the scale is occupied
    pub scale_weight_min: u32,
    /// Interval between automatic tare checks, milliseconds
    pub scale_tare_time: u32,
    /// Drift below this many grams is tared away automatically
    pub scale_tare_thresh: u32,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            mqtt_server: "localhost".to_string(),
            mqtt_port: 1883,
            mqtt_topic_cat_weight: "home/cat/scale/measured".to_string(),
            mqtt_topic_current_weight: "home/cat/scale/current".to_string(),
            scale_calib_value: 1.0,
            scale_calib_weight: 500,
            scale_weight_min: 2000,
            scale_tare_time: 60_000,
            scale_tare_thresh: 50,
        }
    }
}

/// Flash usage in bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FlashUsage {
    /// Flash size
    pub total: Option<u64>,
    /// Bytes in use
    pub used: Option<u64>,
    /// Size of the configuration file
    pub config: Option<u64>,
    /// Size of the measurement log
    pub measurements: Option<u64>,
}

impl FlashUsage {
    /// Used share of the flash, `None` when either figure is missing or total is 0.
    pub fn used_fraction(&self) -> Option<f64> {
        match (self.used, self.total) {
            (Some(used), Some(total)) if total > 0 => Some(used as f64 / total as f64),
            _ => None,
        }
    }
}

/// Wireless link quality.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WifiStatus {
    /// Signal strength in dBm
    pub rssi: Option<i32>,
}

/// Health report served by the device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemInfo {
    /// Flash usage, if reported
    pub flash: Option<FlashUsage>,
    /// Wireless status, if reported
    pub wifi: Option<WifiStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_config_fields_take_defaults() {
        let config: DeviceConfig =
            serde_json::from_str(r#"{"mqtt_server": "broker.lan", "scale_weight_min": 2500}"#)
                .unwrap();

        assert_eq!(config.mqtt_server, "broker.lan");
        assert_eq!(config.scale_weight_min, 2500);
        assert_eq!(config.mqtt_port, 1883);
        assert_eq!(config.scale_tare_thresh, 50);
    }

    #[test]
    fn config_serializes_snake_case() {
        let json = serde_json::to_value(DeviceConfig::default()).unwrap();
        assert_eq!(json["mqtt_topic_cat_weight"], "home/cat/scale/measured");
        assert_eq!(json["scale_calib_weight"], 500);
    }

    #[test]
    fn parses_partial_system_info() {
        let info: SystemInfo =
            serde_json::from_str(r#"{"flash": {"total": 1000, "used": 250}}"#).unwrap();

        let flash = info.flash.unwrap();
        assert_eq!(flash.used_fraction(), Some(0.25));
        assert_eq!(flash.measurements, None);
        assert!(info.wifi.is_none());
    }

    #[test]
    fn used_fraction_needs_nonzero_total() {
        let flash = FlashUsage {
            total: Some(0),
            used: Some(0),
            ..Default::default()
        };
        assert_eq!(flash.used_fraction(), None);
    }
}
