//! bleuart CLI configuration
//!
//! Loaded from a TOML file; every section and field is optional and falls
//! back to its default.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use bleuart_core::{BleConfig, Role};
use bleuart_uart::UartConfig;

// ----------------------------------------------------------------------------
// CLI Application Configuration
// ----------------------------------------------------------------------------

/// Complete configuration for the CLI application
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// BLE host configuration
    pub ble: BleConfig,

    /// UART service configuration
    pub uart: UartConfig,

    /// Simulated radio and session settings
    pub session: SessionConfig,
}

/// Settings for the simulated radio session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Name advertised by the UART service
    pub device_name: String,

    /// Hardware version the simulated radio reports
    pub hw_version: u8,

    /// Firmware version the simulated radio reports
    pub fw_version: u16,

    /// Role used by the UART service
    pub role: Role,

    /// Echo received bytes back to the peer
    pub echo: bool,

    /// Reader polling interval (in milliseconds)
    pub read_interval_ms: u64,

    /// Simulated peer address, least significant byte first
    pub peer_address: [u8; 6],
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            device_name: "UART Test".to_string(),
            hw_version: bleuart_core::sim::DEFAULT_HW_VERSION,
            fw_version: bleuart_core::sim::DEFAULT_FW_VERSION,
            role: Role::Server,
            echo: true,
            read_interval_ms: 10,
            peer_address: [0x5A, 0x4B, 0x3C, 0x2D, 0x1E, 0xC0],
        }
    }
}

impl SessionConfig {
    pub fn read_interval(&self) -> Duration {
        Duration::from_millis(self.read_interval_ms)
    }
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            ConfigError::Loading(format!("Failed to read {}: {}", path.as_ref().display(), e))
        })?;
        let config = Self::from_toml(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|e| ConfigError::Loading(e.to_string()))
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Serialization(e.to_string()))
    }

    /// Validate the configuration for consistency and correctness
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.ble
            .validate()
            .map_err(|e| ConfigError::Validation(e.to_string()))?;

        self.uart.validate().map_err(ConfigError::Validation)?;

        if self.session.device_name.is_empty() {
            return Err(ConfigError::Validation(
                "Device name must not be empty".to_string(),
            ));
        }

        if self.session.read_interval_ms == 0 {
            return Err(ConfigError::Validation(
                "Read interval must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Configuration-related errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration loading error: {0}")]
    Loading(String),

    #[error("Configuration validation error: {0}")]
    Validation(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_creation() {
        let config = AppConfig::default();
        assert_eq!(config.session.device_name, "UART Test");
        assert_eq!(config.uart.rx_queue_capacity, 256);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml() {
        let config = AppConfig::from_toml(
            r#"
            [session]
            device_name = "Bench"
            hw_version = 48

            [uart]
            rx_queue_capacity = 64

            [ble.advertising]
            interval_min = 256
            interval_max = 512
            "#,
        )
        .unwrap();

        assert_eq!(config.session.device_name, "Bench");
        assert_eq!(config.session.hw_version, 0x30);
        assert!(config.session.echo);
        assert_eq!(config.uart.rx_queue_capacity, 64);
        assert_eq!(config.uart.max_attribute_len, 20);
        assert_eq!(config.ble.advertising.interval_min, 0x0100);
        assert_eq!(config.ble.registry.capacity, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = AppConfig::default();
        config.session.device_name.clear();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.uart.rx_queue_capacity = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.ble.registry.capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_round_trip_of_defaults() {
        let text = AppConfig::default().to_toml().unwrap();
        assert!(text.contains("[session]"));
        assert!(text.contains("[uart]"));
        let parsed = AppConfig::from_toml(&text).unwrap();
        assert_eq!(parsed.session.device_name, "UART Test");
    }
}
