//! BLE host configuration

use std::time::Duration;

use crate::errors::{BleError, Result};
use crate::registry::DEFAULT_REGISTRY_CAPACITY;
use crate::stack::{AddressType, AdvertisingType, AuthRequirements, FilterPolicy, Role};

/// Advertising interval bounds accepted by the controller (0.625 ms units)
const MIN_ADV_INTERVAL: u16 = 0x0020;
const MAX_ADV_INTERVAL: u16 = 0x4000;

/// Encryption key size bounds accepted for pairing
const MIN_KEY_SIZE: u8 = 7;
const MAX_KEY_SIZE: u8 = 16;

const MAX_TX_POWER_LEVEL: u8 = 7;

// ----------------------------------------------------------------------------
// GAP Configuration
// ----------------------------------------------------------------------------

/// Radio bring-up settings
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct GapConfig {
    /// Public address override; the role's default address is used when unset
    pub public_address: Option<[u8; 6]>,
    /// Delay after the reset that precedes address configuration
    pub reset_delay: Duration,
    /// High power amplifier mode
    pub tx_power_high: bool,
    /// Power amplifier level (0-7)
    pub tx_power_level: u8,
    /// Privacy flag passed to GAP init on IDB05A1
    pub privacy_enabled: bool,
    /// Device name attribute length passed to GAP init on IDB05A1
    pub device_name_len: u8,
}

impl Default for GapConfig {
    fn default() -> Self {
        Self {
            public_address: None,
            reset_delay: Duration::from_millis(100),
            tx_power_high: true,
            tx_power_level: 4,
            privacy_enabled: false,
            device_name_len: 0x07,
        }
    }
}

impl GapConfig {
    /// Public address used for a role
    pub fn address_for(&self, role: Role) -> [u8; 6] {
        self.public_address.unwrap_or_else(|| default_public_address(role))
    }
}

/// Default public address for a role
pub fn default_public_address(role: Role) -> [u8; 6] {
    let first = match role {
        Role::Server => 0xaa,
        Role::Client => 0xbb,
    };
    [first, 0x00, 0x00, 0xE1, 0x80, 0x02]
}

// ----------------------------------------------------------------------------
// Advertising Configuration
// ----------------------------------------------------------------------------

/// Fixed parameters of the set-discoverable command
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AdvertisingConfig {
    pub advertising_type: AdvertisingType,
    pub interval_min: u16,
    pub interval_max: u16,
    pub own_address_type: AddressType,
    pub filter_policy: FilterPolicy,
    /// Slave connection interval bounds; zero leaves them unspecified
    pub conn_interval_min: u16,
    pub conn_interval_max: u16,
}

impl Default for AdvertisingConfig {
    fn default() -> Self {
        Self {
            advertising_type: AdvertisingType::ConnectableUndirected,
            interval_min: 0x0800,
            interval_max: 0x0900,
            own_address_type: AddressType::Public,
            filter_policy: FilterPolicy::NoWhiteList,
            conn_interval_min: 0,
            conn_interval_max: 0,
        }
    }
}

impl AdvertisingConfig {
    /// Set the advertising interval range
    pub fn with_interval(mut self, min: u16, max: u16) -> Self {
        self.interval_min = min;
        self.interval_max = max;
        self
    }
}

// ----------------------------------------------------------------------------
// Registry And Event Loop
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Maximum number of event handlers
    pub capacity: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_REGISTRY_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct EventLoopConfig {
    /// Sleep between event pumps on the event thread
    pub poll_interval: Duration,
}

impl Default for EventLoopConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(1),
        }
    }
}

// ----------------------------------------------------------------------------
// Configuration
// ----------------------------------------------------------------------------

/// Configuration for the BLE host context
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct BleConfig {
    pub gap: GapConfig,
    pub security: AuthRequirements,
    pub advertising: AdvertisingConfig,
    pub registry: RegistryConfig,
    pub event_loop: EventLoopConfig,
}

impl BleConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration for tests and simulation: no reset delay, fast polling
    pub fn testing() -> Self {
        let mut config = Self::default();
        config.gap.reset_delay = Duration::ZERO;
        config.event_loop.poll_interval = Duration::from_micros(100);
        config
    }

    pub fn with_gap(mut self, gap: GapConfig) -> Self {
        self.gap = gap;
        self
    }

    pub fn with_security(mut self, security: AuthRequirements) -> Self {
        self.security = security;
        self
    }

    pub fn with_advertising(mut self, advertising: AdvertisingConfig) -> Self {
        self.advertising = advertising;
        self
    }

    pub fn with_registry_capacity(mut self, capacity: usize) -> Self {
        self.registry.capacity = capacity;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.event_loop.poll_interval = interval;
        self
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let adv = &self.advertising;
        if adv.interval_min > adv.interval_max {
            return Err(BleError::invalid_config(
                "advertising interval_min exceeds interval_max",
            ));
        }
        if adv.interval_min < MIN_ADV_INTERVAL || adv.interval_max > MAX_ADV_INTERVAL {
            return Err(BleError::invalid_config(format!(
                "advertising interval must be within 0x{:04X}..=0x{:04X}",
                MIN_ADV_INTERVAL, MAX_ADV_INTERVAL
            )));
        }

        let security = &self.security;
        if security.min_key_size > security.max_key_size
            || security.min_key_size < MIN_KEY_SIZE
            || security.max_key_size > MAX_KEY_SIZE
        {
            return Err(BleError::invalid_config(format!(
                "key sizes must satisfy {} <= min <= max <= {}",
                MIN_KEY_SIZE, MAX_KEY_SIZE
            )));
        }

        if self.gap.tx_power_level > MAX_TX_POWER_LEVEL {
            return Err(BleError::invalid_config(format!(
                "tx_power_level {} exceeds {}",
                self.gap.tx_power_level, MAX_TX_POWER_LEVEL
            )));
        }

        if self.registry.capacity == 0 {
            return Err(BleError::invalid_config("registry capacity must be non-zero"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(BleConfig::default().validate().is_ok());
        assert!(BleConfig::testing().validate().is_ok());
    }

    #[test]
    fn test_default_addresses() {
        let gap = GapConfig::default();
        assert_eq!(gap.address_for(Role::Server), [0xaa, 0x00, 0x00, 0xE1, 0x80, 0x02]);
        assert_eq!(gap.address_for(Role::Client)[0], 0xbb);

        let gap = GapConfig {
            public_address: Some([1, 2, 3, 4, 5, 6]),
            ..GapConfig::default()
        };
        assert_eq!(gap.address_for(Role::Server), [1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_invalid_configs() {
        let config = BleConfig::new()
            .with_advertising(AdvertisingConfig::default().with_interval(0x0900, 0x0800));
        assert!(config.validate().is_err());

        let config = BleConfig::new()
            .with_advertising(AdvertisingConfig::default().with_interval(0x0010, 0x0800));
        assert!(config.validate().is_err());

        let config = BleConfig::new().with_registry_capacity(0);
        assert!(config.validate().is_err());

        let security = AuthRequirements {
            min_key_size: 17,
            ..AuthRequirements::default()
        };
        assert!(BleConfig::new().with_security(security).validate().is_err());
    }
}
