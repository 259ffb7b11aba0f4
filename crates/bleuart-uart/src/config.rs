//! UART service configuration

use bleuart_core::{max_attribute_data_len, ExpansionBoard};

// ----------------------------------------------------------------------------
// Configuration
// ----------------------------------------------------------------------------

/// Configuration for the UART service
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct UartConfig {
    /// Bytes buffered between the radio and the reader
    pub rx_queue_capacity: usize,
    /// Value length of each characteristic, and largest single write
    pub max_attribute_len: u8,
    /// Attribute records reserved for the service
    pub max_attribute_records: u8,
    /// Encryption key size required on the characteristics
    pub encryption_key_size: u8,
}

impl Default for UartConfig {
    fn default() -> Self {
        Self {
            rx_queue_capacity: 256,
            max_attribute_len: 20,
            max_attribute_records: 7,
            encryption_key_size: 16,
        }
    }
}

impl UartConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set RX queue capacity
    pub fn with_rx_queue_capacity(mut self, capacity: usize) -> Self {
        self.rx_queue_capacity = capacity;
        self
    }

    /// Set characteristic value length
    pub fn with_max_attribute_len(mut self, len: u8) -> Self {
        self.max_attribute_len = len;
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.rx_queue_capacity == 0 {
            return Err("rx_queue_capacity must be non-zero".to_string());
        }
        if self.max_attribute_len == 0 {
            return Err("max_attribute_len must be non-zero".to_string());
        }
        // A peer write has to fit in one attribute-modified event on either board
        let max_len = max_attribute_data_len(ExpansionBoard::Idb05a1);
        if usize::from(self.max_attribute_len) > max_len {
            return Err(format!(
                "max_attribute_len {} exceeds {} bytes per event",
                self.max_attribute_len, max_len
            ));
        }
        // Service declaration, RX (2 records) and TX with its descriptor (3)
        if self.max_attribute_records < 6 {
            return Err(format!(
                "max_attribute_records {} cannot hold the service",
                self.max_attribute_records
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = UartConfig::new();
        assert_eq!(config.rx_queue_capacity, 256);
        assert_eq!(config.max_attribute_len, 20);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_undersized_service() {
        let mut config = UartConfig::default();
        config.max_attribute_records = 5;
        assert!(config.validate().is_err());

        assert!(UartConfig::new().with_rx_queue_capacity(0).validate().is_err());
        assert!(UartConfig::new().with_max_attribute_len(0).validate().is_err());
    }

    #[test]
    fn test_attribute_len_capped_at_event_capacity() {
        assert!(UartConfig::new().with_max_attribute_len(246).validate().is_ok());
        assert!(UartConfig::new().with_max_attribute_len(247).validate().is_err());
        assert!(UartConfig::new().with_max_attribute_len(250).validate().is_err());
    }
}
