//! UART service UUIDs and attribute layout

use bleuart_core::BleUuid;
use uuid::Uuid;

// ----------------------------------------------------------------------------
// Service and Characteristic UUIDs
// ----------------------------------------------------------------------------

/// UART service UUID
pub const UART_SERVICE_UUID: Uuid = Uuid::from_u128(0x6E400001_B5A3_F393_E0A9_E50E24DCCA9E);

/// Characteristic the peer writes into (received by this device)
pub const UART_RX_CHARACTERISTIC_UUID: Uuid =
    Uuid::from_u128(0x6E400002_B5A3_F393_E0A9_E50E24DCCA9E);

/// Characteristic this device notifies on (transmitted to the peer)
pub const UART_TX_CHARACTERISTIC_UUID: Uuid =
    Uuid::from_u128(0x6E400003_B5A3_F393_E0A9_E50E24DCCA9E);

pub fn service_uuid() -> BleUuid {
    BleUuid::Uuid128(UART_SERVICE_UUID)
}

pub fn rx_uuid() -> BleUuid {
    BleUuid::Uuid128(UART_RX_CHARACTERISTIC_UUID)
}

pub fn tx_uuid() -> BleUuid {
    BleUuid::Uuid128(UART_TX_CHARACTERISTIC_UUID)
}

// ----------------------------------------------------------------------------
// Attribute Handles
// ----------------------------------------------------------------------------

/// Handles assigned by the stack when the service is registered
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ServiceHandles {
    pub service: u16,
    /// RX characteristic declaration
    pub rx: u16,
    /// TX characteristic declaration
    pub tx: u16,
}

impl ServiceHandles {
    /// Handle of the RX value attribute, the one peer writes land on
    pub fn rx_value(&self) -> u16 {
        self.rx.wrapping_add(1)
    }

    /// Handle of the TX value attribute
    pub fn tx_value(&self) -> u16 {
        self.tx.wrapping_add(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uuids_share_base() {
        assert_eq!(UART_SERVICE_UUID.to_string(), "6e400001-b5a3-f393-e0a9-e50e24dcca9e");
        assert_eq!(
            UART_RX_CHARACTERISTIC_UUID.as_u128() - UART_SERVICE_UUID.as_u128(),
            1u128 << 96
        );
        assert_eq!(service_uuid().to_le_bytes()[15], 0x6E);
    }

    #[test]
    fn test_value_handles() {
        let handles = ServiceHandles {
            service: 0x0C,
            rx: 0x0D,
            tx: 0x0F,
        };
        assert_eq!(handles.rx_value(), 0x0E);
        assert_eq!(handles.tx_value(), 0x10);
    }
}
