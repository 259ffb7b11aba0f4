//! Tagged 16-bit / 128-bit BLE UUIDs

use core::fmt;

use smallvec::SmallVec;
use uuid::Uuid;

/// UUID kind byte used by the stack's GATT commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum UuidKind {
    Uuid16 = 0x01,
    Uuid128 = 0x02,
}

/// A BLE attribute or service UUID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BleUuid {
    Uuid16(u16),
    Uuid128(Uuid),
}

impl BleUuid {
    pub fn kind(&self) -> UuidKind {
        match self {
            BleUuid::Uuid16(_) => UuidKind::Uuid16,
            BleUuid::Uuid128(_) => UuidKind::Uuid128,
        }
    }

    /// Build a 128-bit UUID from over-the-air (little-endian) bytes
    pub fn from_le_bytes(bytes: [u8; 16]) -> Self {
        let mut be = bytes;
        be.reverse();
        BleUuid::Uuid128(Uuid::from_bytes(be))
    }

    /// Over-the-air byte order: little-endian, 2 or 16 bytes
    pub fn to_le_bytes(&self) -> SmallVec<[u8; 16]> {
        match self {
            BleUuid::Uuid16(value) => SmallVec::from_slice(&value.to_le_bytes()),
            BleUuid::Uuid128(uuid) => {
                let mut bytes = *uuid.as_bytes();
                bytes.reverse();
                SmallVec::from_slice(&bytes)
            }
        }
    }
}

impl From<u16> for BleUuid {
    fn from(value: u16) -> Self {
        BleUuid::Uuid16(value)
    }
}

impl From<Uuid> for BleUuid {
    fn from(value: Uuid) -> Self {
        BleUuid::Uuid128(value)
    }
}

impl fmt::Display for BleUuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BleUuid::Uuid16(value) => write!(f, "0x{:04X}", value),
            BleUuid::Uuid128(uuid) => write!(f, "{}", uuid.hyphenated()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uuid128_le_bytes_reverse_canonical_order() {
        let uuid = BleUuid::Uuid128(Uuid::from_u128(0x6E400001_B5A3_F393_E0A9_E50E24DCCA9E));
        let bytes = uuid.to_le_bytes();
        assert_eq!(
            bytes.as_slice(),
            &[
                0x9E, 0xCA, 0xDC, 0x24, 0x0E, 0xE5, 0xA9, 0xE0, 0x93, 0xF3, 0xA3, 0xB5, 0x01, 0x00,
                0x40, 0x6E
            ]
        );

        let mut le = [0u8; 16];
        le.copy_from_slice(&bytes);
        assert_eq!(BleUuid::from_le_bytes(le), uuid);
    }

    #[test]
    fn test_uuid16() {
        let uuid = BleUuid::from(0x180Du16);
        assert_eq!(uuid.kind(), UuidKind::Uuid16);
        assert_eq!(uuid.to_le_bytes().as_slice(), &[0x0D, 0x18]);
        assert_eq!(uuid.to_string(), "0x180D");
    }
}
