//! Radio expansion board revisions
//!
//! The two supported BlueNRG revisions differ in GAP init call shape, GAP role
//! constants and the layout of the attribute-modified vendor event.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::stack::Role;

/// Hardware versions above this belong to the IDB05A1 board
const IDB05A1_MIN_HW_VERSION: u8 = 0x31;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ExpansionBoard {
    /// Not yet discovered (before `Ble::init`)
    #[default]
    Unknown,
    /// X-NUCLEO-IDB04A1 (BlueNRG)
    Idb04a1,
    /// X-NUCLEO-IDB05A1 (BlueNRG-MS)
    Idb05a1,
}

impl ExpansionBoard {
    /// Identify the board from the radio's reported hardware version
    pub fn from_hw_version(hw_version: u8) -> Self {
        if hw_version >= IDB05A1_MIN_HW_VERSION {
            ExpansionBoard::Idb05a1
        } else {
            ExpansionBoard::Idb04a1
        }
    }

    pub fn is_known(self) -> bool {
        self != ExpansionBoard::Unknown
    }

    /// GAP role byte for this board revision
    pub fn gap_role(self, role: Role) -> u8 {
        match (self, role) {
            (_, Role::Server) => 0x01,
            (ExpansionBoard::Idb05a1, Role::Client) => 0x04,
            (ExpansionBoard::Idb04a1 | ExpansionBoard::Unknown, Role::Client) => 0x03,
        }
    }
}

impl fmt::Display for ExpansionBoard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpansionBoard::Unknown => write!(f, "unknown"),
            ExpansionBoard::Idb04a1 => write!(f, "X-NUCLEO-IDB04A1"),
            ExpansionBoard::Idb05a1 => write!(f, "X-NUCLEO-IDB05A1"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_board_from_hw_version() {
        assert_eq!(ExpansionBoard::from_hw_version(0x30), ExpansionBoard::Idb04a1);
        assert_eq!(ExpansionBoard::from_hw_version(0x31), ExpansionBoard::Idb05a1);
        assert_eq!(ExpansionBoard::from_hw_version(0x00), ExpansionBoard::Idb04a1);
        assert!(!ExpansionBoard::default().is_known());
    }

    #[test]
    fn test_gap_roles() {
        assert_eq!(ExpansionBoard::Idb04a1.gap_role(Role::Server), 0x01);
        assert_eq!(ExpansionBoard::Idb04a1.gap_role(Role::Client), 0x03);
        assert_eq!(ExpansionBoard::Idb05a1.gap_role(Role::Client), 0x04);
    }
}
