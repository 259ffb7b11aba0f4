//! Capability set consumed from the radio co-processor's protocol stack
//!
//! The vendor stack (GAP/GATT/HCI primitives and the host-radio link) is external.
//! Everything this crate needs from it is expressed by [`RadioStack`]: each command
//! returns a vendor [`Status`], and [`RadioStack::pump_events`] hands pending raw
//! event buffers to a receive callback.

use core::fmt;
use core::ops::BitOr;

use serde::{Deserialize, Serialize};
use tracing::error;

use crate::board::ExpansionBoard;
use crate::errors::{BleError, Result};
use crate::uuids::BleUuid;

// ----------------------------------------------------------------------------
// Status Codes
// ----------------------------------------------------------------------------

/// Vendor status code returned by every stack command
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Status(pub u8);

impl Status {
    pub const SUCCESS: Status = Status(0x00);
    pub const FAILED: Status = Status(0x41);
    pub const INVALID_PARAMS: Status = Status(0x42);
    pub const NOT_ALLOWED: Status = Status(0x46);
    pub const TIMEOUT: Status = Status(0xFF);

    /// Whether the command succeeded
    pub fn is_success(self) -> bool {
        self == Status::SUCCESS
    }

    /// Convert into a `Result`, logging failures against the issuing command
    pub fn check(self, command: Command) -> Result<()> {
        if self.is_success() {
            Ok(())
        } else {
            Err(self.fail(command))
        }
    }

    /// Error for `command` having returned this status, logging it
    pub fn fail(self, command: Command) -> BleError {
        error!("{} failed: {}", command, self);
        BleError::Command {
            command,
            status: self,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02X}", self.0)
    }
}

impl fmt::Debug for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Status(0x{:02X})", self.0)
    }
}

/// Stack commands, used to attribute failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    HciInit,
    Reset,
    SetPublicAddress,
    GattInit,
    GapInit,
    SetAuthRequirement,
    SetTxPower,
    AddService,
    AddCharacteristic,
    SetScanResponseData,
    SetDiscoverable,
    SetNonDiscoverable,
    UpdateCharValue,
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Command::HciInit => "HCI init",
            Command::Reset => "HCI reset",
            Command::SetPublicAddress => "Set public address",
            Command::GattInit => "GATT init",
            Command::GapInit => "GAP init",
            Command::SetAuthRequirement => "GAP set auth",
            Command::SetTxPower => "Set TX power",
            Command::AddService => "Adding GATT service",
            Command::AddCharacteristic => "Adding GATT characteristic",
            Command::SetScanResponseData => "Set scan response data",
            Command::SetDiscoverable => "Set discoverable",
            Command::SetNonDiscoverable => "Set non-discoverable",
            Command::UpdateCharValue => "Update characteristic value",
        };
        f.write_str(name)
    }
}

// ----------------------------------------------------------------------------
// GAP Parameters
// ----------------------------------------------------------------------------

/// BLE role selected at bring-up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Server,
    Client,
}

/// GAP initialization call, shaped per board revision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GapInit {
    Idb04a1 {
        role: u8,
    },
    Idb05a1 {
        role: u8,
        privacy_enabled: bool,
        device_name_len: u8,
    },
}

impl GapInit {
    /// Raw GAP role byte passed to the stack
    pub fn role(&self) -> u8 {
        match self {
            GapInit::Idb04a1 { role } | GapInit::Idb05a1 { role, .. } => *role,
        }
    }
}

/// Handles of the GAP service created by `gap_init`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GapHandles {
    pub service: u16,
    pub device_name: u16,
    pub appearance: u16,
}

/// Pairing requirements handed to the stack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthRequirements {
    /// Man-in-the-middle protection
    pub mitm_required: bool,
    /// Out-of-band authentication data, if any
    pub oob_data: Option<[u8; 16]>,
    pub min_key_size: u8,
    pub max_key_size: u8,
    /// Fixed pairing pin; `None` lets the stack request one
    pub fixed_pin: Option<u32>,
    pub bonding: bool,
}

impl Default for AuthRequirements {
    fn default() -> Self {
        Self {
            mitm_required: true,
            oob_data: None,
            min_key_size: 7,
            max_key_size: 16,
            fixed_pin: Some(123456),
            bonding: true,
        }
    }
}

// ----------------------------------------------------------------------------
// GATT Parameters
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ServiceType {
    Primary = 0x01,
    Secondary = 0x02,
}

/// Characteristic property bits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CharProperties(pub u8);

impl CharProperties {
    pub const BROADCAST: CharProperties = CharProperties(0x01);
    pub const READ: CharProperties = CharProperties(0x02);
    pub const WRITE_WITHOUT_RESPONSE: CharProperties = CharProperties(0x04);
    pub const WRITE: CharProperties = CharProperties(0x08);
    pub const NOTIFY: CharProperties = CharProperties(0x10);
    pub const INDICATE: CharProperties = CharProperties(0x20);

    pub fn contains(self, other: CharProperties) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for CharProperties {
    type Output = CharProperties;

    fn bitor(self, rhs: Self) -> Self {
        CharProperties(self.0 | rhs.0)
    }
}

/// Attribute security permissions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AttrPermissions(pub u8);

impl AttrPermissions {
    pub const NONE: AttrPermissions = AttrPermissions(0x00);
    pub const AUTHEN_READ: AttrPermissions = AttrPermissions(0x01);
    pub const AUTHOR_READ: AttrPermissions = AttrPermissions(0x02);
    pub const ENCRY_READ: AttrPermissions = AttrPermissions(0x04);
    pub const AUTHEN_WRITE: AttrPermissions = AttrPermissions(0x08);
    pub const AUTHOR_WRITE: AttrPermissions = AttrPermissions(0x10);
    pub const ENCRY_WRITE: AttrPermissions = AttrPermissions(0x20);
}

/// Which GATT events the stack reports back to the host for an attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GattEventMask(pub u8);

impl GattEventMask {
    pub const NONE: GattEventMask = GattEventMask(0x00);
    pub const ATTRIBUTE_WRITE: GattEventMask = GattEventMask(0x01);
    pub const WRITE_REQ_AND_WAIT: GattEventMask = GattEventMask(0x02);
    pub const READ_REQ_AND_WAIT: GattEventMask = GattEventMask(0x04);
}

/// Arguments of an add-characteristic command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharacteristicParams {
    pub service: u16,
    pub uuid: BleUuid,
    pub max_len: u8,
    pub properties: CharProperties,
    pub permissions: AttrPermissions,
    pub events: GattEventMask,
    pub encryption_key_size: u8,
    pub variable_length: bool,
}

// ----------------------------------------------------------------------------
// Advertising Parameters
// ----------------------------------------------------------------------------

/// Advertising PDU type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum AdvertisingType {
    /// Connectable undirected (`ADV_IND`)
    ConnectableUndirected = 0x00,
    ConnectableDirected = 0x01,
    ScannableUndirected = 0x02,
    NonConnectableUndirected = 0x03,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum AddressType {
    Public = 0x00,
    Random = 0x01,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum FilterPolicy {
    /// Accept scan and connection requests from anyone
    NoWhiteList = 0x00,
    WhiteListScan = 0x01,
    WhiteListConnect = 0x02,
    WhiteListBoth = 0x03,
}

/// Arguments of a set-discoverable command
///
/// `local_name` is the complete-local-name element (tag byte included) and
/// `service_uuids` the concatenated UUID list elements, as the stack expects them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscoverableParams<'a> {
    pub advertising_type: AdvertisingType,
    pub interval_min: u16,
    pub interval_max: u16,
    pub own_address_type: AddressType,
    pub filter_policy: FilterPolicy,
    pub local_name: &'a [u8],
    pub service_uuids: &'a [u8],
    pub conn_interval_min: u16,
    pub conn_interval_max: u16,
}

// ----------------------------------------------------------------------------
// Radio Stack Trait
// ----------------------------------------------------------------------------

/// Commands and event delivery provided by the vendor BLE stack
///
/// All methods take `&self`: the stack is shared between the application thread
/// (commands) and the event thread (`pump_events`), and implementations serialize
/// access to the host-radio link themselves.
pub trait RadioStack: Send + Sync {
    /// Bring up the host controller interface
    fn hci_init(&self) -> Status;

    /// Reset the radio so configuration data can be rewritten
    fn reset(&self) -> Status;

    /// Hardware and firmware version of the radio
    fn version(&self) -> (u8, u16);

    fn set_public_address(&self, address: &[u8; 6]) -> Status;

    fn gatt_init(&self) -> Status;

    fn gap_init(&self, init: &GapInit) -> core::result::Result<GapHandles, Status>;

    fn set_auth_requirement(&self, auth: &AuthRequirements) -> Status;

    fn set_tx_power(&self, high_power: bool, level: u8) -> Status;

    /// Register a GATT service, returning its handle
    fn add_service(
        &self,
        uuid: &BleUuid,
        service_type: ServiceType,
        max_attribute_records: u8,
    ) -> core::result::Result<u16, Status>;

    /// Register a characteristic, returning its declaration handle
    fn add_characteristic(
        &self,
        params: &CharacteristicParams,
    ) -> core::result::Result<u16, Status>;

    fn set_scan_response_data(&self, data: &[u8]) -> Status;

    fn set_discoverable(&self, params: &DiscoverableParams<'_>) -> Status;

    fn set_non_discoverable(&self) -> Status;

    fn update_char_value(
        &self,
        service: u16,
        characteristic: u16,
        offset: u8,
        value: &[u8],
    ) -> Status;

    /// Deliver every pending raw event to `on_event`, once per event
    ///
    /// Must return once the pending events are drained.
    fn pump_events(&self, on_event: &mut dyn FnMut(&[u8]));
}

/// Board-specific GAP init call for a role
pub fn gap_init_for(
    role: Role,
    board: ExpansionBoard,
    privacy_enabled: bool,
    device_name_len: u8,
) -> GapInit {
    let gap_role = board.gap_role(role);
    match board {
        ExpansionBoard::Idb05a1 => GapInit::Idb05a1 {
            role: gap_role,
            privacy_enabled,
            device_name_len,
        },
        ExpansionBoard::Idb04a1 | ExpansionBoard::Unknown => GapInit::Idb04a1 { role: gap_role },
    }
}
