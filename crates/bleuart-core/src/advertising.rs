//! Advertising payload builder
//!
//! The payload is kept as three pre-encoded advertising elements:
//!
//! ```text
//! name:     [0x09][text ...]             complete local name
//! uuid16s:  [0x02][lo hi][lo hi] ...     incomplete list of 16-bit UUIDs
//! uuid128s: [0x06][16 bytes LE] ...      incomplete list of 128-bit UUIDs
//! ```
//!
//! Each element, and their concatenation, must fit the 31-byte legacy
//! advertising budget. Builder methods check their budget before mutating.

use smallvec::SmallVec;
use tracing::{debug, error, info, warn};

use crate::config::AdvertisingConfig;
use crate::errors::{AdElement, BleError, Result};
use crate::stack::{Command, DiscoverableParams, RadioStack};
use crate::state::{BleState, StateMachine};
use crate::uuids::BleUuid;

/// Legacy advertising data budget
pub const MAX_ADV_DATA_LEN: usize = 31;

/// Longest local name, leaving room for the element tag
pub const MAX_NAME_LEN: usize = MAX_ADV_DATA_LEN - 1;

pub const AD_TYPE_COMPLETE_LOCAL_NAME: u8 = 0x09;
pub const AD_TYPE_16_BIT_SERV_UUID: u8 = 0x02;
pub const AD_TYPE_128_BIT_SERV_UUID: u8 = 0x06;

type Element = SmallVec<[u8; MAX_ADV_DATA_LEN]>;

/// Accumulated advertising elements
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdvertisingPayload {
    name: Element,
    uuid16s: Element,
    uuid128s: Element,
}

impl AdvertisingPayload {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the complete local name, replacing any previous name
    pub fn add_name(&mut self, name: &str) -> Result<()> {
        let text = name.as_bytes();
        if text.len() > MAX_NAME_LEN {
            return Err(BleError::NameTooLong {
                len: text.len(),
                max: MAX_NAME_LEN,
            });
        }

        self.name.clear();
        self.name.push(AD_TYPE_COMPLETE_LOCAL_NAME);
        self.name.extend_from_slice(text);
        Ok(())
    }

    /// Append a 16-bit service UUID
    pub fn add_uuid16(&mut self, uuid: u16) -> Result<()> {
        append_uuid(
            &mut self.uuid16s,
            AdElement::Uuid16List,
            AD_TYPE_16_BIT_SERV_UUID,
            &uuid.to_le_bytes(),
        )
    }

    /// Append a 128-bit service UUID given in over-the-air (little-endian) order
    pub fn add_uuid128(&mut self, uuid: &[u8; 16]) -> Result<()> {
        append_uuid(
            &mut self.uuid128s,
            AdElement::Uuid128List,
            AD_TYPE_128_BIT_SERV_UUID,
            uuid,
        )
    }

    pub fn add_uuid(&mut self, uuid: &BleUuid) -> Result<()> {
        match uuid {
            BleUuid::Uuid16(value) => self.add_uuid16(*value),
            BleUuid::Uuid128(_) => {
                let mut bytes = [0u8; 16];
                bytes.copy_from_slice(&uuid.to_le_bytes());
                self.add_uuid128(&bytes)
            }
        }
    }

    /// Drop all elements
    pub fn clear(&mut self) {
        self.name.clear();
        self.uuid16s.clear();
        self.uuid128s.clear();
    }

    pub fn name_element(&self) -> &[u8] {
        &self.name
    }

    pub fn uuid16_element(&self) -> &[u8] {
        &self.uuid16s
    }

    pub fn uuid128_element(&self) -> &[u8] {
        &self.uuid128s
    }

    /// UUID elements concatenated, 16-bit list first
    pub fn service_uuids(&self) -> Element {
        let mut uuids = Element::new();
        uuids.extend_from_slice(&self.uuid16s);
        uuids.extend_from_slice(&self.uuid128s);
        uuids
    }

    /// Combined length of all elements
    pub fn len(&self) -> usize {
        self.name.len() + self.uuid16s.len() + self.uuid128s.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check the combined budget
    pub fn validate(&self) -> Result<()> {
        let len = self.len();
        if len > MAX_ADV_DATA_LEN {
            return Err(BleError::PayloadTooLarge {
                len,
                max: MAX_ADV_DATA_LEN,
            });
        }
        Ok(())
    }
}

fn append_uuid(element: &mut Element, kind: AdElement, tag: u8, bytes: &[u8]) -> Result<()> {
    let needed = bytes.len() + usize::from(element.is_empty());
    if element.len() + needed > MAX_ADV_DATA_LEN {
        return Err(BleError::PayloadFull {
            element: kind,
            len: element.len(),
            needed,
            max: MAX_ADV_DATA_LEN,
        });
    }

    if element.is_empty() {
        element.push(tag);
    }
    element.extend_from_slice(bytes);
    Ok(())
}

// ----------------------------------------------------------------------------
// Advertising Control
// ----------------------------------------------------------------------------

/// Become discoverable with `payload`
///
/// Already advertising is a success without issuing any command.
pub(crate) fn start<S: RadioStack + ?Sized>(
    stack: &S,
    state: &StateMachine,
    payload: &AdvertisingPayload,
    config: &AdvertisingConfig,
) -> Result<()> {
    if state.current() == BleState::Advertising {
        debug!("Already advertising");
        return Ok(());
    }

    if let Err(e) = payload.validate() {
        error!("Advertising payload rejected: {}", e);
        return Err(e);
    }

    // The advertising packet carries the UUIDs; scan responses stay empty.
    // Only set-discoverable decides whether advertising starts.
    if stack
        .set_scan_response_data(&[])
        .check(Command::SetScanResponseData)
        .is_err()
    {
        warn!("Continuing with previous scan response data");
    }

    let service_uuids = payload.service_uuids();
    let params = DiscoverableParams {
        advertising_type: config.advertising_type,
        interval_min: config.interval_min,
        interval_max: config.interval_max,
        own_address_type: config.own_address_type,
        filter_policy: config.filter_policy,
        local_name: payload.name_element(),
        service_uuids: &service_uuids,
        conn_interval_min: config.conn_interval_min,
        conn_interval_max: config.conn_interval_max,
    };
    stack
        .set_discoverable(&params)
        .check(Command::SetDiscoverable)?;

    state.begin_advertising();
    info!("Advertising started ({} bytes)", payload.len());
    Ok(())
}

/// Stop advertising; a no-op unless currently advertising
///
/// The state returns to idle even when the radio refuses, and the failure is
/// still reported.
pub(crate) fn stop<S: RadioStack + ?Sized>(stack: &S, state: &StateMachine) -> Result<()> {
    if state.current() != BleState::Advertising {
        return Ok(());
    }

    let result = stack
        .set_non_discoverable()
        .check(Command::SetNonDiscoverable);
    state.end_advertising();
    info!("Advertising stopped");
    result
}
