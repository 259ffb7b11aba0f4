//! In-process radio stack
//!
//! [`SimRadio`] stands in for the co-processor: it records every command it
//! receives, answers with configurable status codes, allocates GATT handles
//! and replays injected raw event buffers through `pump_events`.

use std::collections::{HashMap, VecDeque};

use parking_lot::Mutex;
use tracing::trace;

use crate::board::ExpansionBoard;
use crate::errors::BleError;
use crate::event::{
    encode_attribute_modified, encode_connection_complete, encode_disconnect_complete,
    max_attribute_data_len, ConnectionComplete, DisconnectComplete,
};
use crate::stack::{
    AddressType, AdvertisingType, AuthRequirements, CharProperties, CharacteristicParams,
    Command, DiscoverableParams, FilterPolicy, GapHandles, GapInit, RadioStack, ServiceType,
    Status,
};
use crate::uuids::BleUuid;

/// Hardware version reported by default (IDB05A1)
pub const DEFAULT_HW_VERSION: u8 = 0x31;
pub const DEFAULT_FW_VERSION: u16 = 0x0721;

const FIRST_GATT_HANDLE: u16 = 0x000C;
const DEFAULT_CONN_HANDLE: u16 = 0x0801;

// ----------------------------------------------------------------------------
// Recorded Commands
// ----------------------------------------------------------------------------

/// Owned copy of the set-discoverable arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoverableRecord {
    pub advertising_type: AdvertisingType,
    pub interval_min: u16,
    pub interval_max: u16,
    pub own_address_type: AddressType,
    pub filter_policy: FilterPolicy,
    pub local_name: Vec<u8>,
    pub service_uuids: Vec<u8>,
    pub conn_interval_min: u16,
    pub conn_interval_max: u16,
}

impl From<&DiscoverableParams<'_>> for DiscoverableRecord {
    fn from(params: &DiscoverableParams<'_>) -> Self {
        Self {
            advertising_type: params.advertising_type,
            interval_min: params.interval_min,
            interval_max: params.interval_max,
            own_address_type: params.own_address_type,
            filter_policy: params.filter_policy,
            local_name: params.local_name.to_vec(),
            service_uuids: params.service_uuids.to_vec(),
            conn_interval_min: params.conn_interval_min,
            conn_interval_max: params.conn_interval_max,
        }
    }
}

/// A command received by the simulated radio
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimCommand {
    HciInit,
    Reset,
    SetPublicAddress([u8; 6]),
    GattInit,
    GapInit(GapInit),
    SetAuthRequirement(AuthRequirements),
    SetTxPower {
        high_power: bool,
        level: u8,
    },
    AddService {
        uuid: BleUuid,
        service_type: ServiceType,
        max_attribute_records: u8,
    },
    AddCharacteristic(CharacteristicParams),
    SetScanResponseData(Vec<u8>),
    SetDiscoverable(DiscoverableRecord),
    SetNonDiscoverable,
    UpdateCharValue {
        service: u16,
        characteristic: u16,
        offset: u8,
        value: Vec<u8>,
    },
}

impl SimCommand {
    pub fn command(&self) -> Command {
        match self {
            SimCommand::HciInit => Command::HciInit,
            SimCommand::Reset => Command::Reset,
            SimCommand::SetPublicAddress(_) => Command::SetPublicAddress,
            SimCommand::GattInit => Command::GattInit,
            SimCommand::GapInit(_) => Command::GapInit,
            SimCommand::SetAuthRequirement(_) => Command::SetAuthRequirement,
            SimCommand::SetTxPower { .. } => Command::SetTxPower,
            SimCommand::AddService { .. } => Command::AddService,
            SimCommand::AddCharacteristic(_) => Command::AddCharacteristic,
            SimCommand::SetScanResponseData(_) => Command::SetScanResponseData,
            SimCommand::SetDiscoverable(_) => Command::SetDiscoverable,
            SimCommand::SetNonDiscoverable => Command::SetNonDiscoverable,
            SimCommand::UpdateCharValue { .. } => Command::UpdateCharValue,
        }
    }
}

// ----------------------------------------------------------------------------
// Simulated Radio
// ----------------------------------------------------------------------------

#[derive(Debug)]
struct SimState {
    hw_version: u8,
    fw_version: u16,
    commands: Vec<SimCommand>,
    failures: HashMap<Command, Status>,
    pending: VecDeque<Vec<u8>>,
    next_handle: u16,
}

/// Simulated BLE co-processor
#[derive(Debug)]
pub struct SimRadio {
    state: Mutex<SimState>,
}

impl SimRadio {
    /// Simulated IDB05A1 radio
    pub fn new() -> Self {
        Self::with_version(DEFAULT_HW_VERSION, DEFAULT_FW_VERSION)
    }

    /// Radio reporting the given hardware and firmware versions
    pub fn with_version(hw_version: u8, fw_version: u16) -> Self {
        Self {
            state: Mutex::new(SimState {
                hw_version,
                fw_version,
                commands: Vec::new(),
                failures: HashMap::new(),
                pending: VecDeque::new(),
                next_handle: FIRST_GATT_HANDLE,
            }),
        }
    }

    /// Board revision the reported hardware version identifies
    pub fn board(&self) -> ExpansionBoard {
        ExpansionBoard::from_hw_version(self.state.lock().hw_version)
    }

    /// Make every subsequent `command` return `status`
    pub fn set_failure(&self, command: Command, status: Status) {
        self.state.lock().failures.insert(command, status);
    }

    pub fn clear_failure(&self, command: Command) {
        self.state.lock().failures.remove(&command);
    }

    /// All commands received so far, in order
    pub fn commands(&self) -> Vec<SimCommand> {
        self.state.lock().commands.clone()
    }

    pub fn command_count(&self, command: Command) -> usize {
        self.state
            .lock()
            .commands
            .iter()
            .filter(|c| c.command() == command)
            .count()
    }

    pub fn clear_commands(&self) {
        self.state.lock().commands.clear();
    }

    /// Arguments of the most recent set-discoverable command
    pub fn last_discoverable(&self) -> Option<DiscoverableRecord> {
        self.state
            .lock()
            .commands
            .iter()
            .rev()
            .find_map(|c| match c {
                SimCommand::SetDiscoverable(record) => Some(record.clone()),
                _ => None,
            })
    }

    /// Values written with update-characteristic-value, in order
    pub fn char_updates(&self) -> Vec<(u16, Vec<u8>)> {
        self.state
            .lock()
            .commands
            .iter()
            .filter_map(|c| match c {
                SimCommand::UpdateCharValue {
                    characteristic,
                    value,
                    ..
                } => Some((*characteristic, value.clone())),
                _ => None,
            })
            .collect()
    }

    /// Queue a raw event buffer for the next `pump_events`
    pub fn inject(&self, event: impl Into<Vec<u8>>) {
        self.state.lock().pending.push_back(event.into());
    }

    /// Queue a connection from `peer_address`
    pub fn inject_connection(&self, peer_address: [u8; 6]) {
        let event = ConnectionComplete {
            status: 0,
            handle: DEFAULT_CONN_HANDLE,
            role: 0x01,
            peer_address_type: 0x00,
            peer_address,
            interval: 0x0028,
            latency: 0,
            supervision_timeout: 0x01F4,
            master_clock_accuracy: 0,
        };
        self.inject(encode_connection_complete(&event).to_vec());
    }

    /// Queue a disconnection of the default connection
    pub fn inject_disconnection(&self, reason: u8) {
        let event = DisconnectComplete {
            status: 0,
            handle: DEFAULT_CONN_HANDLE,
            reason,
        };
        self.inject(encode_disconnect_complete(&event).to_vec());
    }

    /// Queue a peer write to `attr_handle`, in this radio's board layout
    ///
    /// Fails without queueing anything if `data` does not fit in one event.
    pub fn inject_attribute_write(&self, attr_handle: u16, data: &[u8]) -> crate::Result<()> {
        let board = self.board();
        let event = encode_attribute_modified(DEFAULT_CONN_HANDLE, attr_handle, data, board)
            .ok_or(BleError::AttributeValueTooLarge {
                len: data.len(),
                max: max_attribute_data_len(board),
            })?;
        self.inject(event.to_vec());
        Ok(())
    }

    pub fn pending_events(&self) -> usize {
        self.state.lock().pending.len()
    }

    fn record(&self, command: SimCommand) -> Status {
        let mut state = self.state.lock();
        let status = state
            .failures
            .get(&command.command())
            .copied()
            .unwrap_or(Status::SUCCESS);
        trace!("SimRadio {:?} -> {}", command, status);
        state.commands.push(command);
        status
    }

    fn allocate(&self, count: u16) -> u16 {
        let mut state = self.state.lock();
        let handle = state.next_handle;
        state.next_handle = state.next_handle.wrapping_add(count);
        handle
    }
}

impl Default for SimRadio {
    fn default() -> Self {
        Self::new()
    }
}

fn into_result<T>(status: Status, value: impl FnOnce() -> T) -> Result<T, Status> {
    if status.is_success() {
        Ok(value())
    } else {
        Err(status)
    }
}

impl RadioStack for SimRadio {
    fn hci_init(&self) -> Status {
        self.record(SimCommand::HciInit)
    }

    fn reset(&self) -> Status {
        self.record(SimCommand::Reset)
    }

    fn version(&self) -> (u8, u16) {
        let state = self.state.lock();
        (state.hw_version, state.fw_version)
    }

    fn set_public_address(&self, address: &[u8; 6]) -> Status {
        self.record(SimCommand::SetPublicAddress(*address))
    }

    fn gatt_init(&self) -> Status {
        self.record(SimCommand::GattInit)
    }

    fn gap_init(&self, init: &GapInit) -> Result<GapHandles, Status> {
        let status = self.record(SimCommand::GapInit(*init));
        into_result(status, || {
            let service = self.allocate(5);
            GapHandles {
                service,
                device_name: service + 2,
                appearance: service + 4,
            }
        })
    }

    fn set_auth_requirement(&self, auth: &AuthRequirements) -> Status {
        self.record(SimCommand::SetAuthRequirement(*auth))
    }

    fn set_tx_power(&self, high_power: bool, level: u8) -> Status {
        self.record(SimCommand::SetTxPower { high_power, level })
    }

    fn add_service(
        &self,
        uuid: &BleUuid,
        service_type: ServiceType,
        max_attribute_records: u8,
    ) -> Result<u16, Status> {
        let status = self.record(SimCommand::AddService {
            uuid: *uuid,
            service_type,
            max_attribute_records,
        });
        into_result(status, || self.allocate(1))
    }

    fn add_characteristic(&self, params: &CharacteristicParams) -> Result<u16, Status> {
        let status = self.record(SimCommand::AddCharacteristic(*params));
        // Declaration and value, plus a client configuration descriptor for notify
        let records = if params.properties.contains(CharProperties::NOTIFY) {
            3
        } else {
            2
        };
        into_result(status, || self.allocate(records))
    }

    fn set_scan_response_data(&self, data: &[u8]) -> Status {
        self.record(SimCommand::SetScanResponseData(data.to_vec()))
    }

    fn set_discoverable(&self, params: &DiscoverableParams<'_>) -> Status {
        self.record(SimCommand::SetDiscoverable(params.into()))
    }

    fn set_non_discoverable(&self) -> Status {
        self.record(SimCommand::SetNonDiscoverable)
    }

    fn update_char_value(
        &self,
        service: u16,
        characteristic: u16,
        offset: u8,
        value: &[u8],
    ) -> Status {
        self.record(SimCommand::UpdateCharValue {
            service,
            characteristic,
            offset,
            value: value.to_vec(),
        })
    }

    fn pump_events(&self, on_event: &mut dyn FnMut(&[u8])) {
        // Release the lock first: handlers may issue commands
        let pending: Vec<Vec<u8>> = self.state.lock().pending.drain(..).collect();
        for event in &pending {
            on_event(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_commands_and_failures() {
        let radio = SimRadio::new();
        assert!(radio.hci_init().is_success());

        radio.set_failure(Command::GattInit, Status::FAILED);
        assert_eq!(radio.gatt_init(), Status::FAILED);
        radio.clear_failure(Command::GattInit);
        assert!(radio.gatt_init().is_success());

        assert_eq!(
            radio.commands(),
            vec![SimCommand::HciInit, SimCommand::GattInit, SimCommand::GattInit]
        );
        assert_eq!(radio.command_count(Command::GattInit), 2);
    }

    #[test]
    fn test_handle_allocation() {
        let radio = SimRadio::new();
        let service = radio
            .add_service(&BleUuid::Uuid16(0x180D), ServiceType::Primary, 7)
            .unwrap();
        let params = CharacteristicParams {
            service,
            uuid: BleUuid::Uuid16(0x2A37),
            max_len: 20,
            properties: CharProperties::NOTIFY,
            permissions: Default::default(),
            events: Default::default(),
            encryption_key_size: 16,
            variable_length: true,
        };
        let first = radio.add_characteristic(&params).unwrap();
        let second = radio.add_characteristic(&params).unwrap();
        assert_eq!(first, service + 1);
        assert_eq!(second, first + 3);
    }

    #[test]
    fn test_pump_drains_injected_events() {
        let radio = SimRadio::new();
        radio.inject(vec![1u8, 2, 3]);
        radio.inject_disconnection(0x13);
        assert_eq!(radio.pending_events(), 2);

        let mut seen = Vec::new();
        radio.pump_events(&mut |event: &[u8]| seen.push(event.to_vec()));
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0], vec![1, 2, 3]);
        assert_eq!(radio.pending_events(), 0);
    }

    #[test]
    fn test_oversized_attribute_write_is_rejected() {
        let radio = SimRadio::new();
        assert!(radio.inject_attribute_write(0x0013, &[0xAA; 246]).is_ok());
        assert_eq!(
            radio.inject_attribute_write(0x0013, &[0xAA; 247]),
            Err(BleError::AttributeValueTooLarge { len: 247, max: 246 })
        );
        assert_eq!(radio.pending_events(), 1);
    }
}
