//! BLE host context
//!
//! [`Ble`] owns the radio stack handle together with everything the adapter
//! keeps per device: the event router (registry and state), the advertising
//! payload and the board revision discovered at init. It is meant to be
//! created once and shared as `Arc<Ble<S>>` between the application and the
//! event thread.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::advertising::{self, AdvertisingPayload};
use crate::board::ExpansionBoard;
use crate::config::BleConfig;
use crate::errors::{BleError, Result};
use crate::registry::EventHandler;
use crate::router::EventRouter;
use crate::stack::{gap_init_for, Command, GapHandles, RadioStack, Role};
use crate::state::BleState;
use crate::uuids::BleUuid;

/// Host-side BLE adapter around a radio stack
pub struct Ble<S: RadioStack> {
    stack: S,
    config: BleConfig,
    board: OnceLock<ExpansionBoard>,
    role: OnceLock<Role>,
    gap: OnceLock<GapHandles>,
    router: EventRouter,
    advertising: Mutex<AdvertisingPayload>,
}

impl<S: RadioStack> Ble<S> {
    /// Create a host context with the default configuration
    pub fn new(stack: S) -> Self {
        Self::build(stack, BleConfig::default())
    }

    /// Create a host context with a validated configuration
    pub fn with_config(stack: S, config: BleConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(stack, config))
    }

    fn build(stack: S, config: BleConfig) -> Self {
        Self {
            router: EventRouter::new(config.registry.capacity),
            stack,
            config,
            board: OnceLock::new(),
            role: OnceLock::new(),
            gap: OnceLock::new(),
            advertising: Mutex::new(AdvertisingPayload::new()),
        }
    }

    /// Bring up the radio in `role`
    ///
    /// Runs HCI init, board discovery, reset, address, GATT and GAP init,
    /// security and TX power in that order, stopping at the first failure.
    pub fn init(&self, role: Role) -> Result<()> {
        let gap_config = &self.config.gap;

        self.stack.hci_init().check(Command::HciInit)?;

        let (hw_version, fw_version) = self.stack.version();
        let board = ExpansionBoard::from_hw_version(hw_version);
        if self.board.set(board).is_err() {
            warn!("BLE stack already initialized");
        }
        let board = self.board();
        info!(
            "Radio hw 0x{:02X} fw 0x{:04X}: {}",
            hw_version, fw_version, board
        );

        // Reset so the address configuration can be rewritten
        self.stack.reset().check(Command::Reset)?;
        if !gap_config.reset_delay.is_zero() {
            thread::sleep(gap_config.reset_delay);
        }

        let address = gap_config.address_for(role);
        self.stack
            .set_public_address(&address)
            .check(Command::SetPublicAddress)?;

        self.stack.gatt_init().check(Command::GattInit)?;

        let gap_init = gap_init_for(
            role,
            board,
            gap_config.privacy_enabled,
            gap_config.device_name_len,
        );
        let handles = self
            .stack
            .gap_init(&gap_init)
            .map_err(|status| status.fail(Command::GapInit))?;
        let _ = self.gap.set(handles);
        debug!("GAP service handle 0x{:04X}", handles.service);

        self.stack
            .set_auth_requirement(&self.config.security)
            .check(Command::SetAuthRequirement)?;

        self.stack
            .set_tx_power(gap_config.tx_power_high, gap_config.tx_power_level)
            .check(Command::SetTxPower)?;

        let _ = self.role.set(role);
        info!("BLE stack initialized as {:?}", role);
        Ok(())
    }

    /// Board revision discovered at init, `Unknown` before
    pub fn board(&self) -> ExpansionBoard {
        self.board.get().copied().unwrap_or_default()
    }

    pub fn role(&self) -> Option<Role> {
        self.role.get().copied()
    }

    pub fn is_initialized(&self) -> bool {
        self.role.get().is_some()
    }

    /// GAP service handles reported at init
    pub fn gap_handles(&self) -> Option<GapHandles> {
        self.gap.get().copied()
    }

    pub fn state(&self) -> BleState {
        self.router.current_state()
    }

    pub fn config(&self) -> &BleConfig {
        &self.config
    }

    pub fn stack(&self) -> &S {
        &self.stack
    }

    /// Subscribe to every raw radio event
    pub fn register_event_handler(&self, handler: Arc<dyn EventHandler>) -> Result<()> {
        self.router.register(handler)
    }

    // ------------------------------------------------------------------------
    // Advertising
    // ------------------------------------------------------------------------

    pub fn add_name(&self, name: &str) -> Result<()> {
        self.advertising.lock().add_name(name)
    }

    pub fn add_uuid16(&self, uuid: u16) -> Result<()> {
        self.advertising.lock().add_uuid16(uuid)
    }

    pub fn add_uuid128(&self, uuid: &[u8; 16]) -> Result<()> {
        self.advertising.lock().add_uuid128(uuid)
    }

    pub fn add_uuid(&self, uuid: &BleUuid) -> Result<()> {
        self.advertising.lock().add_uuid(uuid)
    }

    /// Empty the advertising payload; the advertising state is unchanged
    pub fn clear_advertising(&self) {
        self.advertising.lock().clear();
    }

    /// Current advertising payload
    pub fn advertising_payload(&self) -> AdvertisingPayload {
        self.advertising.lock().clone()
    }

    pub fn start_advertising(&self) -> Result<()> {
        let payload = self.advertising.lock();
        advertising::start(
            &self.stack,
            self.router.state(),
            &payload,
            &self.config.advertising,
        )
    }

    pub fn stop_advertising(&self) -> Result<()> {
        advertising::stop(&self.stack, self.router.state())
    }

    /// Scanning for peers is not supported
    pub fn scan(&self) -> Result<()> {
        Err(BleError::NotImplemented("scanning"))
    }

    // ------------------------------------------------------------------------
    // Event Processing
    // ------------------------------------------------------------------------

    /// Route one raw event buffer as if received from the radio
    pub fn route_event(&self, bytes: &[u8]) {
        self.router.route(bytes, self.board());
    }

    /// Drain and route the radio's pending events
    ///
    /// Returns the number of events routed.
    pub fn process_events(&self) -> usize {
        let board = self.board();
        let mut routed = 0;
        self.stack.pump_events(&mut |bytes: &[u8]| {
            self.router.route(bytes, board);
            routed += 1;
        });
        routed
    }
}

impl<S: RadioStack + 'static> Ble<S> {
    /// Pump events on a dedicated thread until the handle is shut down
    pub fn spawn_event_thread(self: &Arc<Self>) -> io::Result<EventThread> {
        let ble = Arc::clone(self);
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);
        let poll_interval = self.config.event_loop.poll_interval;

        let handle = thread::Builder::new()
            .name("ble-events".to_string())
            .spawn(move || {
                debug!("Event thread started");
                while !stop_flag.load(Ordering::Acquire) {
                    if ble.process_events() == 0 {
                        thread::sleep(poll_interval);
                    }
                }
                debug!("Event thread stopped");
            })?;

        Ok(EventThread {
            stop,
            handle: Some(handle),
        })
    }
}

impl<S: RadioStack> core::fmt::Debug for Ble<S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Ble")
            .field("board", &self.board())
            .field("role", &self.role())
            .field("state", &self.state())
            .field("router", &self.router)
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Event Thread
// ----------------------------------------------------------------------------

/// Handle to the event thread; stops it when dropped
#[derive(Debug)]
pub struct EventThread {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl EventThread {
    /// Ask the thread to stop after its current pump
    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stop the thread and wait for it to exit
    pub fn shutdown(mut self) {
        self.request_stop();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Event thread panicked");
            }
        }
    }
}

impl Drop for EventThread {
    fn drop(&mut self) {
        self.request_stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{SimCommand, SimRadio};
    use crate::stack::{GapInit, Status};

    fn ble() -> Ble<SimRadio> {
        Ble::with_config(SimRadio::new(), BleConfig::testing()).unwrap()
    }

    #[test]
    fn test_init_sequence() {
        let ble = ble();
        assert_eq!(ble.board(), ExpansionBoard::Unknown);

        ble.init(Role::Server).unwrap();
        assert_eq!(ble.board(), ExpansionBoard::Idb05a1);
        assert!(ble.is_initialized());

        let commands: Vec<Command> = ble.stack().commands().iter().map(|c| c.command()).collect();
        assert_eq!(
            commands,
            vec![
                Command::HciInit,
                Command::Reset,
                Command::SetPublicAddress,
                Command::GattInit,
                Command::GapInit,
                Command::SetAuthRequirement,
                Command::SetTxPower,
            ]
        );
        assert!(ble
            .stack()
            .commands()
            .contains(&SimCommand::SetPublicAddress([0xaa, 0x00, 0x00, 0xE1, 0x80, 0x02])));
        assert!(ble.stack().commands().contains(&SimCommand::SetTxPower {
            high_power: true,
            level: 4
        }));
    }

    #[test]
    fn test_init_on_idb04a1_client() {
        let radio = SimRadio::with_version(0x30, 0x0600);
        let ble = Ble::with_config(radio, BleConfig::testing()).unwrap();
        ble.init(Role::Client).unwrap();
        assert_eq!(ble.board(), ExpansionBoard::Idb04a1);
        assert!(ble
            .stack()
            .commands()
            .contains(&SimCommand::GapInit(GapInit::Idb04a1 { role: 0x03 })));
        assert!(ble
            .stack()
            .commands()
            .contains(&SimCommand::SetPublicAddress([0xbb, 0x00, 0x00, 0xE1, 0x80, 0x02])));
    }

    #[test]
    fn test_init_stops_at_first_failure() {
        let ble = ble();
        ble.stack().set_failure(Command::GattInit, Status::FAILED);

        let err = ble.init(Role::Server).unwrap_err();
        assert_eq!(
            err,
            BleError::Command {
                command: Command::GattInit,
                status: Status::FAILED
            }
        );
        assert_eq!(ble.stack().command_count(Command::GapInit), 0);
        assert!(!ble.is_initialized());
    }

    #[test]
    fn test_gap_init_failure() {
        let ble = ble();
        ble.stack().set_failure(Command::GapInit, Status::INVALID_PARAMS);
        assert_eq!(
            ble.init(Role::Server).unwrap_err().status(),
            Some(Status::INVALID_PARAMS)
        );
    }

    #[test]
    fn test_scan_not_implemented() {
        assert_eq!(ble().scan(), Err(BleError::NotImplemented("scanning")));
    }

    #[test]
    fn test_process_events_routes_connection() {
        let ble = ble();
        ble.init(Role::Server).unwrap();
        ble.add_name("Hello!").unwrap();
        ble.start_advertising().unwrap();

        ble.stack().inject_connection([1, 2, 3, 4, 5, 6]);
        assert_eq!(ble.process_events(), 1);
        assert_eq!(ble.state(), BleState::Connected);

        ble.stack().inject_disconnection(0x13);
        ble.process_events();
        assert_eq!(ble.state(), BleState::Idle);
    }

    #[test]
    fn test_event_thread_shutdown() {
        let ble = Arc::new(ble());
        let thread = ble.spawn_event_thread().unwrap();
        ble.stack().inject_disconnection(0x13);
        thread.shutdown();
    }
}
