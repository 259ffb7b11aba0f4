//! Radio event router
//!
//! Entry point of the receive path: every raw event is first fanned out to the
//! registry, then decoded for connection bookkeeping.

use std::sync::Arc;

use tracing::{debug, info, trace};

use crate::board::ExpansionBoard;
use crate::errors::Result;
use crate::event::{RadioEvent, RawEvent};
use crate::registry::{CallbackRegistry, EventHandler};
use crate::state::{BleState, StateMachine};

#[derive(Debug)]
pub struct EventRouter {
    registry: CallbackRegistry,
    state: StateMachine,
}

impl EventRouter {
    pub fn new(registry_capacity: usize) -> Self {
        Self {
            registry: CallbackRegistry::new(registry_capacity),
            state: StateMachine::new(),
        }
    }

    pub fn register(&self, handler: Arc<dyn EventHandler>) -> Result<()> {
        self.registry.register(handler)
    }

    pub fn registry(&self) -> &CallbackRegistry {
        &self.registry
    }

    pub fn state(&self) -> &StateMachine {
        &self.state
    }

    /// Route one raw event buffer
    pub fn route(&self, bytes: &[u8], board: ExpansionBoard) {
        let event = RawEvent::new(bytes);
        self.registry.dispatch(&event);

        if !event.is_hci_event() {
            return;
        }

        // The attribute layout is only needed by subscribers; any known layout
        // decodes the connection events.
        let decode_board = if board.is_known() {
            board
        } else {
            ExpansionBoard::Idb05a1
        };

        match event.decode(decode_board) {
            Ok(Some(RadioEvent::DisconnectComplete(disconnect))) => {
                let previous = self.state.disconnected();
                info!(
                    "Disconnected (handle 0x{:04X}, reason 0x{:02X}, was {})",
                    disconnect.handle, disconnect.reason, previous
                );
            }
            Ok(Some(RadioEvent::ConnectionComplete(conn))) => {
                if conn.status != 0 {
                    debug!("Connection failed with status 0x{:02X}", conn.status);
                    return;
                }
                match self.state.connected() {
                    Some(_) => info!(
                        "Connected to {} (handle 0x{:04X})",
                        conn.peer_address_string(),
                        conn.handle
                    ),
                    None => debug!(
                        "Connection complete from {} ignored in state {}",
                        conn.peer_address_string(),
                        self.state.current()
                    ),
                }
            }
            Ok(Some(RadioEvent::AttributeModified(_))) | Ok(None) => {
                trace!("Event {:?} not tracked by router", event);
            }
            Err(e) => debug!("Dropping malformed event {:?}: {}", event, e),
        }
    }

    /// Current state
    pub fn current_state(&self) -> BleState {
        self.state.current()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{
        encode_connection_complete, encode_disconnect_complete, ConnectionComplete,
        DisconnectComplete,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn connection(status: u8) -> Vec<u8> {
        encode_connection_complete(&ConnectionComplete {
            status,
            handle: 0x0801,
            role: 0x01,
            peer_address_type: 0,
            peer_address: [1, 2, 3, 4, 5, 6],
            interval: 0x28,
            latency: 0,
            supervision_timeout: 0x1F4,
            master_clock_accuracy: 0,
        })
        .to_vec()
    }

    fn disconnect() -> Vec<u8> {
        encode_disconnect_complete(&DisconnectComplete {
            status: 0,
            handle: 0x0801,
            reason: 0x13,
        })
        .to_vec()
    }

    #[test]
    fn test_handlers_see_every_event() {
        let router = EventRouter::new(10);
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        router
            .register(Arc::new(move |_: &RawEvent<'_>| {
                counter.fetch_add(1, Ordering::SeqCst);
            }))
            .unwrap();

        router.route(&[0x02, 0x00], ExpansionBoard::Idb05a1);
        router.route(&[], ExpansionBoard::Idb05a1);
        router.route(&disconnect(), ExpansionBoard::Idb05a1);
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_connection_lifecycle() {
        let router = EventRouter::new(10);

        // Not advertising: no transition
        router.route(&connection(0), ExpansionBoard::Idb05a1);
        assert_eq!(router.current_state(), BleState::Idle);

        router.state().begin_advertising();
        router.route(&connection(0x3E), ExpansionBoard::Idb05a1);
        assert_eq!(router.current_state(), BleState::Advertising);

        router.route(&connection(0), ExpansionBoard::Idb05a1);
        assert_eq!(router.current_state(), BleState::Connected);

        router.route(&disconnect(), ExpansionBoard::Idb04a1);
        assert_eq!(router.current_state(), BleState::Idle);
    }

    #[test]
    fn test_unmatched_disconnect_forces_idle() {
        let router = EventRouter::new(10);
        router.state().begin_advertising();
        router.route(&disconnect(), ExpansionBoard::Unknown);
        assert_eq!(router.current_state(), BleState::Idle);
    }

    #[test]
    fn test_malformed_events_are_ignored() {
        let router = EventRouter::new(10);
        router.state().begin_advertising();
        router.route(&[0x04, 0x05, 0x04, 0x00], ExpansionBoard::Idb05a1);
        router.route(&[0x04], ExpansionBoard::Idb05a1);
        assert_eq!(router.current_state(), BleState::Advertising);
    }
}
