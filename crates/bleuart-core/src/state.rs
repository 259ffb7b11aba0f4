//! Host-side BLE state
//!
//! The state is written from both the application thread (advertising start/stop)
//! and the event thread (connection and disconnection), so it lives in an atomic.

use core::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

use serde::{Deserialize, Serialize};

// ----------------------------------------------------------------------------
// BLE State
// ----------------------------------------------------------------------------

/// Lifecycle state of the local device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum BleState {
    #[default]
    Idle = 0,
    Advertising = 1,
    /// Reserved for when scanning is supported
    Scanning = 2,
    Connected = 3,
}

impl BleState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => BleState::Advertising,
            2 => BleState::Scanning,
            3 => BleState::Connected,
            _ => BleState::Idle,
        }
    }

    pub fn is_connected(self) -> bool {
        self == BleState::Connected
    }
}

impl fmt::Display for BleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BleState::Idle => write!(f, "idle"),
            BleState::Advertising => write!(f, "advertising"),
            BleState::Scanning => write!(f, "scanning"),
            BleState::Connected => write!(f, "connected"),
        }
    }
}

// ----------------------------------------------------------------------------
// State Machine
// ----------------------------------------------------------------------------

/// Shared state cell with the allowed transitions
#[derive(Debug, Default)]
pub struct StateMachine {
    state: AtomicU8,
}

impl StateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> BleState {
        BleState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Enter `Advertising` after a successful set-discoverable
    pub fn begin_advertising(&self) {
        self.state
            .store(BleState::Advertising as u8, Ordering::Release);
    }

    /// Leave `Advertising` for `Idle`; other states are untouched
    ///
    /// Returns whether the transition happened.
    pub fn end_advertising(&self) -> bool {
        self.transition(BleState::Advertising, BleState::Idle)
    }

    /// Enter `Connected` from `Advertising` or `Scanning`
    ///
    /// Returns the state that was left, or `None` if no transition applied.
    pub fn connected(&self) -> Option<BleState> {
        [BleState::Advertising, BleState::Scanning]
            .into_iter()
            .find(|from| self.transition(*from, BleState::Connected))
    }

    /// Return to `Idle` unconditionally, yielding the previous state
    pub fn disconnected(&self) -> BleState {
        BleState::from_u8(self.state.swap(BleState::Idle as u8, Ordering::AcqRel))
    }

    fn transition(&self, from: BleState, to: BleState) -> bool {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_transitions() {
        let state = StateMachine::new();
        assert_eq!(state.current(), BleState::Idle);

        assert_eq!(state.connected(), None);
        assert_eq!(state.current(), BleState::Idle);

        state.begin_advertising();
        assert_eq!(state.current(), BleState::Advertising);

        assert_eq!(state.connected(), Some(BleState::Advertising));
        assert!(state.current().is_connected());

        assert!(!state.end_advertising());
        assert_eq!(state.current(), BleState::Connected);

        assert_eq!(state.disconnected(), BleState::Connected);
        assert_eq!(state.current(), BleState::Idle);
    }

    #[test]
    fn test_end_advertising_only_from_advertising() {
        let state = StateMachine::new();
        assert!(!state.end_advertising());

        state.begin_advertising();
        assert!(state.end_advertising());
        assert_eq!(state.current(), BleState::Idle);
    }

    #[test]
    fn test_disconnect_from_any_state() {
        let state = StateMachine::new();
        assert_eq!(state.disconnected(), BleState::Idle);

        state.begin_advertising();
        assert_eq!(state.disconnected(), BleState::Advertising);
        assert_eq!(state.current(), BleState::Idle);
    }
}
