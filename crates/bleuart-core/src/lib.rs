//! Host-side adapter for a BlueNRG-style BLE co-processor
//!
//! This crate sits between the application and the vendor BLE stack running
//! on the radio, which it consumes through the [`RadioStack`] trait.
//!
//! ## Architecture
//!
//! - [`stack`] - Capability trait for the vendor stack and its parameter types
//! - [`event`] - Raw event buffers and typed decoding per board revision
//! - [`registry`] - Fan-out of raw events to registered handlers
//! - [`router`] - Receive path entry point and connection bookkeeping
//! - [`state`] - Idle / advertising / scanning / connected state machine
//! - [`advertising`] - Advertising payload builder and discoverable control
//! - [`ble`] - Host context tying the above together
//! - [`sim`] - In-process simulated radio
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use bleuart_core::{Ble, BleConfig, Role, SimRadio};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let ble = Arc::new(Ble::with_config(SimRadio::new(), BleConfig::testing())?);
//! ble.init(Role::Server)?;
//!
//! ble.add_name("Hello!")?;
//! ble.start_advertising()?;
//!
//! let events = ble.spawn_event_thread()?;
//! // ...
//! events.shutdown();
//! # Ok(())
//! # }
//! ```

pub mod advertising;
pub mod ble;
pub mod board;
pub mod config;
pub mod errors;
pub mod event;
pub mod registry;
pub mod router;
pub mod sim;
pub mod stack;
pub mod state;
pub mod uuids;

// Public API exports
pub use advertising::{AdvertisingPayload, MAX_ADV_DATA_LEN, MAX_NAME_LEN};
pub use ble::{Ble, EventThread};
pub use board::ExpansionBoard;
pub use config::{AdvertisingConfig, BleConfig, EventLoopConfig, GapConfig, RegistryConfig};
pub use errors::{AdElement, BleError, DecodeError, Result};
pub use event::{
    max_attribute_data_len, AttributeModified, ConnectionComplete, DisconnectComplete,
    RadioEvent, RawEvent,
};
pub use registry::{CallbackRegistry, EventHandler};
pub use router::EventRouter;
pub use sim::{SimCommand, SimRadio};
pub use stack::{
    AttrPermissions, AuthRequirements, CharProperties, CharacteristicParams, Command,
    GattEventMask, RadioStack, Role, ServiceType, Status,
};
pub use state::BleState;
pub use uuids::BleUuid;
