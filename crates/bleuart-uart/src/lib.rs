//! UART-style byte stream over BLE
//!
//! Registers a GATT service with an RX characteristic (peer writes) and a TX
//! characteristic (notifications to the peer) on top of `bleuart-core`.
//!
//! - [`protocol`] - Service and characteristic UUIDs, attribute handles
//! - [`config`] - Queue and attribute sizing
//! - [`error`] - Error types
//! - [`queue`] - SPSC RX byte queue
//! - [`reader`] - Application-side reader
//! - [`service`] - Service registration, advertising and writes
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use bleuart_core::{Ble, BleConfig, Role, SimRadio};
//! use bleuart_uart::UartService;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let ble = Arc::new(Ble::with_config(SimRadio::new(), BleConfig::testing())?);
//! ble.init(Role::Server)?;
//!
//! let (uart, reader) = UartService::init(&ble)?;
//! uart.advertise("UART Test")?;
//!
//! let events = ble.spawn_event_thread()?;
//! while let Some(byte) = reader.read() {
//!     uart.write(&[byte])?;
//! }
//! events.shutdown();
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod protocol;
pub mod queue;
pub mod reader;
pub mod service;

// Public API exports
pub use config::UartConfig;
pub use error::UartError;
pub use protocol::{
    ServiceHandles, UART_RX_CHARACTERISTIC_UUID, UART_SERVICE_UUID, UART_TX_CHARACTERISTIC_UUID,
};
pub use reader::UartReader;
pub use service::UartService;
