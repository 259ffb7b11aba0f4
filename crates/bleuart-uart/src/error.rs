//! Error types for the UART service

use bleuart_core::BleError;
use thiserror::Error;

// ----------------------------------------------------------------------------
// Error Types
// ----------------------------------------------------------------------------

/// Errors specific to the UART service
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UartError {
    #[error("BLE error: {0}")]
    Ble(#[from] BleError),

    #[error("Write too large: {size} bytes (max: {max_size})")]
    PayloadTooLarge { size: usize, max_size: usize },

    #[error("Invalid UART configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Not implemented: {0}")]
    NotImplemented(&'static str),
}

pub type Result<T> = core::result::Result<T, UartError>;
