//! Error handling for the bleuart CLI

use thiserror::Error;

use crate::config::ConfigError;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    #[error("BLE error: {0}")]
    Ble(#[from] bleuart_core::BleError),

    #[error("UART error: {0}")]
    Uart(#[from] bleuart_uart::UartError),

    #[error("Event decode error: {0}")]
    Decode(#[from] bleuart_core::DecodeError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Task failed: {0}")]
    Task(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Hex decoding error: {0}")]
    HexDecoding(#[from] hex::FromHexError),
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> Self {
        CliError::Task(err.to_string())
    }
}
