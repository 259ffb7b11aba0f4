//! Error types for the BLE adapter
//!
//! Every vendor command returns a [`Status`]; non-success statuses are turned into
//! [`BleError::Command`] at the call site so callers see which command failed and why.

use thiserror::Error;

use crate::stack::{Command, Status};

// ----------------------------------------------------------------------------
// Decode Errors
// ----------------------------------------------------------------------------

/// Errors raised while parsing raw radio event buffers
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Truncated {what}: need {needed} bytes, got {actual}")]
    Truncated {
        what: &'static str,
        needed: usize,
        actual: usize,
    },

    #[error("Empty event buffer")]
    Empty,

    #[error("Board revision unknown, cannot select event layout")]
    UnknownBoard,
}

// ----------------------------------------------------------------------------
// Advertising Elements
// ----------------------------------------------------------------------------

/// The advertising element a budget violation refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdElement {
    LocalName,
    Uuid16List,
    Uuid128List,
}

impl core::fmt::Display for AdElement {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            AdElement::LocalName => write!(f, "local name"),
            AdElement::Uuid16List => write!(f, "16-bit UUID list"),
            AdElement::Uuid128List => write!(f, "128-bit UUID list"),
        }
    }
}

// ----------------------------------------------------------------------------
// Error Types
// ----------------------------------------------------------------------------

/// Errors produced by the BLE adapter
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BleError {
    #[error("{command} failed with status {status}")]
    Command { command: Command, status: Status },

    #[error("Name too long ({len} > {max})")]
    NameTooLong { len: usize, max: usize },

    #[error("Advertising {element} element full ({len} + {needed} > {max})")]
    PayloadFull {
        element: AdElement,
        len: usize,
        needed: usize,
        max: usize,
    },

    #[error("Advertising payload too large: {len} bytes (max: {max})")]
    PayloadTooLarge { len: usize, max: usize },

    #[error("Attribute value too large for one event: {len} bytes (max: {max})")]
    AttributeValueTooLarge { len: usize, max: usize },

    #[error("Event handler registry full (capacity: {capacity})")]
    RegistryFull { capacity: usize },

    #[error("Not implemented: {0}")]
    NotImplemented(&'static str),

    #[error("BLE stack not initialized")]
    NotInitialized,

    #[error("Event decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Invalid configuration: {reason}")]
    InvalidConfiguration { reason: String },
}

impl BleError {
    /// Build an invalid configuration error
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        BleError::InvalidConfiguration {
            reason: reason.into(),
        }
    }

    /// Vendor status carried by a command failure, if any
    pub fn status(&self) -> Option<Status> {
        match self {
            BleError::Command { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type Result<T> = core::result::Result<T, BleError>;
