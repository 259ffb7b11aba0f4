//! bleuart CLI library
//!
//! Components of the `bleuart` demonstration binary: argument parsing,
//! configuration loading and the simulated radio sessions.

pub mod app;
pub mod cli;
pub mod config;
pub mod error;

pub use app::{describe_frame, BleuartApp};
pub use cli::{Cli, Commands};
pub use config::AppConfig;
pub use error::{CliError, Result};
