//! Command-line interface definitions and parsing

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Bring up the radio, advertise a name and walk through a peer connection
    Demo {
        /// Advertised local name
        #[arg(short, long, default_value = "Hello!")]
        name: String,
        /// Initialize as a client instead of a server
        #[arg(long)]
        client: bool,
    },
    /// Run the UART echo service against scripted peer writes
    Uart {
        /// Advertised local name (defaults to the configured device name)
        #[arg(short, long)]
        name: Option<String>,
        /// Peer write to replay, hex encoded (repeatable)
        #[arg(short, long = "write")]
        writes: Vec<String>,
        /// Peer write to replay, as text (repeatable)
        #[arg(short, long = "text")]
        texts: Vec<String>,
        /// Seconds to keep serving after the script is delivered
        #[arg(long, default_value_t = 1)]
        linger: u64,
    },
    /// Decode a raw radio event frame
    Decode {
        /// Event frame, hex encoded
        frame: String,
        /// Decode attribute writes with the IDB04A1 layout
        #[arg(long)]
        idb04a1: bool,
    },
    /// Print the default configuration as TOML
    Config,
}
