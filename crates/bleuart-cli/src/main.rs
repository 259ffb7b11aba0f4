//! bleuart CLI entry point

use std::time::Duration;

use clap::Parser;
use tracing::{error, info};

use bleuart_cli::{
    app::{describe_frame, BleuartApp},
    cli::{Cli, Commands},
    config::AppConfig,
    error::Result,
};
use bleuart_core::{ExpansionBoard, Role};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse();

    // Initialize logging
    setup_logging(cli.verbose);

    // Load configuration
    let config = load_configuration(&cli)?;

    if let Err(e) = execute(cli.command, config).await {
        error!("Command execution failed: {}", e);
        std::process::exit(1);
    }

    Ok(())
}

async fn execute(command: Commands, config: AppConfig) -> Result<()> {
    match command {
        Commands::Demo { name, client } => {
            let role = if client { Role::Client } else { Role::Server };
            let app = BleuartApp::new(config)?;
            let states = app.run_demo(&name, role).await?;
            for state in states {
                println!("{}", state);
            }
        }
        Commands::Uart {
            name,
            writes,
            texts,
            linger,
        } => {
            let mut script = Vec::with_capacity(writes.len() + texts.len());
            for write in &writes {
                script.push(hex::decode(write)?);
            }
            script.extend(texts.into_iter().map(String::into_bytes));

            let name = name.unwrap_or_else(|| config.session.device_name.clone());
            let app = BleuartApp::new(config)?;
            let received = app
                .run_uart(&name, script, Duration::from_secs(linger))
                .await?;
            info!("UART session received {} bytes", received.len());
            println!("{}", hex::encode(&received));
        }
        Commands::Decode { frame, idb04a1 } => {
            let board = if idb04a1 {
                ExpansionBoard::Idb04a1
            } else {
                ExpansionBoard::Idb05a1
            };
            let bytes = hex::decode(frame.trim())?;
            println!("{}", describe_frame(&bytes, board)?);
        }
        Commands::Config => {
            print!("{}", config.to_toml()?);
        }
    }
    Ok(())
}

/// Setup logging based on verbosity level
fn setup_logging(verbose: bool) {
    let log_level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}

/// Load configuration from file or use defaults
fn load_configuration(cli: &Cli) -> Result<AppConfig> {
    if let Some(config_path) = &cli.config {
        info!("Loading configuration from: {}", config_path);
        Ok(AppConfig::load_from_file(config_path)?)
    } else {
        info!("Using default configuration");
        Ok(AppConfig::default())
    }
}
