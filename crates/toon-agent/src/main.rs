// ============================================
// File: crates/toon-agent/src/main.rs
// ============================================
//! # TOON Agent Entry Point
//!
//! ## Creation Reason
//! Main entry point for the device agent binary: CLI parsing, logging
//! setup, configuration loading, identity bootstrap, and the run loop.
//!
//! ## Usage
//! ```bash
//! # Start the agent (registers automatically on first contact)
//! toon-agent start
//!
//! # Other commands
//! toon-agent validate            # Validate config file
//! toon-agent pubkey              # Show device public key for server binding
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - The identity keypair is generated on first start and NEVER
//!   regenerated; deleting the key file orphans the device server-side
//! - Use systemd (or another supervisor) for production deployments;
//!   the loop itself never exits on iteration errors
//!
//! ## Last Modified
//! v0.1.0 - Initial CLI implementation

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use toon_agent::client::DeviceClient;
use toon_agent::config::AgentConfig;
use toon_agent::storage::{JsonlAudit, NonceLedger};
use toon_agent::telemetry::SystemTelemetry;
use toon_core::crypto::load_or_create;
use toon_transport::HttpTransport;

/// Default configuration file location.
const DEFAULT_CONFIG: &str = "/etc/toon/agent.toml";

// ============================================
// CLI Definition
// ============================================

/// TOON edge device agent
///
/// Quick Start:
///   1. Put the server URL and server public key in /etc/toon/agent.toml
///   2. Run: toon-agent start
#[derive(Parser, Debug)]
#[command(name = "toon-agent")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the agent loop (registers on first contact)
    Start {
        /// Path to configuration file
        #[arg(short, long, default_value = DEFAULT_CONFIG)]
        config: PathBuf,
    },

    /// Validate configuration file
    Validate {
        /// Path to configuration file
        #[arg(short, long, default_value = DEFAULT_CONFIG)]
        config: PathBuf,
    },

    /// Show the device public key (for out-of-band server binding)
    Pubkey {
        /// Path to configuration file
        #[arg(short, long, default_value = DEFAULT_CONFIG)]
        config: PathBuf,
    },
}

// ============================================
// Main
// ============================================

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_logging("info");

    let result = match cli.command {
        Commands::Start { config } => cmd_start(config).await,
        Commands::Validate { config } => cmd_validate(config).await,
        Commands::Pubkey { config } => cmd_pubkey(config).await,
    };

    if let Err(e) = result {
        error!("{e}");
        std::process::exit(1);
    }
}

// ============================================
// Commands
// ============================================

/// Starts the agent.
async fn cmd_start(config_path: PathBuf) -> anyhow::Result<()> {
    let config = load_or_default_config(&config_path).await;

    info!("════════════════════════════════════════");
    info!("Device ID:  {}", config.device.id);
    info!("Server:     {}", config.server.url);
    info!("Firmware:   {}", config.device.firmware_version);
    info!("════════════════════════════════════════");

    let keys = load_or_create(&config.key_file())?;
    let nonces = NonceLedger::open(config.nonce_file())?;
    let audit = JsonlAudit::open(config.audit_file())?;
    let transport = HttpTransport::new(&config.server.url, &config.user_agent())?;

    let mut client = DeviceClient::new(
        &config,
        keys,
        Arc::new(transport),
        Arc::new(SystemTelemetry::new()),
        Arc::new(audit),
        nonces,
    )?;

    client.run().await?;
    Ok(())
}

/// Validates the configuration file.
async fn cmd_validate(config_path: PathBuf) -> anyhow::Result<()> {
    if !config_path.exists() {
        println!("⚠️  Config file not found: {}", config_path.display());
        println!("   The agent will use default values.");
        return Ok(());
    }

    let config = AgentConfig::load(&config_path).await?;

    println!("✅ Configuration is valid");
    println!();
    println!("Server:");
    println!("   URL:         {}", config.server.url);
    println!(
        "   Server key:  {}",
        if config.server.public_key_b64.is_some() {
            "configured"
        } else {
            "MISSING (commands and firmware will be rejected)"
        }
    );
    println!();
    println!("Device:");
    println!("   ID:          {}", config.device.id);
    println!("   Class:       {}", config.device.class);
    println!("   Firmware:    {}", config.device.firmware_version);
    println!();
    println!("Retry:");
    println!("   Baseline:    {}s", config.retry.default_secs);
    println!("   Floor:       {}s", config.retry.floor_secs);
    println!("   Ceiling:     {}s", config.retry.max_secs);

    Ok(())
}

/// Shows the device public key.
async fn cmd_pubkey(config_path: PathBuf) -> anyhow::Result<()> {
    let config = load_or_default_config(&config_path).await;
    let keys = load_or_create(&config.key_file())?;
    println!("{}", keys.public_key_b64());
    Ok(())
}

// ============================================
// Helper Functions
// ============================================

/// Initializes the tracing subscriber.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .try_init()
        .ok();
}

/// Loads config or falls back to defaults.
async fn load_or_default_config(path: &PathBuf) -> AgentConfig {
    if path.exists() {
        match AgentConfig::load(path).await {
            Ok(config) => config,
            Err(e) => {
                error!("Config invalid, using defaults: {e}");
                AgentConfig::default()
            }
        }
    } else {
        info!("Config file not found, using defaults");
        AgentConfig::default()
    }
}
