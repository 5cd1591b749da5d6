//! Timelock Escrow API Service
//!
//! HTTP service for a time-locked token escrow on Solana.
//!
//! ## Overview
//!
//! 1. `POST /hold` validates the request and returns an unsigned transaction
//!    that the depositor signs in their wallet
//! 2. `POST /release` builds the release, signs it as fee payer, submits it,
//!    and waits for confirmation
//!
//! ## Security Model
//!
//! The fee payer key only pays fees. Funds move under the authority of the
//! program-derived escrow address.

use anyhow::Result;
use tracing::info;

use escrow_api::api::ApiServer;
use escrow_api::config::{Config, CONFIG_PATH_ENV};
use escrow_api::{EscrowService, SigningAuthority};

// ============================================================================
// MAIN APPLICATION ENTRY POINT
// ============================================================================

/// Main application entry point.
///
/// This function:
/// 1. Initializes logging and tracing
/// 2. Loads configuration from TOML file
/// 3. Loads the fee payer (if configured)
/// 4. Starts the API server
#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    info!("Starting Escrow API Service");

    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|arg| arg == "--help" || arg == "-h") {
        println!("Escrow API Service");
        println!();
        println!("Usage: escrow-api [OPTIONS]");
        println!();
        println!("Options:");
        println!("  --config <path>   Use custom config file path");
        println!("  --help, -h        Show this help message");
        println!();
        println!("Environment variables:");
        println!("  {}    Path to config file (default: config/escrow-api.toml)", CONFIG_PATH_ENV);
        println!("  ESCROW_FEE_PAYER_SECRET   Fee payer secret key (name configurable via fee_payer.private_key_env)");
        return Ok(());
    }

    let config_path = args
        .iter()
        .position(|arg| arg == "--config")
        .and_then(|i| args.get(i + 1));

    let config = match config_path {
        Some(path) => {
            info!("Using custom config: {}", path);
            Config::load_from_path(path)?
        }
        None => Config::load()?,
    };
    info!("Configuration loaded successfully");

    let signer = SigningAuthority::from_config(config.fee_payer.as_ref())?;
    let service = EscrowService::new(&config, signer)?;
    info!(
        "Escrow service ready (program {}, mint {}, ledger {})",
        config.escrow.program_id, config.escrow.token_mint, config.ledger.rpc_url
    );

    let api_server = ApiServer::new(config, service);
    api_server.run().await?;

    Ok(())
}
