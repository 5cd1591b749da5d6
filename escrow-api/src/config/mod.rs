//! Configuration Management Module
//!
//! This module handles loading and managing configuration for the escrow API service.
//! Configuration includes the ledger endpoint, the escrow program and token, the
//! fee-payer key reference, and API settings.

use anyhow::Context;
use chain_clients_svm::Commitment;
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;
use std::time::Duration;

use crate::amount::MAX_DECIMALS;

/// Environment variable that overrides the config file path.
pub const CONFIG_PATH_ENV: &str = "ESCROW_API_CONFIG_PATH";

/// Config file path used when the environment variable is unset.
pub const DEFAULT_CONFIG_PATH: &str = "config/escrow-api.toml";

// ============================================================================
// CONFIGURATION STRUCTURES
// ============================================================================

/// Main configuration structure containing all service settings.
///
/// This structure holds configuration for:
/// - Ledger RPC connection and timing
/// - The escrow program and the single supported token
/// - Fee payer key reference (optional; without it only holds are served)
/// - API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Ledger connection (RPC URL, commitment, timeouts)
    pub ledger: LedgerConfig,
    /// Escrow program and token settings
    pub escrow: EscrowConfig,
    /// Fee payer for release transactions (optional)
    #[serde(default)]
    pub fee_payer: Option<FeePayerConfig>,
    /// API server configuration (host, port, CORS settings)
    pub api: ApiConfig,
}

/// Ledger RPC connection and timing parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Solana JSON-RPC endpoint URL
    pub rpc_url: String,
    /// Commitment used for reads, preflight, and confirmation
    #[serde(default = "default_commitment")]
    pub commitment: Commitment,
    /// Upper bound for each individual RPC call in milliseconds
    #[serde(default = "default_rpc_timeout_ms")]
    pub rpc_timeout_ms: u64,
    /// Upper bound for waiting on confirmation after submission in milliseconds
    #[serde(default = "default_confirm_timeout_ms")]
    pub confirm_timeout_ms: u64,
    /// Interval between signature status polls in milliseconds
    #[serde(default = "default_confirm_poll_interval_ms")]
    pub confirm_poll_interval_ms: u64,
}

fn default_commitment() -> Commitment {
    Commitment::Confirmed
}

fn default_rpc_timeout_ms() -> u64 {
    10_000
}

fn default_confirm_timeout_ms() -> u64 {
    60_000
}

fn default_confirm_poll_interval_ms() -> u64 {
    500
}

impl LedgerConfig {
    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_millis(self.rpc_timeout_ms)
    }

    pub fn confirm_timeout(&self) -> Duration {
        Duration::from_millis(self.confirm_timeout_ms)
    }

    pub fn confirm_poll_interval(&self) -> Duration {
        Duration::from_millis(self.confirm_poll_interval_ms)
    }
}

/// Escrow program and token settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscrowConfig {
    /// Program ID of the timelock escrow program (base58)
    pub program_id: String,
    /// Mint of the single token the service escrows (base58)
    pub token_mint: String,
    /// Token decimals, used to convert `uiAmount` inputs
    pub token_decimals: u8,
}

impl EscrowConfig {
    pub fn program_id(&self) -> anyhow::Result<Pubkey> {
        Pubkey::from_str(&self.program_id)
            .with_context(|| format!("Invalid escrow.program_id '{}'", self.program_id))
    }

    pub fn token_mint(&self) -> anyhow::Result<Pubkey> {
        Pubkey::from_str(&self.token_mint)
            .with_context(|| format!("Invalid escrow.token_mint '{}'", self.token_mint))
    }
}

/// Fee payer configuration.
///
/// The config file contains the environment variable name, not the key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeePayerConfig {
    /// Environment variable name containing the fee payer secret key
    /// (JSON byte array or base58). Default: "ESCROW_FEE_PAYER_SECRET"
    #[serde(default = "default_private_key_env")]
    pub private_key_env: String,
    /// When false the key only signs (release simulation), never submits
    #[serde(default = "default_submit_enabled")]
    pub submit_enabled: bool,
}

fn default_private_key_env() -> String {
    "ESCROW_FEE_PAYER_SECRET".to_string()
}

fn default_submit_enabled() -> bool {
    true
}

impl FeePayerConfig {
    /// Loads the secret key from the environment variable.
    ///
    /// # Returns
    ///
    /// * `Ok(String)` - The raw secret key text
    /// * `Err(anyhow::Error)` - Variable not set
    pub fn get_private_key(&self) -> anyhow::Result<String> {
        std::env::var(&self.private_key_env).map_err(|_| {
            anyhow::anyhow!(
                "Environment variable '{}' not set. Please set it with the fee payer secret key (JSON byte array or base58).",
                self.private_key_env
            )
        })
    }
}

/// API server configuration for external communication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Host address to bind the API server to
    pub host: String,
    /// Port number to bind the API server to
    pub port: u16,
    /// Allowed CORS origins for cross-origin requests
    pub cors_origins: Vec<String>,
}

// ============================================================================
// CONFIGURATION LOADING AND MANAGEMENT
// ============================================================================

impl Config {
    /// Validates the configuration.
    ///
    /// This function ensures that:
    /// - The RPC URL is an http(s) URL
    /// - Program ID and token mint are valid base58 public keys
    /// - Token decimals fit the u64 base-unit range
    /// - All timeouts are positive and polling fits inside the confirm timeout
    ///
    /// # Returns
    ///
    /// - `Ok(())` - Configuration is valid
    /// - `Err(anyhow::Error)` - First violation found
    pub fn validate(&self) -> anyhow::Result<()> {
        let rpc_url = url::Url::parse(&self.ledger.rpc_url).with_context(|| {
            format!("Configuration error: invalid ledger.rpc_url '{}'", self.ledger.rpc_url)
        })?;
        if rpc_url.scheme() != "http" && rpc_url.scheme() != "https" {
            anyhow::bail!(
                "Configuration error: ledger.rpc_url must use http or https, got '{}'",
                rpc_url.scheme()
            );
        }

        self.escrow.program_id().context("Configuration error")?;
        self.escrow.token_mint().context("Configuration error")?;

        if self.escrow.token_decimals > MAX_DECIMALS {
            anyhow::bail!(
                "Configuration error: escrow.token_decimals {} exceeds {}",
                self.escrow.token_decimals,
                MAX_DECIMALS
            );
        }

        for (name, value) in [
            ("ledger.rpc_timeout_ms", self.ledger.rpc_timeout_ms),
            ("ledger.confirm_timeout_ms", self.ledger.confirm_timeout_ms),
            ("ledger.confirm_poll_interval_ms", self.ledger.confirm_poll_interval_ms),
        ] {
            if value == 0 {
                anyhow::bail!("Configuration error: {} must be greater than 0", name);
            }
        }

        if self.ledger.confirm_poll_interval_ms > self.ledger.confirm_timeout_ms {
            anyhow::bail!(
                "Configuration error: ledger.confirm_poll_interval_ms ({}) exceeds ledger.confirm_timeout_ms ({})",
                self.ledger.confirm_poll_interval_ms,
                self.ledger.confirm_timeout_ms
            );
        }

        for origin in self.api.cors_origins.iter().filter(|o| o.as_str() != "*") {
            let parsed = url::Url::parse(origin).with_context(|| {
                format!("Configuration error: invalid api.cors_origins entry '{}'", origin)
            })?;
            // Must be exactly scheme://host[:port]
            if parsed.origin().ascii_serialization() != *origin {
                anyhow::bail!(
                    "Configuration error: api.cors_origins entry '{}' is not an origin (expected scheme://host[:port])",
                    origin
                );
            }
        }

        if let Some(ref fee_payer) = self.fee_payer {
            if fee_payer.private_key_env.trim().is_empty() {
                anyhow::bail!("Configuration error: fee_payer.private_key_env must not be empty");
            }
        }

        Ok(())
    }

    /// Loads configuration from the TOML file.
    ///
    /// The path comes from `ESCROW_API_CONFIG_PATH`, falling back to
    /// `config/escrow-api.toml`.
    ///
    /// # Returns
    ///
    /// - `Ok(Config)` - Successfully loaded and validated configuration
    /// - `Err(anyhow::Error)` - File missing, unparsable, or invalid
    pub fn load() -> anyhow::Result<Self> {
        let config_path =
            std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from_path(&config_path)
    }

    /// Loads and validates configuration from an explicit path.
    pub fn load_from_path(config_path: &str) -> anyhow::Result<Self> {
        if !std::path::Path::new(config_path).exists() {
            anyhow::bail!(
                "Configuration file '{}' not found. Please copy the template:\n\
                cp config/escrow-api.template.toml config/escrow-api.toml\n\
                Then edit config/escrow-api.toml with your actual values.",
                config_path
            );
        }

        let content = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read {}", config_path))?;
        let config: Config =
            toml::from_str(&content).with_context(|| format!("Failed to parse {}", config_path))?;
        config.validate()?;
        Ok(config)
    }

    /// Creates a default configuration with placeholder values.
    ///
    /// Points at a local validator; suitable for development and tests.
    pub fn default() -> Self {
        Self {
            ledger: LedgerConfig {
                rpc_url: "http://127.0.0.1:8899".to_string(),
                commitment: default_commitment(),
                rpc_timeout_ms: default_rpc_timeout_ms(),
                confirm_timeout_ms: default_confirm_timeout_ms(),
                confirm_poll_interval_ms: default_confirm_poll_interval_ms(),
            },
            escrow: EscrowConfig {
                program_id: "GuKWhJ6x5t42C3WCPbsgyMhbo12kjDSp1bQv55AeaUWX".to_string(),
                token_mint: "4zMMC9srt5Ri5X14GAgXhaHii3GnPAEERYPJgZJDncDU".to_string(),
                token_decimals: 6,
            },
            fee_payer: None,
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 3001,
                cors_origins: vec!["http://localhost:3000".to_string()],
            },
        }
    }
}
