//! Signing Authority
//!
//! The service signs only as fee payer of release transactions. What a
//! configured signer may do is fixed by a capability tag at startup and
//! matched on per request; nothing is probed at runtime.

use anyhow::Context;
use solana_sdk::{
    hash::Hash,
    pubkey::Pubkey,
    signature::{Keypair, Signer},
    transaction::Transaction,
};
use std::fmt;
use std::sync::Arc;
use tracing::info;

use crate::config::FeePayerConfig;
use crate::error::{EscrowError, Result};

/// What a signing authority is allowed to do, weakest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Capability {
    /// No key; holds are signed by the depositor's wallet
    None,
    /// Signs for simulation but never submits
    CanSignOnly,
    CanSignAndSend,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::None => "none",
            Capability::CanSignOnly => "sign_only",
            Capability::CanSignAndSend => "sign_and_send",
        }
    }
}

/// Fee payer key, loaded once and shared read-only.
#[derive(Clone)]
pub struct FeePayerSigner {
    keypair: Arc<Keypair>,
    submit_enabled: bool,
}

// Never print key material.
impl fmt::Debug for FeePayerSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeePayerSigner")
            .field("pubkey", &self.keypair.pubkey())
            .field("submit_enabled", &self.submit_enabled)
            .finish()
    }
}

impl FeePayerSigner {
    pub fn new(keypair: Keypair, submit_enabled: bool) -> Self {
        Self {
            keypair: Arc::new(keypair),
            submit_enabled,
        }
    }

    /// Loads the fee payer from the environment variable named in config.
    ///
    /// # Returns
    ///
    /// * `Ok(FeePayerSigner)` - Key loaded
    /// * `Err(anyhow::Error)` - Variable missing or not a valid secret key
    pub fn from_env(config: &FeePayerConfig) -> anyhow::Result<Self> {
        let secret = config.get_private_key()?;
        let keypair = parse_secret_key(&secret)
            .with_context(|| format!("Invalid fee payer key in '{}'", config.private_key_env))?;
        Ok(Self::new(keypair, config.submit_enabled))
    }

    pub fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    pub fn submit_enabled(&self) -> bool {
        self.submit_enabled
    }

    /// Signs `transaction` as its fee payer with `blockhash`.
    pub fn sign(&self, transaction: &mut Transaction, blockhash: Hash) -> Result<()> {
        transaction
            .try_sign(&[self.keypair.as_ref()], blockhash)
            .map_err(|e| EscrowError::Internal(format!("Fee payer signing failed: {}", e)))
    }
}

/// Parses a secret key given as a JSON byte array (`[12, 34, ...]`) or base58.
pub fn parse_secret_key(secret: &str) -> anyhow::Result<Keypair> {
    let trimmed = secret.trim();
    let bytes: Vec<u8> = if trimmed.starts_with('[') {
        serde_json::from_str(trimmed).context("Secret key is not a JSON byte array")?
    } else {
        bs58::decode(trimmed)
            .into_vec()
            .context("Secret key is neither a JSON byte array nor base58")?
    };
    Keypair::try_from(bytes.as_slice()).map_err(|e| anyhow::anyhow!("Invalid secret key bytes: {}", e))
}

/// Signer injected into the service.
#[derive(Debug, Clone)]
pub enum SigningAuthority {
    Null,
    FeePayer(FeePayerSigner),
}

impl SigningAuthority {
    /// Builds the authority from the optional `[fee_payer]` config section.
    pub fn from_config(config: Option<&FeePayerConfig>) -> anyhow::Result<Self> {
        match config {
            Some(fee_payer) => {
                let signer = FeePayerSigner::from_env(fee_payer)?;
                info!(
                    "Loaded fee payer {} (submit_enabled={})",
                    signer.pubkey(),
                    signer.submit_enabled()
                );
                Ok(SigningAuthority::FeePayer(signer))
            }
            None => {
                info!("No fee payer configured; release endpoints are unavailable");
                Ok(SigningAuthority::Null)
            }
        }
    }

    pub fn capability(&self) -> Capability {
        match self {
            SigningAuthority::Null => Capability::None,
            SigningAuthority::FeePayer(signer) if signer.submit_enabled => Capability::CanSignAndSend,
            SigningAuthority::FeePayer(_) => Capability::CanSignOnly,
        }
    }

    pub fn fee_payer(&self) -> Option<Pubkey> {
        match self {
            SigningAuthority::Null => None,
            SigningAuthority::FeePayer(signer) => Some(signer.pubkey()),
        }
    }

    /// Returns the signer if it has at least `needed`.
    ///
    /// # Returns
    ///
    /// * `Ok(&FeePayerSigner)` - Signer allowed to perform the operation
    /// * `Err(EscrowError::SigningUnavailable)` - Capability too weak
    pub fn require(&self, needed: Capability) -> Result<&FeePayerSigner> {
        match self {
            SigningAuthority::FeePayer(signer) if self.capability() >= needed => Ok(signer),
            _ => Err(EscrowError::SigningUnavailable(format!(
                "operation needs capability '{}', configured signer has '{}'",
                needed.as_str(),
                self.capability().as_str()
            ))),
        }
    }
}
