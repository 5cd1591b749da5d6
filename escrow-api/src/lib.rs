//! Timelock Escrow API Library
//!
//! Builds, validates, and submits transactions for a time-locked token escrow
//! program on Solana. Holds are returned unsigned for the depositor's wallet;
//! releases are signed by the service's fee payer and submitted.

pub mod accounts;
pub mod amount;
pub mod api;
pub mod assembler;
pub mod config;
pub mod derivation;
pub mod error;
pub mod gateway;
pub mod instructions;
pub mod preflight;
pub mod service;
pub mod signing;

// Re-export commonly used types
pub use config::{ApiConfig, Config, EscrowConfig, FeePayerConfig, LedgerConfig};
pub use error::EscrowError;
pub use service::{EscrowService, EscrowState, EscrowStatus};
pub use signing::{Capability, FeePayerSigner, SigningAuthority};
