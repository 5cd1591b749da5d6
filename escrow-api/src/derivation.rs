//! Address Derivation
//!
//! Pure functions that map escrow seeds to the program-derived escrow address
//! and the associated token accounts around it. Seed layout must match the
//! external program byte for byte:
//!
//! `b"escrow" || initializer || beneficiary || mint || release_ts (i64 LE)`

use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;

use crate::error::{EscrowError, Result};

/// Fixed textual prefix of the escrow seeds.
pub const ESCROW_SEED_PREFIX: &[u8] = b"escrow";

/// SPL Token program.
pub const TOKEN_PROGRAM_ID: Pubkey = solana_sdk::pubkey!("TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA");

/// SPL Associated Token Account program.
pub const ASSOCIATED_TOKEN_PROGRAM_ID: Pubkey =
    solana_sdk::pubkey!("ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL");

/// The four values identifying one escrow agreement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EscrowSeeds {
    pub initializer: Pubkey,
    pub beneficiary: Pubkey,
    pub mint: Pubkey,
    pub release_ts: i64,
}

/// Every address a hold or release touches, derived from one set of seeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EscrowAddresses {
    pub escrow: Pubkey,
    pub bump: u8,
    /// Token account owned by the escrow PDA
    pub vault: Pubkey,
    pub initializer_token_account: Pubkey,
    pub beneficiary_token_account: Pubkey,
}

/// Parses a base58 address from a request field.
///
/// # Arguments
///
/// * `field` - Field name, used in the error message
/// * `value` - Base58-encoded public key
///
/// # Returns
///
/// * `Ok(Pubkey)` - Parsed address
/// * `Err(EscrowError::InvalidInput)` - Empty or malformed value
pub fn parse_address(field: &str, value: &str) -> Result<Pubkey> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EscrowError::InvalidInput(format!("Missing field: {}", field)));
    }
    Pubkey::from_str(trimmed).map_err(|e| {
        EscrowError::InvalidInput(format!("Invalid {} address '{}': {}", field, trimmed, e))
    })
}

/// Derives the escrow PDA and its bump with the ledger's canonical bump search.
///
/// # Returns
///
/// * `Ok((Pubkey, u8))` - Escrow address and bump
/// * `Err(EscrowError::DerivationFailed)` - No off-curve address for any bump
pub fn derive_escrow_address(
    initializer: &Pubkey,
    beneficiary: &Pubkey,
    mint: &Pubkey,
    release_ts: i64,
    program_id: &Pubkey,
) -> Result<(Pubkey, u8)> {
    let release_ts_bytes = release_ts.to_le_bytes();
    Pubkey::try_find_program_address(
        &[
            ESCROW_SEED_PREFIX,
            initializer.as_ref(),
            beneficiary.as_ref(),
            mint.as_ref(),
            &release_ts_bytes,
        ],
        program_id,
    )
    .ok_or_else(|| {
        EscrowError::DerivationFailed(format!(
            "no valid bump for escrow seeds (initializer={}, beneficiary={}, mint={}, release_ts={})",
            initializer, beneficiary, mint, release_ts
        ))
    })
}

/// Derives the associated token account for `owner` and `mint`.
///
/// `allow_off_curve_owner` must be true when the owner is itself a derived
/// address (the escrow vault). Wallet owners are expected to be on-curve; an
/// off-curve wallet owner is rejected as invalid input.
pub fn derive_associated_address(
    owner: &Pubkey,
    mint: &Pubkey,
    allow_off_curve_owner: bool,
) -> Result<Pubkey> {
    if !allow_off_curve_owner && !owner.is_on_curve() {
        return Err(EscrowError::InvalidInput(format!(
            "Owner {} is not a wallet address (off-curve)",
            owner
        )));
    }

    Pubkey::try_find_program_address(
        &[owner.as_ref(), TOKEN_PROGRAM_ID.as_ref(), mint.as_ref()],
        &ASSOCIATED_TOKEN_PROGRAM_ID,
    )
    .map(|(address, _)| address)
    .ok_or_else(|| {
        EscrowError::DerivationFailed(format!(
            "no valid bump for associated token account (owner={}, mint={})",
            owner, mint
        ))
    })
}

/// Derives the escrow PDA, its vault, and both parties' token accounts.
pub fn derive_escrow_addresses(seeds: &EscrowSeeds, program_id: &Pubkey) -> Result<EscrowAddresses> {
    let (escrow, bump) = derive_escrow_address(
        &seeds.initializer,
        &seeds.beneficiary,
        &seeds.mint,
        seeds.release_ts,
        program_id,
    )?;

    Ok(EscrowAddresses {
        escrow,
        bump,
        vault: derive_associated_address(&escrow, &seeds.mint, true)?,
        initializer_token_account: derive_associated_address(&seeds.initializer, &seeds.mint, false)?,
        beneficiary_token_account: derive_associated_address(&seeds.beneficiary, &seeds.mint, false)?,
    })
}
