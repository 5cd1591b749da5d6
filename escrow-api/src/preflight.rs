//! Preflight Validation
//!
//! Checks a request before any transaction is built. Field checks and the
//! release-time check run locally and before any network call; the funding
//! check reads the initializer's token account from the ledger.

use chain_clients_svm::{Commitment, SvmRpcClient};
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use tracing::debug;

use crate::accounts::parse_token_account;
use crate::amount::{parse_base_units, ui_to_base_units};
use crate::derivation::{derive_associated_address, parse_address, EscrowSeeds};
use crate::error::{EscrowError, Result};

// ============================================================================
// REQUEST TYPES
// ============================================================================

/// Body of `POST /hold`.
///
/// Exactly one of `amount` (base units) and `ui_amount` (human decimal) must
/// be present.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldRequest {
    #[serde(default)]
    pub initializer: String,
    #[serde(default)]
    pub beneficiary: String,
    #[serde(default)]
    pub amount: Option<String>,
    #[serde(default)]
    pub ui_amount: Option<String>,
    #[serde(default)]
    pub release_ts: Option<i64>,
}

/// Body of `POST /release` and `POST /release/simulate`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseRequest {
    #[serde(default)]
    pub initializer: String,
    #[serde(default)]
    pub beneficiary: String,
    #[serde(default)]
    pub release_ts: Option<i64>,
}

/// A hold request that passed every local check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidatedHold {
    pub seeds: EscrowSeeds,
    pub amount: u64,
}

/// Token settings the validator needs.
#[derive(Debug, Clone, Copy)]
pub struct TokenSettings {
    pub mint: Pubkey,
    pub decimals: u8,
}

// ============================================================================
// LOCAL CHECKS
// ============================================================================

/// Parses a party address; both parties must be wallets (on-curve keys)
/// since their token accounts are associated accounts.
fn parse_wallet(field: &str, value: &str) -> Result<Pubkey> {
    let address = parse_address(field, value)?;
    if !address.is_on_curve() {
        return Err(EscrowError::InvalidInput(format!(
            "Invalid {} address '{}': not a wallet address (off-curve)",
            field, address
        )));
    }
    Ok(address)
}

fn require_release_ts(release_ts: Option<i64>) -> Result<i64> {
    release_ts.ok_or_else(|| EscrowError::InvalidInput("Missing field: releaseTs".to_string()))
}

fn resolve_amount(request: &HoldRequest, decimals: u8) -> Result<u64> {
    let amount = match (request.amount.as_deref(), request.ui_amount.as_deref()) {
        (Some(base), None) => parse_base_units("amount", base)?,
        (None, Some(ui)) => ui_to_base_units(ui, decimals)?,
        (Some(_), Some(_)) => {
            return Err(EscrowError::InvalidInput(
                "Provide either amount or uiAmount, not both".to_string(),
            ))
        }
        (None, None) => {
            return Err(EscrowError::InvalidInput("Missing field: amount".to_string()))
        }
    };

    if amount == 0 {
        return Err(EscrowError::InvalidInput(
            "Invalid amount: must be greater than zero".to_string(),
        ));
    }
    Ok(amount)
}

/// Runs every hold check that needs no network access.
///
/// # Arguments
///
/// * `request` - Raw hold request
/// * `token` - Configured mint and decimals
/// * `now` - Current unix time in seconds
///
/// # Returns
///
/// * `Ok(ValidatedHold)` - Parsed seeds and base-unit amount
/// * `Err(EscrowError::InvalidInput)` - Missing or malformed field, off-curve party, or releaseTs not in the future
pub fn check_hold_request(request: &HoldRequest, token: &TokenSettings, now: i64) -> Result<ValidatedHold> {
    let initializer = parse_wallet("initializer", &request.initializer)?;
    let beneficiary = parse_wallet("beneficiary", &request.beneficiary)?;
    let amount = resolve_amount(request, token.decimals)?;
    let release_ts = require_release_ts(request.release_ts)?;

    if release_ts <= now {
        return Err(EscrowError::InvalidInput(format!(
            "releaseTs {} must be in the future (now: {})",
            release_ts, now
        )));
    }

    Ok(ValidatedHold {
        seeds: EscrowSeeds {
            initializer,
            beneficiary,
            mint: token.mint,
            release_ts,
        },
        amount,
    })
}

/// Field checks for release. The time lock is enforced by the program, not here.
pub fn validate_release(request: &ReleaseRequest, mint: &Pubkey) -> Result<EscrowSeeds> {
    Ok(EscrowSeeds {
        initializer: parse_wallet("initializer", &request.initializer)?,
        beneficiary: parse_wallet("beneficiary", &request.beneficiary)?,
        mint: *mint,
        release_ts: require_release_ts(request.release_ts)?,
    })
}

// ============================================================================
// FUNDING CHECK
// ============================================================================

/// Checks that `owner`'s token account exists, holds `mint`, and has at least
/// `required` base units.
///
/// # Returns
///
/// * `Ok(u64)` - Available balance
/// * `Err(EscrowError::AccountNotFunded)` - Token account missing
/// * `Err(EscrowError::InsufficientBalance)` - Balance below `required`
/// * `Err(EscrowError::InvalidInput)` - Account holds a different mint or has another owner
/// * `Err(EscrowError::NetworkFailure)` - RPC failure
pub async fn check_source_funding(
    client: &SvmRpcClient,
    owner: &Pubkey,
    mint: &Pubkey,
    required: u64,
    commitment: Commitment,
) -> Result<u64> {
    let token_account = derive_associated_address(owner, mint, false)?;
    let data = client
        .get_account_data(&token_account, commitment)
        .await?
        .ok_or_else(|| EscrowError::AccountNotFunded {
            account: token_account.to_string(),
        })?;

    let account = parse_token_account(&token_account, &data)?;
    if account.owner() != *owner {
        return Err(EscrowError::InvalidInput(format!(
            "Token account {} is owned by {}, expected {}",
            token_account,
            account.owner(),
            owner
        )));
    }
    if account.mint() != *mint {
        return Err(EscrowError::InvalidInput(format!(
            "Token account {} holds mint {}, expected {}",
            token_account,
            account.mint(),
            mint
        )));
    }

    debug!(
        "Token account {} balance {} (required {})",
        token_account, account.amount, required
    );

    if account.amount < required {
        return Err(EscrowError::InsufficientBalance {
            available: account.amount,
            required,
        });
    }
    Ok(account.amount)
}

/// Full hold validation: local checks first, then the funding lookup.
pub async fn validate_hold(
    request: &HoldRequest,
    token: &TokenSettings,
    now: i64,
    client: &SvmRpcClient,
    commitment: Commitment,
) -> Result<ValidatedHold> {
    let validated = check_hold_request(request, token, now)?;
    check_source_funding(
        client,
        &validated.seeds.initializer,
        &token.mint,
        validated.amount,
        commitment,
    )
    .await?;
    Ok(validated)
}
