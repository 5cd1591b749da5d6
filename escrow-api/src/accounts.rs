//! On-chain account layouts
//!
//! Borsh views over the two account types the service reads: SPL token
//! accounts (funding checks, vault balance) and the program's `Escrow`
//! account (status lookups).

use borsh::{BorshDeserialize, BorshSerialize};
use solana_sdk::pubkey::Pubkey;

use crate::error::{EscrowError, Result};
use crate::instructions::{compute_account_discriminator, DISCRIMINATOR_LEN};

/// Packed size of an SPL token account.
pub const TOKEN_ACCOUNT_LEN: usize = 165;

/// Leading fields of an SPL token account. The remaining fields (delegate,
/// state, close authority) are not needed here.
#[derive(BorshDeserialize, BorshSerialize, Debug, Clone, PartialEq, Eq)]
pub struct TokenAccountHead {
    pub mint: [u8; 32],
    pub owner: [u8; 32],
    pub amount: u64,
}

impl TokenAccountHead {
    pub fn mint(&self) -> Pubkey {
        Pubkey::new_from_array(self.mint)
    }

    pub fn owner(&self) -> Pubkey {
        Pubkey::new_from_array(self.owner)
    }
}

/// Parses the head of an SPL token account.
pub fn parse_token_account(address: &Pubkey, data: &[u8]) -> Result<TokenAccountHead> {
    if data.len() < TOKEN_ACCOUNT_LEN {
        return Err(EscrowError::InvalidInput(format!(
            "Account {} is not a token account ({} bytes)",
            address,
            data.len()
        )));
    }
    TokenAccountHead::deserialize(&mut &data[..]).map_err(|e| {
        EscrowError::InvalidInput(format!("Account {} is not a token account: {}", address, e))
    })
}

/// `Escrow` account fields following the 8-byte account discriminator.
#[derive(BorshDeserialize, BorshSerialize, Debug, Clone, PartialEq, Eq)]
pub struct EscrowAccount {
    pub initializer: [u8; 32],
    pub beneficiary: [u8; 32],
    pub mint: [u8; 32],
    pub release_ts: i64,
    pub bump: u8,
}

impl EscrowAccount {
    pub const NAME: &'static str = "Escrow";

    /// Serializes with the account discriminator prefix, as stored on chain.
    pub fn to_account_data(&self) -> Result<Vec<u8>> {
        let mut data = compute_account_discriminator(Self::NAME).to_vec();
        self.serialize(&mut data)
            .map_err(|e| EscrowError::Internal(format!("escrow account encoding: {}", e)))?;
        Ok(data)
    }
}

/// Parses an `Escrow` account, checking the discriminator.
pub fn parse_escrow_account(address: &Pubkey, data: &[u8]) -> Result<EscrowAccount> {
    if data.len() < DISCRIMINATOR_LEN
        || data[..DISCRIMINATOR_LEN] != compute_account_discriminator(EscrowAccount::NAME)
    {
        return Err(EscrowError::Internal(format!(
            "Account {} is not an escrow account",
            address
        )));
    }
    EscrowAccount::deserialize(&mut &data[DISCRIMINATOR_LEN..]).map_err(|e| {
        EscrowError::Internal(format!("Failed to parse escrow account {}: {}", address, e))
    })
}
