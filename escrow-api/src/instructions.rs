//! Instruction Schema and Encoding
//!
//! Single canonical description of the `timelock_escrow` program interface.
//! Each instruction lists its accounts positionally (the wire format carries
//! no names, so order is the contract) and its argument layout. Discriminators
//! and instruction data are derived from this schema and nowhere else.
//!
//! Encoding follows the Anchor convention: an 8-byte discriminator
//! (`sha256("global:<name>")[..8]`) followed by Borsh-serialized arguments.

use borsh::BorshSerialize;
use sha2::{Digest, Sha256};
use solana_sdk::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
};

use crate::derivation::{EscrowAddresses, ASSOCIATED_TOKEN_PROGRAM_ID, TOKEN_PROGRAM_ID};
use crate::error::{EscrowError, Result};

/// Version tag of the program interface described below.
pub const SCHEMA_VERSION: &str = "timelock_escrow-0.1.0";

const INSTRUCTION_NAMESPACE: &str = "global";
const ACCOUNT_NAMESPACE: &str = "account";

/// Discriminator length in bytes.
pub const DISCRIMINATOR_LEN: usize = 8;

// ============================================================================
// SCHEMA
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountDef {
    pub name: &'static str,
    pub signer: bool,
    pub writable: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    U64,
    I64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArgDef {
    pub name: &'static str,
    pub kind: ArgKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgValue {
    U64(u64),
    I64(i64),
}

impl ArgValue {
    fn kind(&self) -> ArgKind {
        match self {
            ArgValue::U64(_) => ArgKind::U64,
            ArgValue::I64(_) => ArgKind::I64,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstructionSchema {
    pub name: &'static str,
    pub accounts: &'static [AccountDef],
    pub args: &'static [ArgDef],
}

const fn account(name: &'static str, signer: bool, writable: bool) -> AccountDef {
    AccountDef { name, signer, writable }
}

/// Locks `amount` of the mint from the initializer into the escrow vault.
pub const HOLD: InstructionSchema = InstructionSchema {
    name: "initialize",
    accounts: &[
        account("initializer", true, true),
        account("beneficiary", false, false),
        account("mint", false, false),
        account("escrow", false, true),
        account("initializer_token_account", false, true),
        account("vault_token_account", false, true),
        account("token_program", false, false),
        account("associated_token_program", false, false),
        account("system_program", false, false),
    ],
    args: &[
        ArgDef { name: "amount", kind: ArgKind::U64 },
        ArgDef { name: "release_ts", kind: ArgKind::I64 },
    ],
};

/// Moves the whole vault balance to the beneficiary once the lock elapsed.
pub const RELEASE: InstructionSchema = InstructionSchema {
    name: "release",
    accounts: &[
        account("payer", true, true),
        account("beneficiary", false, false),
        account("mint", false, false),
        account("escrow", false, true),
        account("vault_token_account", false, true),
        account("beneficiary_token_account", false, true),
        account("token_program", false, false),
        account("associated_token_program", false, false),
        account("system_program", false, false),
    ],
    args: &[],
};

// ============================================================================
// DISCRIMINATORS
// ============================================================================

fn namespaced_discriminator(namespace: &str, name: &str) -> [u8; DISCRIMINATOR_LEN] {
    let digest = Sha256::digest(format!("{}:{}", namespace, name).as_bytes());
    let mut out = [0u8; DISCRIMINATOR_LEN];
    out.copy_from_slice(&digest[..DISCRIMINATOR_LEN]);
    out
}

/// Instruction discriminator: first 8 bytes of `sha256("global:<name>")`.
pub fn compute_discriminator(name: &str) -> [u8; DISCRIMINATOR_LEN] {
    namespaced_discriminator(INSTRUCTION_NAMESPACE, name)
}

/// Account discriminator: first 8 bytes of `sha256("account:<Name>")`.
pub fn compute_account_discriminator(name: &str) -> [u8; DISCRIMINATOR_LEN] {
    namespaced_discriminator(ACCOUNT_NAMESPACE, name)
}

// ============================================================================
// ENCODING
// ============================================================================

impl InstructionSchema {
    pub fn discriminator(&self) -> [u8; DISCRIMINATOR_LEN] {
        compute_discriminator(self.name)
    }

    /// Encodes discriminator followed by Borsh arguments, checking the values
    /// against the declared argument layout.
    pub fn encode(&self, values: &[ArgValue]) -> Result<Vec<u8>> {
        if values.len() != self.args.len() {
            return Err(EscrowError::Internal(format!(
                "{} expects {} arguments, got {}",
                self.name,
                self.args.len(),
                values.len()
            )));
        }

        let mut data = Vec::with_capacity(DISCRIMINATOR_LEN + 8 * values.len());
        data.extend_from_slice(&self.discriminator());

        for (def, value) in self.args.iter().zip(values) {
            if def.kind != value.kind() {
                return Err(EscrowError::Internal(format!(
                    "{}: argument {} expects {:?}, got {:?}",
                    self.name, def.name, def.kind, value
                )));
            }
            let written = match value {
                ArgValue::U64(v) => v.serialize(&mut data),
                ArgValue::I64(v) => v.serialize(&mut data),
            };
            written.map_err(|e| EscrowError::Internal(format!("{}: {}", def.name, e)))?;
        }

        Ok(data)
    }

    /// Pairs positional keys with the schema's signer/writable flags.
    pub fn account_metas(&self, keys: &[Pubkey]) -> Result<Vec<AccountMeta>> {
        if keys.len() != self.accounts.len() {
            return Err(EscrowError::Internal(format!(
                "{} expects {} accounts, got {}",
                self.name,
                self.accounts.len(),
                keys.len()
            )));
        }

        Ok(self
            .accounts
            .iter()
            .zip(keys)
            .map(|(def, key)| {
                if def.writable {
                    AccountMeta::new(*key, def.signer)
                } else {
                    AccountMeta::new_readonly(*key, def.signer)
                }
            })
            .collect())
    }

    pub fn build(&self, program_id: &Pubkey, keys: &[Pubkey], values: &[ArgValue]) -> Result<Instruction> {
        Ok(Instruction {
            program_id: *program_id,
            accounts: self.account_metas(keys)?,
            data: self.encode(values)?,
        })
    }
}

/// Hold instruction data: discriminator || amount (u64 LE) || release_ts (i64 LE).
pub fn encode_hold(amount: u64, release_ts: i64) -> Result<Vec<u8>> {
    HOLD.encode(&[ArgValue::U64(amount), ArgValue::I64(release_ts)])
}

/// Release instruction data: discriminator only.
pub fn encode_release() -> Result<Vec<u8>> {
    RELEASE.encode(&[])
}

/// Builds the hold (`initialize`) instruction.
pub fn hold_instruction(
    program_id: &Pubkey,
    initializer: &Pubkey,
    beneficiary: &Pubkey,
    mint: &Pubkey,
    addresses: &EscrowAddresses,
    amount: u64,
    release_ts: i64,
) -> Result<Instruction> {
    HOLD.build(
        program_id,
        &[
            *initializer,
            *beneficiary,
            *mint,
            addresses.escrow,
            addresses.initializer_token_account,
            addresses.vault,
            TOKEN_PROGRAM_ID,
            ASSOCIATED_TOKEN_PROGRAM_ID,
            solana_sdk::system_program::id(),
        ],
        &[ArgValue::U64(amount), ArgValue::I64(release_ts)],
    )
}

/// Builds the release instruction with `payer` as the signing fee payer.
pub fn release_instruction(
    program_id: &Pubkey,
    payer: &Pubkey,
    beneficiary: &Pubkey,
    mint: &Pubkey,
    addresses: &EscrowAddresses,
) -> Result<Instruction> {
    RELEASE.build(
        program_id,
        &[
            *payer,
            *beneficiary,
            *mint,
            addresses.escrow,
            addresses.vault,
            addresses.beneficiary_token_account,
            TOKEN_PROGRAM_ID,
            ASSOCIATED_TOKEN_PROGRAM_ID,
            solana_sdk::system_program::id(),
        ],
        &[],
    )
}

/// Associated-token program `CreateIdempotent` (a no-op when the account exists).
pub fn create_associated_token_account_idempotent(
    payer: &Pubkey,
    associated_account: &Pubkey,
    owner: &Pubkey,
    mint: &Pubkey,
) -> Instruction {
    Instruction {
        program_id: ASSOCIATED_TOKEN_PROGRAM_ID,
        accounts: vec![
            AccountMeta::new(*payer, true),
            AccountMeta::new(*associated_account, false),
            AccountMeta::new_readonly(*owner, false),
            AccountMeta::new_readonly(*mint, false),
            AccountMeta::new_readonly(solana_sdk::system_program::id(), false),
            AccountMeta::new_readonly(TOKEN_PROGRAM_ID, false),
        ],
        data: vec![1], // 1 = create_idempotent
    }
}
