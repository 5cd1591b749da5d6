//! Transaction Assembly
//!
//! Composes instructions into legacy transactions. Hold transactions are
//! returned unsigned for the depositor's wallet; release transactions are
//! signed by the service's fee payer.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chain_clients_svm::{encode_transaction, LatestBlockhash};
use serde::Serialize;
use solana_sdk::{message::Message, pubkey::Pubkey, transaction::Transaction};

use crate::derivation::{EscrowAddresses, EscrowSeeds};
use crate::error::{EscrowError, Result};
use crate::instructions::{
    create_associated_token_account_idempotent, hold_instruction, release_instruction,
};
use crate::preflight::ValidatedHold;
use crate::signing::FeePayerSigner;

/// Unsigned transaction plus the last block height its blockhash is valid for.
#[derive(Debug, Clone)]
pub struct UnsignedTransactionEnvelope {
    pub transaction: Transaction,
    pub last_valid_block_height: u64,
}

/// Wire form of [`UnsignedTransactionEnvelope`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvelopeResponse {
    /// Base64 legacy wire-format transaction
    pub tx: String,
    pub last_valid_block_height: u64,
}

impl UnsignedTransactionEnvelope {
    pub fn to_response(&self) -> Result<EnvelopeResponse> {
        Ok(EnvelopeResponse {
            tx: encode_transaction(&self.transaction)?,
            last_valid_block_height: self.last_valid_block_height,
        })
    }
}

/// Decodes a base64 legacy transaction (wallet round trip, tests).
pub fn decode_transaction(encoded: &str) -> Result<Transaction> {
    let bytes = STANDARD
        .decode(encoded)
        .map_err(|e| EscrowError::InvalidInput(format!("Invalid base64 transaction: {}", e)))?;
    bincode::deserialize(&bytes)
        .map_err(|e| EscrowError::InvalidInput(format!("Invalid transaction bytes: {}", e)))
}

/// Builds the unsigned hold transaction.
///
/// Instructions: idempotent creation of the escrow vault token account, then
/// the hold instruction. The initializer pays fees and is the only required
/// signer; its signature slot is left empty.
///
/// # Arguments
///
/// * `program_id` - Escrow program
/// * `hold` - Validated seeds and amount
/// * `addresses` - Addresses derived from `hold.seeds`
/// * `latest` - Blockhash to embed and its expiry height
pub fn assemble_hold(
    program_id: &Pubkey,
    hold: &ValidatedHold,
    addresses: &EscrowAddresses,
    latest: LatestBlockhash,
) -> Result<UnsignedTransactionEnvelope> {
    let seeds = &hold.seeds;
    let instructions = [
        create_associated_token_account_idempotent(
            &seeds.initializer,
            &addresses.vault,
            &addresses.escrow,
            &seeds.mint,
        ),
        hold_instruction(
            program_id,
            &seeds.initializer,
            &seeds.beneficiary,
            &seeds.mint,
            addresses,
            hold.amount,
            seeds.release_ts,
        )?,
    ];

    let message =
        Message::new_with_blockhash(&instructions, Some(&seeds.initializer), &latest.blockhash);

    Ok(UnsignedTransactionEnvelope {
        transaction: Transaction::new_unsigned(message),
        last_valid_block_height: latest.last_valid_block_height,
    })
}

/// Builds and signs the release transaction with the service as fee payer.
pub fn assemble_release(
    program_id: &Pubkey,
    seeds: &EscrowSeeds,
    addresses: &EscrowAddresses,
    signer: &FeePayerSigner,
    latest: LatestBlockhash,
) -> Result<Transaction> {
    let payer = signer.pubkey();
    let instruction = release_instruction(
        program_id,
        &payer,
        &seeds.beneficiary,
        &seeds.mint,
        addresses,
    )?;

    let message = Message::new_with_blockhash(&[instruction], Some(&payer), &latest.blockhash);
    let mut transaction = Transaction::new_unsigned(message);
    signer.sign(&mut transaction, latest.blockhash)?;
    Ok(transaction)
}
