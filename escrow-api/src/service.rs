//! Escrow Service
//!
//! Per-request orchestration: validate, derive, assemble, and (for release)
//! sign and submit. The service is stateless; every address is re-derived
//! from the request's seeds.

use chain_clients_svm::{Commitment, SvmRpcClient};
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use std::sync::Arc;
use tracing::info;

use crate::accounts::{parse_escrow_account, parse_token_account};
use crate::amount::format_base_units;
use crate::assembler::{assemble_hold, assemble_release, EnvelopeResponse};
use crate::config::Config;
use crate::derivation::{derive_escrow_addresses, EscrowAddresses, EscrowSeeds};
use crate::error::Result;
use crate::gateway::{ConfirmSettings, SubmissionGateway};
use crate::preflight::{validate_hold, validate_release, HoldRequest, ReleaseRequest, TokenSettings};
use crate::signing::{Capability, SigningAuthority};

/// Hold blockhashes are fetched at `finalized` so the wallet has the full
/// validity window to sign.
const HOLD_BLOCKHASH_COMMITMENT: Commitment = Commitment::Finalized;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmittedTransaction {
    pub signature: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationResponse {
    pub logs: Vec<String>,
}

/// Lifecycle state of one escrow as observed on the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EscrowState {
    Uninitialized,
    Held,
    Released,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EscrowStatus {
    pub escrow: String,
    pub vault: String,
    pub state: EscrowState,
    pub release_ts: i64,
    pub unlockable: bool,
    /// Base units, as a decimal string
    pub vault_balance: String,
    pub ui_vault_balance: String,
}

pub struct EscrowService {
    client: Arc<SvmRpcClient>,
    gateway: SubmissionGateway,
    signer: SigningAuthority,
    program_id: Pubkey,
    token: TokenSettings,
    commitment: Commitment,
}

impl EscrowService {
    /// Creates the service from validated configuration and an injected signer.
    pub fn new(config: &Config, signer: SigningAuthority) -> anyhow::Result<Self> {
        let client = Arc::new(SvmRpcClient::new(
            &config.ledger.rpc_url,
            config.ledger.rpc_timeout(),
        )?);
        let gateway = SubmissionGateway::new(
            client.clone(),
            ConfirmSettings {
                commitment: config.ledger.commitment,
                timeout: config.ledger.confirm_timeout(),
                poll_interval: config.ledger.confirm_poll_interval(),
            },
        );

        Ok(Self {
            client,
            gateway,
            signer,
            program_id: config.escrow.program_id()?,
            token: TokenSettings {
                mint: config.escrow.token_mint()?,
                decimals: config.escrow.token_decimals,
            },
            commitment: config.ledger.commitment,
        })
    }

    pub fn fee_payer(&self) -> Option<Pubkey> {
        self.signer.fee_payer()
    }

    pub fn capability(&self) -> Capability {
        self.signer.capability()
    }

    fn derive(&self, seeds: &EscrowSeeds) -> Result<EscrowAddresses> {
        derive_escrow_addresses(seeds, &self.program_id)
    }

    /// Builds an unsigned hold transaction for the initializer to sign.
    pub async fn hold(&self, request: &HoldRequest) -> Result<EnvelopeResponse> {
        let now = chrono::Utc::now().timestamp();
        let validated =
            validate_hold(request, &self.token, now, &self.client, self.commitment).await?;
        let addresses = self.derive(&validated.seeds)?;

        let latest = self
            .client
            .get_latest_blockhash(HOLD_BLOCKHASH_COMMITMENT)
            .await?;
        let envelope = assemble_hold(&self.program_id, &validated, &addresses, latest)?;

        info!(
            "Built hold: escrow={} initializer={} amount={} release_ts={}",
            addresses.escrow, validated.seeds.initializer, validated.amount, validated.seeds.release_ts
        );
        envelope.to_response()
    }

    /// Signs a release as fee payer, submits it, and waits for confirmation.
    pub async fn release(&self, request: &ReleaseRequest) -> Result<SubmittedTransaction> {
        let seeds = validate_release(request, &self.token.mint)?;
        let addresses = self.derive(&seeds)?;
        let signer = self.signer.require(Capability::CanSignAndSend)?;

        let latest = self.client.get_latest_blockhash(self.commitment).await?;
        let transaction = assemble_release(&self.program_id, &seeds, &addresses, signer, latest)?;

        info!("Submitting release for escrow {}", addresses.escrow);
        let signature = self
            .gateway
            .submit_and_confirm(&transaction, latest.last_valid_block_height)
            .await?;
        Ok(SubmittedTransaction {
            signature: signature.to_string(),
        })
    }

    /// Signs a release and simulates it without submitting.
    pub async fn simulate_release(&self, request: &ReleaseRequest) -> Result<SimulationResponse> {
        let seeds = validate_release(request, &self.token.mint)?;
        let addresses = self.derive(&seeds)?;
        let signer = self.signer.require(Capability::CanSignOnly)?;

        let latest = self.client.get_latest_blockhash(self.commitment).await?;
        let transaction = assemble_release(&self.program_id, &seeds, &addresses, signer, latest)?;

        let logs = self.gateway.simulate_only(&transaction).await?;
        Ok(SimulationResponse { logs })
    }

    /// Reports the ledger state of the escrow identified by the given seeds.
    pub async fn escrow_status(&self, request: &ReleaseRequest) -> Result<EscrowStatus> {
        let seeds = validate_release(request, &self.token.mint)?;
        self.escrow_status_at(&seeds, chrono::Utc::now().timestamp())
            .await
    }

    async fn escrow_status_at(&self, seeds: &EscrowSeeds, now: i64) -> Result<EscrowStatus> {
        let addresses = self.derive(seeds)?;

        let escrow_data = self
            .client
            .get_account_data(&addresses.escrow, self.commitment)
            .await?;

        let (state, balance) = match escrow_data {
            None => (EscrowState::Uninitialized, 0),
            Some(data) => {
                parse_escrow_account(&addresses.escrow, &data)?;
                let vault = self
                    .client
                    .get_account_data(&addresses.vault, self.commitment)
                    .await?;
                match vault {
                    None => (EscrowState::Released, 0),
                    Some(vault_data) => {
                        let amount = parse_token_account(&addresses.vault, &vault_data)?.amount;
                        if amount > 0 {
                            (EscrowState::Held, amount)
                        } else {
                            (EscrowState::Released, 0)
                        }
                    }
                }
            }
        };

        Ok(EscrowStatus {
            escrow: addresses.escrow.to_string(),
            vault: addresses.vault.to_string(),
            state,
            release_ts: seeds.release_ts,
            unlockable: now >= seeds.release_ts,
            vault_balance: balance.to_string(),
            ui_vault_balance: format_base_units(balance, self.token.decimals),
        })
    }
}
