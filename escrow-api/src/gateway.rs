//! Submission Gateway
//!
//! Submits signed transactions, waits for the configured commitment, and
//! classifies ledger rejections into caller-meaningful error kinds.

use chain_clients_svm::{Commitment, RpcError, SvmRpcClient};
use solana_sdk::{signature::Signature, transaction::Transaction};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::error::{EscrowError, Result};

/// Anchor error name the program logs when the lock has not elapsed.
const TIMELOCK_NOT_REACHED: &str = "TimelockNotReached";
/// Custom program error code for `TimelockNotReached` (6000).
const TIMELOCK_NOT_REACHED_CODE: &str = "custom program error: 0x1770";

/// Confirmation parameters.
#[derive(Debug, Clone, Copy)]
pub struct ConfirmSettings {
    pub commitment: Commitment,
    pub timeout: Duration,
    pub poll_interval: Duration,
}

pub struct SubmissionGateway {
    client: Arc<SvmRpcClient>,
    settings: ConfirmSettings,
}

impl SubmissionGateway {
    pub fn new(client: Arc<SvmRpcClient>, settings: ConfirmSettings) -> Self {
        Self { client, settings }
    }

    /// Submits a signed transaction and waits until it reaches the configured commitment.
    ///
    /// # Arguments
    ///
    /// * `transaction` - Fully signed transaction
    /// * `last_valid_block_height` - Expiry height of the transaction's blockhash
    ///
    /// # Returns
    ///
    /// * `Ok(Signature)` - Transaction confirmed
    /// * `Err(EscrowError::NotYetUnlockable | SigningDeclined | BlockhashExpired | SubmissionRejected)` - Ledger refused it
    /// * `Err(EscrowError::NetworkFailure)` - RPC unreachable or timed out
    /// * `Err(EscrowError::Timeout)` - No confirmation within the horizon
    pub async fn submit_and_confirm(
        &self,
        transaction: &Transaction,
        last_valid_block_height: u64,
    ) -> Result<Signature> {
        let signature = self
            .client
            .send_transaction(transaction, self.settings.commitment)
            .await
            .map_err(classify_rpc_error)?;

        info!("Submitted transaction {}", signature);
        self.confirm(&signature, last_valid_block_height).await?;
        info!(
            "Transaction {} reached {} commitment",
            signature, self.settings.commitment
        );
        Ok(signature)
    }

    /// Polls signature status until the target commitment, an execution
    /// error, blockhash expiry, or the confirmation timeout.
    async fn confirm(&self, signature: &Signature, last_valid_block_height: u64) -> Result<()> {
        let deadline = Instant::now() + self.settings.timeout;

        loop {
            match self.client.get_signature_status(signature).await {
                Ok(Some(status)) => {
                    if let Some(err) = status.err {
                        let message = err.to_string();
                        warn!("Transaction {} failed on chain: {}", signature, message);
                        let logs = self.execution_logs(signature).await;
                        return Err(classify_message(message, logs));
                    }
                    if status.satisfies(self.settings.commitment) {
                        return Ok(());
                    }
                    debug!(
                        "Transaction {} at {:?}, waiting for {}",
                        signature, status.confirmation_status, self.settings.commitment
                    );
                }
                Ok(None) => {
                    debug!("Transaction {} not yet visible", signature);
                    if self.blockhash_expired(last_valid_block_height).await {
                        return Err(EscrowError::BlockhashExpired {
                            message: format!(
                                "transaction {} not seen before block height {}",
                                signature, last_valid_block_height
                            ),
                            logs: Vec::new(),
                        });
                    }
                }
                // A single failed poll is not fatal; the deadline bounds retries.
                Err(e) => warn!("Status poll for {} failed: {}", signature, e),
            }

            if Instant::now() + self.settings.poll_interval > deadline {
                return Err(EscrowError::Timeout(format!(
                    "transaction {} not {} within {}ms",
                    signature,
                    self.settings.commitment,
                    self.settings.timeout.as_millis()
                )));
            }
            tokio::time::sleep(self.settings.poll_interval).await;
        }
    }

    /// Whether the ledger has moved past the blockhash's last valid height.
    /// A failed height lookup counts as not expired.
    async fn blockhash_expired(&self, last_valid_block_height: u64) -> bool {
        match self.client.get_block_height(self.settings.commitment).await {
            Ok(height) => height > last_valid_block_height,
            Err(e) => {
                debug!("Block height lookup failed: {}", e);
                false
            }
        }
    }

    /// Execution log of a landed transaction; empty when the node has none.
    async fn execution_logs(&self, signature: &Signature) -> Vec<String> {
        match self
            .client
            .get_transaction_logs(signature, self.settings.commitment)
            .await
        {
            Ok(logs) => logs.unwrap_or_default(),
            Err(e) => {
                warn!("Could not fetch logs for {}: {}", signature, e);
                Vec::new()
            }
        }
    }

    /// Simulates a transaction and returns its execution log.
    ///
    /// Diagnostic only: a clean simulation does not guarantee the real
    /// submission succeeds.
    pub async fn simulate_only(&self, transaction: &Transaction) -> Result<Vec<String>> {
        let result = self
            .client
            .simulate_transaction(transaction, self.settings.commitment)
            .await?;

        let logs = result.logs.unwrap_or_default();
        match result.err {
            Some(err) => Err(classify_message(err.to_string(), logs)),
            None => Ok(logs),
        }
    }
}

/// Maps a `sendTransaction` failure onto the error taxonomy.
pub fn classify_rpc_error(error: RpcError) -> EscrowError {
    match error {
        RpcError::Rpc { message, logs, .. } => classify_message(message, logs),
        RpcError::Encoding(message) => EscrowError::Internal(message),
        other => EscrowError::NetworkFailure(other.to_string()),
    }
}

/// Classifies a ledger rejection by its message and execution log.
pub fn classify_message(message: String, logs: Vec<String>) -> EscrowError {
    let timelock = message.contains(TIMELOCK_NOT_REACHED_CODE)
        || message.contains(TIMELOCK_NOT_REACHED)
        || logs.iter().any(|line| line.contains(TIMELOCK_NOT_REACHED))
        // Structured err from status/simulation: {"InstructionError":[i,{"Custom":6000}]}
        || message.contains("\"Custom\":6000");

    if timelock {
        EscrowError::NotYetUnlockable { message, logs }
    } else if message.contains("Blockhash not found") || message.contains("BlockhashNotFound") {
        EscrowError::BlockhashExpired { message, logs }
    } else if message.to_lowercase().contains("signature verification fail")
        || message.contains("SignatureFailure")
        || message.contains("MissingRequiredSignature")
    {
        EscrowError::SigningDeclined { message, logs }
    } else {
        EscrowError::SubmissionRejected { message, logs }
    }
}
