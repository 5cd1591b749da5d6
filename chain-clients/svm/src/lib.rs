//! Solana SVM JSON-RPC Client
//!
//! Async client for the handful of Solana JSON-RPC methods the escrow service
//! relies on: blockhash and block height lookups, raw account reads,
//! transaction simulation, submission, signature status polling, and
//! execution log lookups.
//!
//! Every call is bounded by the configured request timeout so that one slow
//! RPC cannot stall unrelated callers. Failures are reported as [`RpcError`]
//! so callers can tell transport problems apart from ledger-level rejections.

use anyhow::Context;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use solana_sdk::{hash::Hash, pubkey::Pubkey, signature::Signature, transaction::Transaction};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

// ============================================================================
// ERRORS
// ============================================================================

/// Failure modes of a single JSON-RPC call.
#[derive(Debug, Error)]
pub enum RpcError {
    /// The endpoint could not be reached or the connection broke.
    #[error("Failed to reach RPC endpoint for {method}: {message}")]
    Transport { method: String, message: String },

    /// No response arrived within the request timeout.
    #[error("Timed out after {timeout_ms}ms waiting for {method}")]
    Timeout { method: String, timeout_ms: u64 },

    /// The node answered with a JSON-RPC error object.
    #[error("JSON-RPC error from {method}: {message} (code: {code})")]
    Rpc {
        method: String,
        code: i64,
        message: String,
        /// Program logs attached to preflight failures, if any
        logs: Vec<String>,
    },

    /// The response could not be decoded.
    #[error("Malformed {method} response: {message}")]
    Malformed { method: String, message: String },

    #[error("Failed to encode transaction: {0}")]
    Encoding(String),
}

// ============================================================================
// COMMITMENT
// ============================================================================

/// Ledger commitment level, ordered from weakest to strongest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Commitment {
    Processed,
    Confirmed,
    Finalized,
}

impl Commitment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Commitment::Processed => "processed",
            Commitment::Confirmed => "confirmed",
            Commitment::Finalized => "finalized",
        }
    }
}

impl fmt::Display for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Commitment {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s {
            "processed" => Ok(Commitment::Processed),
            "confirmed" => Ok(Commitment::Confirmed),
            "finalized" => Ok(Commitment::Finalized),
            other => anyhow::bail!("Unknown commitment level: {}", other),
        }
    }
}

// ============================================================================
// JSON-RPC TYPES
// ============================================================================

#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    method: &'a str,
    params: serde_json::Value,
    id: u64,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    result: Option<serde_json::Value>,
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct RpcContextual<T> {
    value: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BlockhashValue {
    blockhash: String,
    last_valid_block_height: u64,
}

#[derive(Debug, Deserialize)]
struct RpcAccount {
    data: (String, String),
}

#[derive(Debug, Deserialize)]
struct RpcConfirmedTransaction {
    #[serde(default)]
    meta: Option<RpcTransactionMeta>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcTransactionMeta {
    #[serde(default)]
    log_messages: Option<Vec<String>>,
}

/// Latest blockhash together with the last block height at which it is valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatestBlockhash {
    pub blockhash: Hash,
    pub last_valid_block_height: u64,
}

/// Status entry from `getSignatureStatuses`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureStatus {
    pub slot: u64,
    pub confirmations: Option<u64>,
    pub err: Option<serde_json::Value>,
    pub confirmation_status: Option<String>,
}

impl SignatureStatus {
    /// Whether the transaction has reached at least `commitment`.
    ///
    /// Nodes that omit `confirmationStatus` report `confirmations: null` for
    /// rooted (finalized) transactions.
    pub fn satisfies(&self, commitment: Commitment) -> bool {
        let reached = match self.confirmation_status.as_deref() {
            Some(status) => match Commitment::from_str(status) {
                Ok(level) => level,
                Err(_) => return false,
            },
            None if self.confirmations.is_none() => Commitment::Finalized,
            None => Commitment::Processed,
        };
        reached >= commitment
    }
}

/// Result of `simulateTransaction`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationResult {
    pub err: Option<serde_json::Value>,
    #[serde(default)]
    pub logs: Option<Vec<String>>,
    #[serde(default)]
    pub units_consumed: Option<u64>,
}

// ============================================================================
// CLIENT
// ============================================================================

/// Async Solana JSON-RPC client. Cheap to share behind an `Arc`; the inner
/// reqwest client pools connections and is safe for concurrent use.
pub struct SvmRpcClient {
    client: Client,
    rpc_url: String,
    request_timeout: Duration,
}

impl SvmRpcClient {
    /// Creates a new client.
    ///
    /// # Arguments
    ///
    /// * `rpc_url` - JSON-RPC endpoint URL
    /// * `request_timeout` - Upper bound for each individual call
    ///
    /// # Returns
    ///
    /// * `Ok(SvmRpcClient)` - Initialized client
    /// * `Err(anyhow::Error)` - HTTP client could not be built
    pub fn new(rpc_url: &str, request_timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(request_timeout)
            .no_proxy()
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            rpc_url: rpc_url.to_string(),
            request_timeout,
        })
    }

    /// Fetches the latest blockhash and its expiry height.
    pub async fn get_latest_blockhash(
        &self,
        commitment: Commitment,
    ) -> Result<LatestBlockhash, RpcError> {
        let method = "getLatestBlockhash";
        let response: RpcContextual<BlockhashValue> = self
            .call(method, serde_json::json!([{ "commitment": commitment.as_str() }]))
            .await?;

        let blockhash = Hash::from_str(&response.value.blockhash).map_err(|e| {
            RpcError::Malformed {
                method: method.to_string(),
                message: format!("invalid blockhash {}: {}", response.value.blockhash, e),
            }
        })?;

        Ok(LatestBlockhash {
            blockhash,
            last_valid_block_height: response.value.last_valid_block_height,
        })
    }

    /// Current block height at the given commitment.
    pub async fn get_block_height(&self, commitment: Commitment) -> Result<u64, RpcError> {
        self.call(
            "getBlockHeight",
            serde_json::json!([{ "commitment": commitment.as_str() }]),
        )
        .await
    }

    /// Reads raw (base64-decoded) account data. Returns `None` if the account
    /// does not exist.
    pub async fn get_account_data(
        &self,
        pubkey: &Pubkey,
        commitment: Commitment,
    ) -> Result<Option<Vec<u8>>, RpcError> {
        let method = "getAccountInfo";
        let response: RpcContextual<Option<RpcAccount>> = self
            .call(
                method,
                serde_json::json!([
                    pubkey.to_string(),
                    { "encoding": "base64", "commitment": commitment.as_str() }
                ]),
            )
            .await?;

        let Some(account) = response.value else {
            return Ok(None);
        };

        let data = STANDARD
            .decode(&account.data.0)
            .map_err(|e| RpcError::Malformed {
                method: method.to_string(),
                message: format!("invalid base64 account data: {}", e),
            })?;
        Ok(Some(data))
    }

    /// Submits a signed transaction. Preflight simulation runs at
    /// `preflight_commitment`; a failed preflight comes back as
    /// [`RpcError::Rpc`] carrying the program logs.
    pub async fn send_transaction(
        &self,
        transaction: &Transaction,
        preflight_commitment: Commitment,
    ) -> Result<Signature, RpcError> {
        let method = "sendTransaction";
        let encoded = encode_transaction(transaction)?;
        let signature: String = self
            .call(
                method,
                serde_json::json!([
                    encoded,
                    {
                        "encoding": "base64",
                        "skipPreflight": false,
                        "preflightCommitment": preflight_commitment.as_str()
                    }
                ]),
            )
            .await?;

        Signature::from_str(&signature).map_err(|e| RpcError::Malformed {
            method: method.to_string(),
            message: format!("invalid signature {}: {}", signature, e),
        })
    }

    /// Looks up the status of a single signature. `None` means the node has
    /// not seen it (yet).
    pub async fn get_signature_status(
        &self,
        signature: &Signature,
    ) -> Result<Option<SignatureStatus>, RpcError> {
        let response: RpcContextual<Vec<Option<SignatureStatus>>> = self
            .call(
                "getSignatureStatuses",
                serde_json::json!([
                    [signature.to_string()],
                    { "searchTransactionHistory": false }
                ]),
            )
            .await?;

        Ok(response.value.into_iter().next().flatten())
    }

    /// Fetches the execution log of a landed transaction. `None` when the node
    /// does not have the transaction or recorded no log.
    ///
    /// `getTransaction` does not accept `processed`; weaker commitments are
    /// raised to `confirmed`.
    pub async fn get_transaction_logs(
        &self,
        signature: &Signature,
        commitment: Commitment,
    ) -> Result<Option<Vec<String>>, RpcError> {
        let commitment = commitment.max(Commitment::Confirmed);
        let response: Option<RpcConfirmedTransaction> = self
            .call(
                "getTransaction",
                serde_json::json!([
                    signature.to_string(),
                    {
                        "encoding": "json",
                        "commitment": commitment.as_str(),
                        "maxSupportedTransactionVersion": 0
                    }
                ]),
            )
            .await?;

        Ok(response
            .and_then(|tx| tx.meta)
            .and_then(|meta| meta.log_messages))
    }

    /// Simulates a transaction without submitting it. Signatures are not
    /// verified, so unsigned transactions can be simulated too.
    pub async fn simulate_transaction(
        &self,
        transaction: &Transaction,
        commitment: Commitment,
    ) -> Result<SimulationResult, RpcError> {
        let encoded = encode_transaction(transaction)?;
        let response: RpcContextual<SimulationResult> = self
            .call(
                "simulateTransaction",
                serde_json::json!([
                    encoded,
                    {
                        "encoding": "base64",
                        "commitment": commitment.as_str(),
                        "sigVerify": false
                    }
                ]),
            )
            .await?;
        Ok(response.value)
    }

    /// Issues one JSON-RPC call bounded by the request timeout.
    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<T, RpcError> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            method,
            params,
            id: 1,
        };

        debug!("Calling {} on {}", method, self.rpc_url);

        let rpc_future = async {
            let response = self
                .client
                .post(&self.rpc_url)
                .json(&request)
                .send()
                .await
                .map_err(|e| self.transport_error(method, e))?;
            response
                .json::<JsonRpcResponse>()
                .await
                .map_err(|e| self.transport_error(method, e))
        };

        let response = tokio::time::timeout(self.request_timeout, rpc_future)
            .await
            .map_err(|_| RpcError::Timeout {
                method: method.to_string(),
                timeout_ms: self.request_timeout.as_millis() as u64,
            })??;

        if let Some(error) = response.error {
            warn!(
                "JSON-RPC error from {} ({}): {} (code: {})",
                self.rpc_url, method, error.message, error.code
            );
            return Err(RpcError::Rpc {
                method: method.to_string(),
                code: error.code,
                message: error.message,
                logs: extract_logs(error.data.as_ref()),
            });
        }

        // `result: null` is a valid answer for lookups such as getTransaction.
        let result = response.result.unwrap_or(serde_json::Value::Null);

        serde_json::from_value(result).map_err(|e| RpcError::Malformed {
            method: method.to_string(),
            message: e.to_string(),
        })
    }

    fn transport_error(&self, method: &str, e: reqwest::Error) -> RpcError {
        if e.is_timeout() {
            RpcError::Timeout {
                method: method.to_string(),
                timeout_ms: self.request_timeout.as_millis() as u64,
            }
        } else if e.is_decode() {
            RpcError::Malformed {
                method: method.to_string(),
                message: e.to_string(),
            }
        } else {
            RpcError::Transport {
                method: method.to_string(),
                message: e.to_string(),
            }
        }
    }
}

/// Serializes a transaction in the legacy wire format and base64-encodes it.
pub fn encode_transaction(transaction: &Transaction) -> Result<String, RpcError> {
    let bytes =
        bincode::serialize(transaction).map_err(|e| RpcError::Encoding(e.to_string()))?;
    Ok(STANDARD.encode(bytes))
}

/// Pulls `data.logs` out of a JSON-RPC error payload (preflight failures).
fn extract_logs(data: Option<&serde_json::Value>) -> Vec<String> {
    data.and_then(|d| d.get("logs"))
        .and_then(|logs| logs.as_array())
        .map(|logs| {
            logs.iter()
                .filter_map(|line| line.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Test that commitment levels order from weakest to strongest
    /// Why: confirmation polling compares reached level against the target
    #[test]
    fn test_commitment_ordering() {
        assert!(Commitment::Processed < Commitment::Confirmed);
        assert!(Commitment::Confirmed < Commitment::Finalized);
        assert_eq!(
            Commitment::from_str("confirmed").unwrap(),
            Commitment::Confirmed
        );
        assert!(Commitment::from_str("max").is_err());
    }

    /// Test that a status without confirmationStatus but with null confirmations counts as finalized
    #[test]
    fn test_signature_status_rooted_fallback() {
        let status = SignatureStatus {
            slot: 10,
            confirmations: None,
            err: None,
            confirmation_status: None,
        };
        assert!(status.satisfies(Commitment::Finalized));

        let pending = SignatureStatus {
            slot: 10,
            confirmations: Some(1),
            err: None,
            confirmation_status: Some("processed".to_string()),
        };
        assert!(!pending.satisfies(Commitment::Confirmed));
        assert!(pending.satisfies(Commitment::Processed));
    }

    /// Test that preflight logs are extracted from the error data payload
    #[test]
    fn test_extract_logs() {
        let data = serde_json::json!({
            "err": { "InstructionError": [0, { "Custom": 6000 }] },
            "logs": ["Program log: a", "Program log: b"]
        });
        assert_eq!(
            extract_logs(Some(&data)),
            vec!["Program log: a".to_string(), "Program log: b".to_string()]
        );
        assert!(extract_logs(None).is_empty());
    }
}
