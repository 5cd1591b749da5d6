//! Error taxonomy for the escrow service
//!
//! Every failure a request can hit maps to exactly one [`EscrowError`]
//! variant, which in turn fixes the HTTP status and the machine-readable
//! `kind` returned to callers. Callers rely on `kind` to tell "needs funding",
//! "not yet unlockable", "signing declined", and "network error" apart.

use chain_clients_svm::RpcError;
use thiserror::Error;
use warp::http::StatusCode;

#[derive(Debug, Error)]
pub enum EscrowError {
    /// Malformed or missing request fields
    #[error("{0}")]
    InvalidInput(String),

    /// The initializer's token account does not exist
    #[error("Token account {account} does not exist; create and fund it with the escrow token before placing a hold")]
    AccountNotFunded { account: String },

    /// The initializer's token account holds less than the requested amount
    #[error("Insufficient token balance: available {available} base units, required {required} base units")]
    InsufficientBalance { available: u64, required: u64 },

    /// Program-derived address search exhausted (should never happen)
    #[error("Address derivation failed: {0}")]
    DerivationFailed(String),

    /// The configured signer cannot perform the requested operation
    #[error("Signing unavailable: {0}")]
    SigningUnavailable(String),

    /// The program refused to release because the time lock has not elapsed
    #[error("Escrow is not yet unlockable: {message}")]
    NotYetUnlockable { message: String, logs: Vec<String> },

    /// The ledger refused the transaction's signatures
    #[error("Transaction signing was declined: {message}")]
    SigningDeclined { message: String, logs: Vec<String> },

    /// The transaction's blockhash lapsed before it landed
    #[error("Transaction blockhash expired: {message}")]
    BlockhashExpired { message: String, logs: Vec<String> },

    /// The program or ledger refused the transaction for any other reason
    #[error("Transaction rejected: {message}")]
    SubmissionRejected { message: String, logs: Vec<String> },

    /// RPC endpoint unreachable or misbehaving; safe to retry
    #[error("Ledger RPC failure: {0}")]
    NetworkFailure(String),

    /// No confirmation observed within the configured horizon
    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl EscrowError {
    /// Stable, machine-readable category name.
    pub fn kind(&self) -> &'static str {
        match self {
            EscrowError::InvalidInput(_) => "invalid_input",
            EscrowError::AccountNotFunded { .. } => "account_not_funded",
            EscrowError::InsufficientBalance { .. } => "insufficient_balance",
            EscrowError::DerivationFailed(_) => "derivation_failed",
            EscrowError::SigningUnavailable(_) => "signing_unavailable",
            EscrowError::NotYetUnlockable { .. } => "not_yet_unlockable",
            EscrowError::SigningDeclined { .. } => "signing_declined",
            EscrowError::BlockhashExpired { .. } => "blockhash_expired",
            EscrowError::SubmissionRejected { .. } => "submission_rejected",
            EscrowError::NetworkFailure(_) => "network_failure",
            EscrowError::Timeout(_) => "timeout",
            EscrowError::Internal(_) => "internal_error",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            EscrowError::InvalidInput(_)
            | EscrowError::AccountNotFunded { .. }
            | EscrowError::InsufficientBalance { .. }
            | EscrowError::NotYetUnlockable { .. }
            | EscrowError::SigningDeclined { .. }
            | EscrowError::BlockhashExpired { .. }
            | EscrowError::SubmissionRejected { .. } => StatusCode::BAD_REQUEST,
            EscrowError::SigningUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            EscrowError::NetworkFailure(_) => StatusCode::BAD_GATEWAY,
            EscrowError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            EscrowError::DerivationFailed(_) | EscrowError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Execution logs attached to a rejection, if any.
    pub fn logs(&self) -> Option<&[String]> {
        match self {
            EscrowError::NotYetUnlockable { logs, .. }
            | EscrowError::SigningDeclined { logs, .. }
            | EscrowError::BlockhashExpired { logs, .. }
            | EscrowError::SubmissionRejected { logs, .. } => Some(logs),
            _ => None,
        }
    }

    /// Whether the same request may succeed if simply retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            EscrowError::NetworkFailure(_)
                | EscrowError::Timeout(_)
                | EscrowError::BlockhashExpired { .. }
        )
    }
}

/// Read-path RPC failures (balance, blockhash, status lookups) are network
/// failures from the caller's point of view; submission failures are
/// classified separately by the gateway.
impl From<RpcError> for EscrowError {
    fn from(e: RpcError) -> Self {
        match e {
            RpcError::Encoding(message) => EscrowError::Internal(message),
            other => EscrowError::NetworkFailure(other.to_string()),
        }
    }
}

impl warp::reject::Reject for EscrowError {}

pub type Result<T> = std::result::Result<T, EscrowError>;
