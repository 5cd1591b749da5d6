//! Shared test helpers for integration tests
//!
//! The module is organized into several categories:
//! - **Configuration Builders**: Test configurations pointed at a mock ledger
//! - **Service Builders**: Escrow service and API server with a chosen signer
//! - **Mock Ledger**: wiremock JSON-RPC responders for the methods the service calls

#![allow(dead_code)]

use base64::{engine::general_purpose::STANDARD, Engine as _};
use escrow_api::accounts::{EscrowAccount, TOKEN_ACCOUNT_LEN};
use escrow_api::api::ApiServer;
use escrow_api::assembler::decode_transaction;
use escrow_api::config::{ApiConfig, Config, EscrowConfig, LedgerConfig};
use escrow_api::derivation::EscrowSeeds;
use escrow_api::{EscrowService, FeePayerSigner, SigningAuthority};
use serde_json::{json, Value};
use solana_sdk::{
    hash::Hash,
    pubkey::Pubkey,
    signature::{Keypair, Signature, Signer},
    transaction::Transaction,
};
use wiremock::matchers::{body_partial_json, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ============================================================================
// CONSTANTS
// ============================================================================

/// Escrow program ID used by every test config
pub const DUMMY_PROGRAM_ID: &str = "GuKWhJ6x5t42C3WCPbsgyMhbo12kjDSp1bQv55AeaUWX";

/// Escrowed token mint used by every test config
pub const DUMMY_TOKEN_MINT: &str = "4zMMC9srt5Ri5X14GAgXhaHii3GnPAEERYPJgZJDncDU";

/// Token decimals used by every test config
pub const DUMMY_TOKEN_DECIMALS: u8 = 6;

/// Release timestamp far in the future (2100-01-01)
pub const FUTURE_RELEASE_TS: i64 = 4_102_444_800;

/// lastValidBlockHeight returned by the mock ledger
pub const DUMMY_LAST_VALID_BLOCK_HEIGHT: u64 = 1_234;

// ============================================================================
// CONFIGURATION BUILDERS
// ============================================================================

/// Build a config pointing at `rpc_url` with short timeouts.
pub fn build_test_config(rpc_url: &str) -> Config {
    Config {
        ledger: LedgerConfig {
            rpc_url: rpc_url.to_string(),
            commitment: chain_clients_svm::Commitment::Confirmed,
            rpc_timeout_ms: 1_000,
            confirm_timeout_ms: 2_000,
            confirm_poll_interval_ms: 10,
        },
        escrow: EscrowConfig {
            program_id: DUMMY_PROGRAM_ID.to_string(),
            token_mint: DUMMY_TOKEN_MINT.to_string(),
            token_decimals: DUMMY_TOKEN_DECIMALS,
        },
        fee_payer: None,
        api: ApiConfig {
            host: "127.0.0.1".to_string(),
            port: 3001,
            cors_origins: vec!["*".to_string()],
        },
    }
}

pub fn program_id() -> Pubkey {
    DUMMY_PROGRAM_ID.parse().unwrap()
}

pub fn token_mint() -> Pubkey {
    DUMMY_TOKEN_MINT.parse().unwrap()
}

/// Fresh seeds with on-curve parties and the configured mint.
pub fn test_seeds(release_ts: i64) -> EscrowSeeds {
    EscrowSeeds {
        initializer: Keypair::new().pubkey(),
        beneficiary: Keypair::new().pubkey(),
        mint: token_mint(),
        release_ts,
    }
}

// ============================================================================
// SERVICE BUILDERS
// ============================================================================

pub fn fee_payer(submit_enabled: bool) -> SigningAuthority {
    SigningAuthority::FeePayer(FeePayerSigner::new(Keypair::new(), submit_enabled))
}

pub fn build_service(server: &MockServer, signer: SigningAuthority) -> EscrowService {
    EscrowService::new(&build_test_config(&server.uri()), signer).unwrap()
}

pub fn build_api_server(server: &MockServer, signer: SigningAuthority) -> ApiServer {
    let config = build_test_config(&server.uri());
    let service = EscrowService::new(&config, signer).unwrap();
    ApiServer::new(config, service)
}

// ============================================================================
// ACCOUNT DATA
// ============================================================================

/// Packed SPL token account with the given mint, owner, and amount.
pub fn token_account_data(mint: &Pubkey, owner: &Pubkey, amount: u64) -> Vec<u8> {
    let mut data = vec![0u8; TOKEN_ACCOUNT_LEN];
    data[..32].copy_from_slice(mint.as_ref());
    data[32..64].copy_from_slice(owner.as_ref());
    data[64..72].copy_from_slice(&amount.to_le_bytes());
    data[108] = 1; // initialized
    data
}

/// On-chain `Escrow` account bytes for the given seeds.
pub fn escrow_account_data(seeds: &EscrowSeeds, bump: u8) -> Vec<u8> {
    EscrowAccount {
        initializer: seeds.initializer.to_bytes(),
        beneficiary: seeds.beneficiary.to_bytes(),
        mint: seeds.mint.to_bytes(),
        release_ts: seeds.release_ts,
        bump,
    }
    .to_account_data()
    .unwrap()
}

// ============================================================================
// MOCK LEDGER
// ============================================================================

pub fn rpc_result(result: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "jsonrpc": "2.0", "result": result, "id": 1 }))
}

pub fn rpc_error(code: i64, message: &str, logs: &[&str]) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "jsonrpc": "2.0",
        "error": {
            "code": code,
            "message": message,
            "data": { "err": null, "logs": logs }
        },
        "id": 1
    }))
}

/// getAccountInfo for `address` returns `data` (or null when `None`).
pub async fn mount_account(server: &MockServer, address: &Pubkey, data: Option<Vec<u8>>) {
    let value = match data {
        Some(bytes) => json!({
            "data": [STANDARD.encode(bytes), "base64"],
            "executable": false,
            "lamports": 2_039_280,
            "owner": Pubkey::new_unique().to_string(),
            "rentEpoch": 0
        }),
        None => Value::Null,
    };

    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "method": "getAccountInfo",
            "params": [address.to_string()]
        })))
        .respond_with(rpc_result(json!({ "context": { "slot": 1 }, "value": value })))
        .mount(server)
        .await;
}

pub async fn mount_latest_blockhash(server: &MockServer) -> Hash {
    let blockhash = Hash::new_unique();
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "method": "getLatestBlockhash" })))
        .respond_with(rpc_result(json!({
            "context": { "slot": 1 },
            "value": {
                "blockhash": blockhash.to_string(),
                "lastValidBlockHeight": DUMMY_LAST_VALID_BLOCK_HEIGHT
            }
        })))
        .mount(server)
        .await;
    blockhash
}

/// sendTransaction accepts and returns `signature`.
pub async fn mount_send_ok(server: &MockServer, signature: &Signature) {
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "method": "sendTransaction" })))
        .respond_with(rpc_result(json!(signature.to_string())))
        .mount(server)
        .await;
}

/// getSignatureStatuses reports `status` (e.g. "confirmed") with an optional err.
pub async fn mount_signature_status(server: &MockServer, status: &str, err: Value) {
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "method": "getSignatureStatuses" })))
        .respond_with(rpc_result(json!({
            "context": { "slot": 5 },
            "value": [{
                "slot": 5,
                "confirmations": 1,
                "err": err,
                "confirmationStatus": status
            }]
        })))
        .mount(server)
        .await;
}

/// Preflight failure carrying the program's TimelockNotReached log.
pub fn timelock_rejection() -> ResponseTemplate {
    rpc_error(
        -32002,
        "Transaction simulation failed: Error processing Instruction 0: custom program error: 0x1770",
        &[
            "Program log: Instruction: Release",
            "Program log: AnchorError occurred. Error Code: TimelockNotReached. Error Number: 6000.",
        ],
    )
}

/// JSON-RPC method names of every request the mock ledger received.
pub async fn received_methods(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter_map(|request| serde_json::from_slice::<Value>(&request.body).ok())
        .filter_map(|body| body["method"].as_str().map(str::to_string))
        .collect()
}

/// Transactions the mock ledger received through sendTransaction, decoded.
pub async fn submitted_transactions(server: &MockServer) -> Vec<Transaction> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter_map(|request| serde_json::from_slice::<Value>(&request.body).ok())
        .filter(|body| body["method"] == "sendTransaction")
        .filter_map(|body| body["params"][0].as_str().map(str::to_string))
        .map(|encoded| decode_transaction(&encoded).unwrap())
        .collect()
}
