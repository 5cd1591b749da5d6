//! Unit tests for the SVM JSON-RPC client
//!
//! These tests run the client against a wiremock JSON-RPC server and check
//! response parsing and error classification.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chain_clients_svm::{Commitment, RpcError, SvmRpcClient};
use serde_json::json;
use solana_sdk::{
    hash::Hash,
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
    signature::{Keypair, Signature, Signer},
    transaction::Transaction,
};
use std::time::Duration;
use wiremock::matchers::{body_json, body_partial_json, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> SvmRpcClient {
    SvmRpcClient::new(&server.uri(), Duration::from_millis(500)).expect("client")
}

fn signed_transaction() -> Transaction {
    let payer = Keypair::new();
    let ix = Instruction {
        program_id: Pubkey::new_unique(),
        accounts: vec![AccountMeta::new(payer.pubkey(), true)],
        data: vec![1, 2, 3],
    };
    let mut tx = Transaction::new_with_payer(&[ix], Some(&payer.pubkey()));
    tx.sign(&[&payer], Hash::new_unique());
    tx
}

/// What is tested: getLatestBlockhash result is parsed into hash + expiry height
/// Why: the hold envelope exposes lastValidBlockHeight to the wallet
#[tokio::test]
async fn test_get_latest_blockhash() {
    let server = MockServer::start().await;
    let blockhash = Hash::new_unique();

    Mock::given(method("POST"))
        .and(body_json(json!({
            "jsonrpc": "2.0",
            "method": "getLatestBlockhash",
            "params": [{ "commitment": "finalized" }],
            "id": 1
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "result": {
                "context": { "slot": 1 },
                "value": {
                    "blockhash": blockhash.to_string(),
                    "lastValidBlockHeight": 321
                }
            },
            "id": 1
        })))
        .mount(&server)
        .await;

    let latest = client_for(&server)
        .get_latest_blockhash(Commitment::Finalized)
        .await
        .expect("blockhash");
    assert_eq!(latest.blockhash, blockhash);
    assert_eq!(latest.last_valid_block_height, 321);
}

/// What is tested: a null account value maps to None, not an error
/// Why: preflight must distinguish "account missing" from RPC failure
#[tokio::test]
async fn test_get_account_data_missing_account() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "method": "getAccountInfo" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "result": { "context": { "slot": 1 }, "value": null },
            "id": 1
        })))
        .mount(&server)
        .await;

    let data = client_for(&server)
        .get_account_data(&Pubkey::new_unique(), Commitment::Confirmed)
        .await
        .expect("account lookup");
    assert!(data.is_none());
}

/// What is tested: base64 account data is decoded
#[tokio::test]
async fn test_get_account_data_decodes_base64() {
    let server = MockServer::start().await;
    let raw = vec![9u8; 16];

    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "method": "getAccountInfo" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "result": {
                "context": { "slot": 1 },
                "value": {
                    "data": [STANDARD.encode(&raw), "base64"],
                    "executable": false,
                    "lamports": 2039280,
                    "owner": Pubkey::new_unique().to_string(),
                    "rentEpoch": 0
                }
            },
            "id": 1
        })))
        .mount(&server)
        .await;

    let data = client_for(&server)
        .get_account_data(&Pubkey::new_unique(), Commitment::Confirmed)
        .await
        .expect("account lookup");
    assert_eq!(data, Some(raw));
}

/// What is tested: sendTransaction returns the parsed signature
#[tokio::test]
async fn test_send_transaction_returns_signature() {
    let server = MockServer::start().await;
    let tx = signed_transaction();
    let expected = tx.signatures[0];

    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "method": "sendTransaction" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "result": expected.to_string(),
            "id": 1
        })))
        .mount(&server)
        .await;

    let signature = client_for(&server)
        .send_transaction(&tx, Commitment::Confirmed)
        .await
        .expect("send");
    assert_eq!(signature, expected);
}

/// What is tested: preflight failures surface as RpcError::Rpc with program logs
/// Why: rejected submissions must be reported with their execution log
#[tokio::test]
async fn test_send_transaction_preflight_failure_carries_logs() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "method": "sendTransaction" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "error": {
                "code": -32002,
                "message": "Transaction simulation failed: Error processing Instruction 0: custom program error: 0x1770",
                "data": {
                    "err": { "InstructionError": [0, { "Custom": 6000 }] },
                    "logs": [
                        "Program log: Instruction: Release",
                        "Program log: AnchorError occurred. Error Code: TimelockNotReached."
                    ]
                }
            },
            "id": 1
        })))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .send_transaction(&signed_transaction(), Commitment::Confirmed)
        .await
        .expect_err("should be rejected");

    match &err {
        RpcError::Rpc { code, message, logs, .. } => {
            assert_eq!(*code, -32002);
            assert!(message.contains("0x1770"));
            assert_eq!(logs.len(), 2);
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

/// What is tested: signature status parsing, including the not-yet-seen case
#[tokio::test]
async fn test_get_signature_status() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "method": "getSignatureStatuses" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "result": {
                "context": { "slot": 5 },
                "value": [{
                    "slot": 5,
                    "confirmations": 0,
                    "err": null,
                    "confirmationStatus": "confirmed"
                }]
            },
            "id": 1
        })))
        .mount(&server)
        .await;

    let status = client_for(&server)
        .get_signature_status(&Signature::default())
        .await
        .expect("status")
        .expect("status present");
    assert!(status.err.is_none());
    assert!(status.satisfies(Commitment::Confirmed));
    assert!(!status.satisfies(Commitment::Finalized));
}

/// What is tested: simulateTransaction returns logs
#[tokio::test]
async fn test_simulate_transaction_returns_logs() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "method": "simulateTransaction" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "result": {
                "context": { "slot": 5 },
                "value": {
                    "err": null,
                    "logs": ["Program log: Instruction: Release"],
                    "unitsConsumed": 4200
                }
            },
            "id": 1
        })))
        .mount(&server)
        .await;

    let result = client_for(&server)
        .simulate_transaction(&signed_transaction(), Commitment::Confirmed)
        .await
        .expect("simulate");
    assert!(result.err.is_none());
    assert_eq!(result.units_consumed, Some(4200));
    assert_eq!(result.logs.unwrap().len(), 1);
}

/// What is tested: a slow endpoint yields RpcError::Timeout
/// Why: each RPC boundary must be independently time-bounded
#[tokio::test]
async fn test_call_times_out() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_secs(3))
                .set_body_json(json!({ "jsonrpc": "2.0", "result": 1, "id": 1 })),
        )
        .mount(&server)
        .await;

    let err = client_for(&server)
        .get_block_height(Commitment::Confirmed)
        .await
        .expect_err("should time out");
    assert!(matches!(err, RpcError::Timeout { .. }), "got {:?}", err);
}

/// What is tested: an unreachable endpoint yields RpcError::Transport
#[tokio::test]
async fn test_unreachable_endpoint_is_transport_error() {
    let client =
        SvmRpcClient::new("http://127.0.0.1:1", Duration::from_millis(500)).expect("client");
    let err = client
        .get_block_height(Commitment::Confirmed)
        .await
        .expect_err("should fail");
    assert!(
        matches!(err, RpcError::Transport { .. } | RpcError::Timeout { .. }),
        "got {:?}",
        err
    );
}

/// What is tested: getTransaction log messages are returned, and an unknown
/// signature yields None
/// Why: on-chain execution failures are reported with their log
#[tokio::test]
async fn test_get_transaction_logs() {
    let server = MockServer::start().await;
    let found = Signature::from([7u8; 64]);
    let missing = Signature::from([8u8; 64]);

    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "method": "getTransaction",
            "params": [found.to_string(), { "commitment": "confirmed" }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "result": {
                "slot": 9,
                "meta": {
                    "err": { "InstructionError": [0, { "Custom": 1 }] },
                    "logMessages": ["Program log: Instruction: Release", "Program failed"]
                }
            },
            "id": 1
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "method": "getTransaction",
            "params": [missing.to_string()]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "result": null,
            "id": 1
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    // processed is raised to confirmed for getTransaction
    let logs = client
        .get_transaction_logs(&found, Commitment::Processed)
        .await
        .expect("logs");
    assert_eq!(logs.map(|l| l.len()), Some(2));

    let none = client
        .get_transaction_logs(&missing, Commitment::Confirmed)
        .await
        .expect("lookup");
    assert!(none.is_none());
}

/// What is tested: getBlockHeight returns the plain integer result
#[tokio::test]
async fn test_get_block_height() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "method": "getBlockHeight" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "result": 4_321,
            "id": 1
        })))
        .mount(&server)
        .await;

    let height = client_for(&server)
        .get_block_height(Commitment::Confirmed)
        .await
        .expect("height");
    assert_eq!(height, 4_321);
}
