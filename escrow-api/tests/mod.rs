//! Test module organization
//!
//! This module re-exports test helpers for use in test files.

mod helpers;

#[allow(unused_imports)]
pub use helpers::{
    build_api_server, build_service, build_test_config, escrow_account_data, fee_payer,
    mount_account, mount_latest_blockhash, mount_send_ok, mount_signature_status, program_id,
    received_methods, rpc_error, rpc_result, submitted_transactions, test_seeds, timelock_rejection, token_account_data,
    token_mint, DUMMY_LAST_VALID_BLOCK_HEIGHT, DUMMY_PROGRAM_ID, DUMMY_TOKEN_DECIMALS,
    DUMMY_TOKEN_MINT, FUTURE_RELEASE_TS,
};
