//! Escrow endpoint handlers
//!
//! Thin adapters between warp and [`EscrowService`]: service errors become
//! custom rejections and are rendered by the global rejection handler.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};
use url::Url;

use crate::error::EscrowError;
use crate::preflight::{HoldRequest, ReleaseRequest};
use crate::service::EscrowService;

fn reject(operation: &str, err: EscrowError) -> warp::Rejection {
    warn!(
        "{} failed ({}, retryable: {}): {}",
        operation,
        err.kind(),
        err.is_retryable(),
        err
    );
    warp::reject::custom(err)
}

/// Handler for `POST /hold`.
///
/// # Returns
///
/// * `Ok(warp::Reply)` - `{tx, lastValidBlockHeight}`
/// * `Err(warp::Rejection)` - Validation, funding, or ledger failure
pub async fn hold_handler(
    request: HoldRequest,
    service: Arc<EscrowService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    info!(
        "POST /hold initializer={} beneficiary={} release_ts={:?}",
        request.initializer, request.beneficiary, request.release_ts
    );
    let envelope = service
        .hold(&request)
        .await
        .map_err(|e| reject("hold", e))?;
    Ok(warp::reply::json(&envelope))
}

/// Handler for `POST /release`.
///
/// # Returns
///
/// * `Ok(warp::Reply)` - `{signature}` once confirmed
/// * `Err(warp::Rejection)` - Signing, submission, or confirmation failure
pub async fn release_handler(
    request: ReleaseRequest,
    service: Arc<EscrowService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    info!(
        "POST /release initializer={} beneficiary={} release_ts={:?}",
        request.initializer, request.beneficiary, request.release_ts
    );
    let submitted = service
        .release(&request)
        .await
        .map_err(|e| reject("release", e))?;
    info!("Release confirmed: {}", submitted.signature);
    Ok(warp::reply::json(&submitted))
}

/// Handler for `POST /release/simulate`.
pub async fn simulate_release_handler(
    request: ReleaseRequest,
    service: Arc<EscrowService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let simulation = service
        .simulate_release(&request)
        .await
        .map_err(|e| reject("release simulation", e))?;
    Ok(warp::reply::json(&simulation))
}

/// Handler for `GET /escrow`.
///
/// Query parameters:
/// - initializer: Depositor address
/// - beneficiary: Recipient address
/// - releaseTs: Unix seconds the funds unlock at
pub async fn escrow_status_handler(
    query: String,
    service: Arc<EscrowService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let request = parse_status_query(&query).map_err(|e| reject("escrow status", e))?;
    let status = service
        .escrow_status(&request)
        .await
        .map_err(|e| reject("escrow status", e))?;
    Ok(warp::reply::json(&status))
}

/// Parses the raw `GET /escrow` query string into seed fields.
pub fn parse_status_query(query: &str) -> Result<ReleaseRequest, EscrowError> {
    let parsed = Url::parse(&format!("http://localhost/escrow?{}", query))
        .map_err(|e| EscrowError::InvalidInput(format!("Invalid query string: {}", e)))?;
    let params: HashMap<String, String> = parsed.query_pairs().into_owned().collect();

    let release_ts = params
        .get("releaseTs")
        .map(|value| {
            value.trim().parse::<i64>().map_err(|_| {
                EscrowError::InvalidInput(format!("Invalid releaseTs: '{}'", value))
            })
        })
        .transpose()?;

    Ok(ReleaseRequest {
        initializer: params.get("initializer").cloned().unwrap_or_default(),
        beneficiary: params.get("beneficiary").cloned().unwrap_or_default(),
        release_ts,
    })
}
