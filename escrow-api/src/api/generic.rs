//! Generic API structures and server
//!
//! Shared response structures, rejection handling, CORS, and route wiring for
//! the escrow API.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info};
use warp::hyper::body::Bytes;
use warp::{
    http::{Method, StatusCode},
    Filter, Rejection, Reply,
};

use super::escrow;
use crate::config::Config;
use crate::error::EscrowError;
use crate::instructions::SCHEMA_VERSION;
use crate::preflight::{HoldRequest, ReleaseRequest};
use crate::service::EscrowService;

/// Maximum accepted request body size in bytes.
const MAX_BODY_BYTES: u64 = 16 * 1024;

// ============================================================================
// SHARED RESPONSE STRUCTURES
// ============================================================================

/// Error body returned for every failed request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable message
    pub error: String,
    /// Machine-readable category (see `EscrowError::kind`)
    pub kind: String,
    /// Execution log of a rejected transaction, when available
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logs: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    /// Fee payer public key, if a signer is configured
    pub fee_payer: Option<String>,
    pub capability: String,
    /// Program interface version the instructions are encoded against
    pub schema_version: String,
}

// ============================================================================
// WARP FILTER HELPERS
// ============================================================================

/// Creates a warp filter that provides access to the escrow service.
pub fn with_service(
    service: Arc<EscrowService>,
) -> impl Filter<Extract = (Arc<EscrowService>,), Error = std::convert::Infallible> + Clone {
    warp::any().map(move || service.clone())
}

/// Reads the raw body and deserializes it as `T`; malformed JSON becomes
/// a `JsonDeserializeError` rejection.
fn json_body<T>() -> impl Filter<Extract = (T,), Error = Rejection> + Clone
where
    T: serde::de::DeserializeOwned + Send + 'static,
{
    warp::body::content_length_limit(MAX_BODY_BYTES)
        .and(warp::body::bytes())
        .and_then(|body: Bytes| async move {
            serde_json::from_slice::<T>(&body).map_err(|e| {
                debug!("Rejected body {}: {}", String::from_utf8_lossy(&body), e);
                warp::reject::custom(JsonDeserializeError(format!("Invalid JSON: {}", e)))
            })
        })
}

// ============================================================================
// CUSTOM REJECTION TYPES
// ============================================================================

/// Custom rejection for JSON deserialization errors
#[derive(Debug)]
pub struct JsonDeserializeError(pub String);

impl warp::reject::Reject for JsonDeserializeError {}

// ============================================================================
// CORS CONFIGURATION
// ============================================================================

/// Creates a CORS filter based on the configured allowed origins.
fn create_cors_filter(allowed_origins: &[String]) -> warp::cors::Builder {
    let methods = vec![Method::GET, Method::POST, Method::OPTIONS];

    if allowed_origins.iter().any(|origin| origin == "*") {
        warp::cors()
            .allow_any_origin()
            .allow_methods(methods)
            .allow_headers(vec!["content-type"])
    } else {
        let origins: Vec<&str> = allowed_origins.iter().map(|s| s.as_str()).collect();
        warp::cors()
            .allow_origins(origins)
            .allow_methods(methods)
            .allow_headers(vec!["content-type"])
    }
}

// ============================================================================
// REJECTION HANDLER
// ============================================================================

/// Global rejection handler for all API routes.
///
/// Converts service errors and warp rejections into an [`ErrorResponse`]
/// with the matching HTTP status code.
pub async fn handle_rejection(rej: Rejection) -> Result<impl Reply, std::convert::Infallible> {
    let (status, body) = if let Some(err) = rej.find::<EscrowError>() {
        (
            err.status_code(),
            ErrorResponse {
                error: err.to_string(),
                kind: err.kind().to_string(),
                logs: err.logs().filter(|l| !l.is_empty()).map(|l| l.to_vec()),
            },
        )
    } else if let Some(err) = rej.find::<JsonDeserializeError>() {
        (StatusCode::BAD_REQUEST, invalid_input(err.0.clone()))
    } else if let Some(err) = rej.find::<warp::filters::body::BodyDeserializeError>() {
        (StatusCode::BAD_REQUEST, invalid_input(format!("Invalid JSON: {}", err)))
    } else if rej.find::<warp::reject::LengthRequired>().is_some() {
        // No Content-Length: an empty or chunked body
        (StatusCode::BAD_REQUEST, invalid_input("Missing request body".to_string()))
    } else if rej.find::<warp::reject::PayloadTooLarge>().is_some() {
        (StatusCode::PAYLOAD_TOO_LARGE, invalid_input("Request body too large".to_string()))
    } else if rej.is_not_found() {
        (StatusCode::NOT_FOUND, simple("Endpoint not found", "not_found"))
    } else if rej.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, simple("Method not allowed", "method_not_allowed"))
    } else {
        error!("Unhandled rejection: {:?}", rej);
        (StatusCode::INTERNAL_SERVER_ERROR, simple("Internal server error", "internal_error"))
    };

    Ok(warp::reply::with_status(warp::reply::json(&body), status))
}

fn invalid_input(message: String) -> ErrorResponse {
    ErrorResponse {
        error: message,
        kind: "invalid_input".to_string(),
        logs: None,
    }
}

fn simple(message: &str, kind: &str) -> ErrorResponse {
    ErrorResponse {
        error: message.to_string(),
        kind: kind.to_string(),
        logs: None,
    }
}

// ============================================================================
// API SERVER IMPLEMENTATION
// ============================================================================

/// REST API server for the escrow service.
///
/// `POST /hold` returns an unsigned transaction for the depositor's wallet.
/// `POST /release` is signed by the service's fee payer and submitted.
pub struct ApiServer {
    /// Service configuration
    config: Arc<Config>,
    service: Arc<EscrowService>,
}

impl ApiServer {
    /// Creates a new API server.
    ///
    /// # Arguments
    ///
    /// * `config` - Service configuration
    /// * `service` - Escrow service with its injected signer
    pub fn new(config: Config, service: EscrowService) -> Self {
        Self {
            config: Arc::new(config),
            service: Arc::new(service),
        }
    }

    /// Starts the API server on the configured host and port.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - Server stopped
    /// * `Err(anyhow::Error)` - Invalid bind address
    pub async fn run(&self) -> Result<()> {
        info!(
            "Starting API server on {}:{}",
            self.config.api.host, self.config.api.port
        );

        let routes = self.create_routes();

        let addr: std::net::SocketAddr = format!("{}:{}", self.config.api.host, self.config.api.port)
            .parse()
            .context("Failed to parse API server address")?;

        warp::serve(routes).run(addr).await;

        Ok(())
    }

    /// Creates all API routes for the server.
    pub(crate) fn create_routes(
        &self,
    ) -> impl Filter<Extract = impl warp::Reply, Error = std::convert::Infallible> + Clone {
        let service = self.service.clone();

        // GET /health - liveness and configured fee payer
        let health_service = service.clone();
        let health = warp::path("health")
            .and(warp::path::end())
            .and(warp::get())
            .map(move || {
                warp::reply::json(&HealthResponse {
                    status: "ok".to_string(),
                    fee_payer: health_service.fee_payer().map(|k| k.to_string()),
                    capability: health_service.capability().as_str().to_string(),
                    schema_version: SCHEMA_VERSION.to_string(),
                })
            });

        // POST /hold - unsigned hold transaction
        let hold = warp::path("hold")
            .and(warp::path::end())
            .and(warp::post())
            .and(json_body::<HoldRequest>())
            .and(with_service(service.clone()))
            .and_then(escrow::hold_handler);

        // POST /release - sign, submit, confirm
        let release = warp::path("release")
            .and(warp::path::end())
            .and(warp::post())
            .and(json_body::<ReleaseRequest>())
            .and(with_service(service.clone()))
            .and_then(escrow::release_handler);

        // POST /release/simulate - diagnostic simulation only
        let simulate = warp::path("release")
            .and(warp::path("simulate"))
            .and(warp::path::end())
            .and(warp::post())
            .and(json_body::<ReleaseRequest>())
            .and(with_service(service.clone()))
            .and_then(escrow::simulate_release_handler);

        // GET /escrow?initializer=..&beneficiary=..&releaseTs=..
        let status = warp::path("escrow")
            .and(warp::path::end())
            .and(warp::get())
            .and(
                warp::query::raw()
                    .or(warp::any().map(String::new))
                    .unify(),
            )
            .and(with_service(service))
            .and_then(escrow::escrow_status_handler);

        health
            .or(hold)
            .or(release)
            .or(simulate)
            .or(status)
            .with(create_cors_filter(&self.config.api.cors_origins))
            .recover(handle_rejection)
    }

    /// Public method for testing - exposes routes for integration tests
    pub fn test_routes(
        &self,
    ) -> impl Filter<Extract = impl warp::Reply, Error = std::convert::Infallible> + Clone {
        self.create_routes()
    }
}
