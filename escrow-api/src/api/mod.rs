//! REST API Server Module
//!
//! This module provides the REST API for the escrow service: building unsigned
//! hold transactions, submitting fee-payer-signed releases, release simulation,
//! and escrow status lookups.
//!
//! ## Security Model
//!
//! The service never signs on behalf of depositors. Its only key is the fee
//! payer for release transactions; fund movement is authorized by the program.

// Shared structures, rejection handling, routes
mod generic;

// Escrow endpoint handlers
mod escrow;

pub use generic::{ApiServer, ErrorResponse, HealthResponse};
