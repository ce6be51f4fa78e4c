//! Router configuration for the intake server.

use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};

use super::handlers;
use super::AppState;
use crate::config::ServerConfig;
use crate::error::IntakeError;

/// Create the router with all routes.
pub fn create_router(state: AppState, config: &ServerConfig) -> Result<Router, IntakeError> {
    Ok(Router::new()
        .route("/extract", post(handlers::extract))
        .route("/health", get(handlers::health))
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(cors_layer(&config.allowed_origin)?)
        .with_state(state))
}

/// CORS for a single credentialed origin.
///
/// Browsers reject `*` alongside credentials, so "any method / any header"
/// is expressed by mirroring the preflight request instead.
pub fn cors_layer(origin: &str) -> Result<CorsLayer, IntakeError> {
    let origin = origin.parse::<HeaderValue>().map_err(|e| {
        IntakeError::InvalidConfig(format!("invalid CORS origin '{}': {}", origin, e))
    })?;

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true))
}
