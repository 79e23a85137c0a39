// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state. The webhook endpoint
//! authenticates deliveries itself via the HMAC signature inside the
//! pipeline; dashboard authentication for the read API belongs to the
//! platform edge and is not handled here.

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;

use herald_core::HeraldError;
use herald_router::WebhookPipeline;
use herald_storage::Database;

use crate::handlers;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    /// Storage handle for the read API.
    pub db: Arc<Database>,
    /// The webhook ingestion pipeline.
    pub pipeline: Arc<WebhookPipeline>,
    /// Token echoed during the subscribe handshake. `None` disables the
    /// handshake endpoint (403 for every attempt).
    pub verify_token: Option<String>,
    /// Process start time for uptime reporting.
    pub start_time: std::time::Instant,
}

/// Gateway server configuration (mirrors GatewayConfig from herald-config).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host address to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
}

/// Build the gateway router. Exposed separately from [`start_server`]
/// so tests can drive handlers without binding a socket.
pub fn build_router(state: GatewayState) -> Router {
    // Provider webhook surface.
    let webhook_routes = Router::new()
        .route(
            "/webhook",
            post(handlers::post_webhook).get(handlers::get_webhook_handshake),
        )
        .with_state(state.clone());

    // Tenant-scoped read surface for the dashboard and outbound path.
    let api_routes = Router::new()
        .route(
            "/v1/tenants/{tenant}/conversations",
            get(handlers::get_conversations),
        )
        .route(
            "/v1/tenants/{tenant}/conversations/{conversation_id}/messages",
            get(handlers::get_messages),
        )
        .with_state(state.clone());

    let public_routes = Router::new()
        .route("/health", get(handlers::get_health))
        .with_state(state);

    Router::new()
        .merge(webhook_routes)
        .merge(api_routes)
        .merge(public_routes)
        .layer(CorsLayer::permissive())
}

/// Start the gateway HTTP server and serve until the task is dropped.
pub async fn start_server(config: &ServerConfig, state: GatewayState) -> Result<(), HeraldError> {
    let app = build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| HeraldError::Internal(format!("failed to bind gateway to {addr}: {e}")))?;

    tracing::info!("gateway listening on {addr}");

    axum::serve(listener, app)
        .await
        .map_err(|e| HeraldError::Internal(format!("gateway server error: {e}")))?;

    Ok(())
}
