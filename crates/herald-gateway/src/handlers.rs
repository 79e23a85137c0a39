// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the gateway.
//!
//! Webhook delivery: POST /webhook (raw body + X-Hub-Signature-256),
//! GET /webhook (subscribe handshake). Read API: tenant-scoped
//! conversation and message listings under /v1/tenants/{tenant}/.

use std::collections::HashMap;

use axum::{
    Json,
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tracing::warn;

use herald_core::{ConversationId, HeraldError};
use herald_storage::guard::TenantScope;
use herald_storage::models::{Conversation, Message};
use herald_storage::queries::{accounts, conversations, messages};

use crate::server::GatewayState;

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error description.
    pub error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

/// Map a pipeline/storage error to the HTTP status the provider (or
/// dashboard) should see. Storage unavailability is 503 so the
/// provider's at-least-once redelivery becomes the retry path.
fn herald_error_response(err: HeraldError) -> Response {
    match err {
        HeraldError::Unauthenticated { reason } => {
            error_response(StatusCode::UNAUTHORIZED, reason)
        }
        HeraldError::MalformedEnvelope { detail } => {
            error_response(StatusCode::BAD_REQUEST, detail)
        }
        HeraldError::Storage { .. } => {
            error_response(StatusCode::SERVICE_UNAVAILABLE, "storage unavailable")
        }
        HeraldError::AccessDenied { .. } => {
            error_response(StatusCode::FORBIDDEN, "access denied")
        }
        other => {
            warn!(error = %other, "unexpected error in gateway handler");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
        }
    }
}

/// POST /webhook
///
/// The body must be read as raw bytes: signature verification runs over
/// the exact bytes the provider signed, and any re-serialization would
/// break it. 200 even when zero events matched a tenant; non-2xx only
/// for signature failures, unparseable bodies, and storage outages.
pub async fn post_webhook(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let signature = headers
        .get("x-hub-signature-256")
        .and_then(|v| v.to_str().ok());

    match state.pipeline.process(&body, signature).await {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(err) => herald_error_response(err),
    }
}

/// GET /webhook
///
/// Provider subscribe handshake: echo `hub.challenge` when
/// `hub.verify_token` matches the configured token.
pub async fn get_webhook_handshake(
    State(state): State<GatewayState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let mode = params.get("hub.mode").map(String::as_str);
    let token = params.get("hub.verify_token").map(String::as_str);
    let challenge = params.get("hub.challenge").cloned().unwrap_or_default();

    match (&state.verify_token, mode, token) {
        (Some(expected), Some("subscribe"), Some(got)) if got == expected => {
            (StatusCode::OK, challenge).into_response()
        }
        _ => {
            warn!("webhook handshake rejected: verify token mismatch");
            (StatusCode::FORBIDDEN, "verification failed").into_response()
        }
    }
}

/// A conversation as exposed by the read API.
#[derive(Debug, Serialize)]
pub struct ConversationInfo {
    pub id: String,
    pub phone_number_id: String,
    pub counterpart: String,
    pub status: String,
    pub message_count: i64,
    pub created_at: String,
    pub last_activity_at: String,
}

impl From<Conversation> for ConversationInfo {
    fn from(c: Conversation) -> Self {
        Self {
            id: c.id.0,
            phone_number_id: c.phone_number_id,
            counterpart: c.counterpart,
            status: c.status.to_string(),
            message_count: c.message_count,
            created_at: c.created_at,
            last_activity_at: c.last_activity_at,
        }
    }
}

/// Response body for the conversation listing.
#[derive(Debug, Serialize)]
pub struct ConversationListResponse {
    pub conversations: Vec<ConversationInfo>,
}

/// A message as exposed by the read API.
#[derive(Debug, Serialize)]
pub struct MessageInfo {
    pub id: String,
    pub provider_message_id: String,
    pub direction: String,
    pub kind: String,
    pub payload: serde_json::Value,
    pub status: String,
    pub provider_timestamp: String,
}

impl From<Message> for MessageInfo {
    fn from(m: Message) -> Self {
        let payload = serde_json::from_str(&m.payload)
            .unwrap_or(serde_json::Value::String(m.payload.clone()));
        Self {
            id: m.id,
            provider_message_id: m.provider_message_id,
            direction: m.direction.to_string(),
            kind: m.kind.to_string(),
            payload,
            status: m.status.to_string(),
            provider_timestamp: m.provider_timestamp,
        }
    }
}

/// Response body for the message listing.
#[derive(Debug, Serialize)]
pub struct MessageListResponse {
    pub messages: Vec<MessageInfo>,
}

/// Pagination parameters for the message listing.
#[derive(Debug, Deserialize)]
pub struct MessagePageParams {
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub before: Option<String>,
}

/// Resolve the tenant path segment (canonical id or legacy slug) to a
/// scope, mirroring the directory's normalization.
async fn resolve_scope(
    state: &GatewayState,
    tenant: &str,
) -> Result<Option<TenantScope>, HeraldError> {
    let account = accounts::get_account(&state.db, tenant).await?;
    Ok(account.map(|a| TenantScope::for_account(&a)))
}

/// GET /v1/tenants/{tenant}/conversations
pub async fn get_conversations(
    State(state): State<GatewayState>,
    Path(tenant): Path<String>,
) -> Response {
    let scope = match resolve_scope(&state, &tenant).await {
        Ok(Some(scope)) => scope,
        Ok(None) => return error_response(StatusCode::NOT_FOUND, "unknown tenant"),
        Err(err) => return herald_error_response(err),
    };

    match conversations::list_conversations(&state.db, &scope).await {
        Ok(list) => (
            StatusCode::OK,
            Json(ConversationListResponse {
                conversations: list.into_iter().map(ConversationInfo::from).collect(),
            }),
        )
            .into_response(),
        Err(err) => herald_error_response(err),
    }
}

/// GET /v1/tenants/{tenant}/conversations/{conversation_id}/messages
pub async fn get_messages(
    State(state): State<GatewayState>,
    Path((tenant, conversation_id)): Path<(String, String)>,
    Query(page): Query<MessagePageParams>,
) -> Response {
    let scope = match resolve_scope(&state, &tenant).await {
        Ok(Some(scope)) => scope,
        Ok(None) => return error_response(StatusCode::NOT_FOUND, "unknown tenant"),
        Err(err) => return herald_error_response(err),
    };

    let conversation_id = ConversationId(conversation_id);
    match conversations::get_conversation(&state.db, &scope, &conversation_id).await {
        Ok(Some(_)) => {}
        Ok(None) => return error_response(StatusCode::NOT_FOUND, "unknown conversation"),
        Err(err) => return herald_error_response(err),
    }

    match messages::list_messages(
        &state.db,
        &scope,
        &conversation_id,
        page.limit,
        page.before.as_deref(),
    )
    .await
    {
        Ok(list) => (
            StatusCode::OK,
            Json(MessageListResponse {
                messages: list.into_iter().map(MessageInfo::from).collect(),
            }),
        )
            .into_response(),
        Err(err) => herald_error_response(err),
    }
}

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

/// GET /health, the unauthenticated liveness endpoint.
pub async fn get_health(State(state): State<GatewayState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}
