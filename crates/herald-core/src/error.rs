// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Herald ingestion engine.

use thiserror::Error;

/// The primary error type used across all Herald crates.
///
/// Expected steady states are deliberately NOT errors: an unmatched
/// phone number resolves to `Ok(None)`, a duplicate delivery returns
/// the already-stored row, and a stale status callback is reported as
/// an outcome. Only conditions that must abort the current operation
/// appear here.
#[derive(Debug, Error)]
pub enum HeraldError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    ///
    /// Surfaced to the transport layer as a non-2xx response so the
    /// provider's at-least-once redelivery becomes the retry path.
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Webhook signature missing, malformed, or mismatched.
    #[error("unauthenticated webhook delivery: {reason}")]
    Unauthenticated { reason: String },

    /// The request body is not a parseable provider envelope.
    ///
    /// Individual malformed sub-events within a parseable envelope are
    /// skipped during normalization and never produce this error.
    #[error("malformed webhook envelope: {detail}")]
    MalformedEnvelope { detail: String },

    /// A tenant-scoped operation touched an entity stamped with a
    /// different tenant id. Fatal for the operation, never downgraded.
    #[error("access denied: {entity} {id} belongs to another workspace")]
    AccessDenied { entity: &'static str, id: String },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}
