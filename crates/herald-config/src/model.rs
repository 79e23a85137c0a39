// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Herald ingestion engine.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject
//! unrecognized config keys at startup.

use serde::{Deserialize, Serialize};

/// Top-level Herald configuration.
///
/// Loaded from TOML files following the XDG hierarchy, with environment
/// variable overrides. All sections are optional and default to
/// sensible values, except that `provider.app_secret` must be set
/// before the webhook endpoint will accept deliveries.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct HeraldConfig {
    /// Service identity and logging.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Messaging provider (Cloud API) settings.
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// HTTP gateway settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Webhook ingestion tuning.
    #[serde(default)]
    pub ingest: IngestConfig,
}

/// Service identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Display name of the service instance.
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_service_name() -> String {
    "herald".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Messaging provider configuration.
///
/// `app_secret` signs every webhook delivery; `verify_token` answers
/// the one-time subscribe handshake. Both are provisioned in the
/// provider's app dashboard.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    /// Shared HMAC secret for `X-Hub-Signature-256` verification.
    #[serde(default)]
    pub app_secret: Option<String>,

    /// Token echoed during the `GET /webhook` subscribe handshake.
    #[serde(default)]
    pub verify_token: Option<String>,

    /// Provider Graph API version string.
    #[serde(default = "default_api_version")]
    pub api_version: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            app_secret: None,
            verify_token: None,
            api_version: default_api_version(),
        }
    }
}

fn default_api_version() -> String {
    "v23.0".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Whether to enable WAL journal mode.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    "herald.db".to_string()
}

fn default_wal_mode() -> bool {
    true
}

/// HTTP gateway configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8085
}

/// Webhook ingestion tuning.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct IngestConfig {
    /// Per-event processing timeout in seconds. A timeout on one event
    /// does not abort siblings in the same envelope.
    #[serde(default = "default_event_timeout_secs")]
    pub event_timeout_secs: u64,

    /// How long processed delivery records are retained before pruning.
    #[serde(default = "default_delivery_retention_hours")]
    pub delivery_retention_hours: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            event_timeout_secs: default_event_timeout_secs(),
            delivery_retention_hours: default_delivery_retention_hours(),
        }
    }
}

fn default_event_timeout_secs() -> u64 {
    10
}

fn default_delivery_retention_hours() -> u64 {
    72
}
