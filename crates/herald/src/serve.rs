// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `herald serve` command implementation.
//!
//! Opens the database, builds the webhook pipeline, and runs the
//! gateway until the process receives SIGINT.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use herald_config::HeraldConfig;
use herald_core::HeraldError;
use herald_gateway::{GatewayState, ServerConfig, start_server};
use herald_router::{PipelineConfig, WebhookPipeline};
use herald_storage::Database;

/// Run the `herald serve` command.
pub async fn run_serve(config: HeraldConfig) -> Result<(), HeraldError> {
    init_tracing(&config.service.log_level);

    info!(service = %config.service.name, "starting herald serve");

    // The webhook endpoint is useless without the shared secret;
    // fail-closed at startup rather than rejecting every delivery.
    let Some(app_secret) = config.provider.app_secret.clone() else {
        return Err(HeraldError::Config(
            "provider.app_secret must be set before herald can accept webhook deliveries".into(),
        ));
    };

    let db = Arc::new(
        Database::open_with(&config.storage.database_path, config.storage.wal_mode).await?,
    );
    info!(path = %config.storage.database_path, "storage ready");

    let pipeline = Arc::new(WebhookPipeline::new(
        db.clone(),
        PipelineConfig {
            app_secret,
            event_timeout: Duration::from_secs(config.ingest.event_timeout_secs),
            delivery_retention: Duration::from_secs(
                config.ingest.delivery_retention_hours * 3600,
            ),
        },
    ));

    let state = GatewayState {
        db,
        pipeline,
        verify_token: config.provider.verify_token.clone(),
        start_time: std::time::Instant::now(),
    };
    let server_config = ServerConfig {
        host: config.gateway.host.clone(),
        port: config.gateway.port,
    };

    tokio::select! {
        result = start_server(&server_config, state) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
            Ok(())
        }
    }
}

/// Initialize the tracing subscriber from the configured log level.
///
/// `RUST_LOG` takes precedence when set, matching the usual operator
/// expectation.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}
