// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end pipeline testing.
//!
//! `TestHarness` assembles a complete ingestion stack on a temp SQLite
//! database with seeded accounts and bindings, and signs envelopes with
//! the configured app secret so tests exercise the same verification
//! path as production deliveries.

use std::sync::Arc;
use std::time::Duration;

use herald_core::{HeraldError, TenantId};
use herald_ingest::sign;
use herald_router::{PipelineConfig, ProcessingSummary, WebhookPipeline};
use herald_storage::Database;
use herald_storage::guard::TenantScope;
use herald_storage::models::{Account, AccountStatus};
use herald_storage::queries::{accounts, bindings};

/// Default app secret used by harness-built pipelines.
pub const TEST_APP_SECRET: &str = "harness-app-secret";

/// Builder for creating test environments with seeded tenants.
pub struct TestHarnessBuilder {
    accounts: Vec<(String, Option<String>)>,
    bindings: Vec<(String, String, String)>,
    event_timeout: Duration,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            accounts: Vec::new(),
            bindings: Vec::new(),
            event_timeout: Duration::from_secs(5),
        }
    }

    /// Seed an account with a canonical id and optional legacy slug.
    pub fn with_account(mut self, id: &str, slug: Option<&str>) -> Self {
        self.accounts
            .push((id.to_string(), slug.map(|s| s.to_string())));
        self
    }

    /// Seed an active binding. `account_ref` may be the canonical id or
    /// a legacy slug, mirroring historical data.
    pub fn with_binding(mut self, phone_number_id: &str, waba: &str, account_ref: &str) -> Self {
        self.bindings.push((
            phone_number_id.to_string(),
            waba.to_string(),
            account_ref.to_string(),
        ));
        self
    }

    /// Override the per-event processing timeout.
    pub fn with_event_timeout(mut self, timeout: Duration) -> Self {
        self.event_timeout = timeout;
        self
    }

    /// Build the harness, creating the temp database and seeding data.
    pub async fn build(self) -> Result<TestHarness, HeraldError> {
        let temp_dir = tempfile::TempDir::new().map_err(|e| HeraldError::Storage {
            source: e.into(),
        })?;
        let db_path = temp_dir.path().join("harness.db");
        let db = Arc::new(Database::open(db_path.to_string_lossy().as_ref()).await?);

        for (id, slug) in &self.accounts {
            let account = Account {
                id: TenantId(id.clone()),
                slug: slug.clone(),
                display_name: format!("Tenant {id}"),
                status: AccountStatus::Active,
                created_at: "2026-01-01T00:00:00.000Z".into(),
            };
            accounts::create_account(&db, &account).await?;
        }
        for (phone, waba, account_ref) in &self.bindings {
            bindings::create_binding(&db, phone, waba, account_ref, None).await?;
        }

        let pipeline = Arc::new(WebhookPipeline::new(
            db.clone(),
            PipelineConfig {
                app_secret: TEST_APP_SECRET.into(),
                event_timeout: self.event_timeout,
                delivery_retention: Duration::from_secs(72 * 3600),
            },
        ));

        Ok(TestHarness {
            db,
            pipeline,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete ingestion stack over a temp database.
pub struct TestHarness {
    pub db: Arc<Database>,
    pub pipeline: Arc<WebhookPipeline>,
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Sign `body` with the harness secret and run it through the pipeline.
    pub async fn deliver(&self, body: &str) -> Result<ProcessingSummary, HeraldError> {
        let header = sign(TEST_APP_SECRET, body.as_bytes());
        self.pipeline.process(body.as_bytes(), Some(&header)).await
    }

    /// Run `body` through the pipeline with an arbitrary signature header.
    pub async fn deliver_with_header(
        &self,
        body: &str,
        header: Option<&str>,
    ) -> Result<ProcessingSummary, HeraldError> {
        self.pipeline.process(body.as_bytes(), header).await
    }

    /// Tenant scope for assertions against storage.
    pub fn scope(&self, tenant_id: &str) -> TenantScope {
        TenantScope::new(TenantId(tenant_id.into()))
    }
}

/// Build a single-message envelope body in the provider's wire shape.
pub fn message_envelope(
    waba: &str,
    phone_number_id: &str,
    from: &str,
    provider_message_id: &str,
    timestamp: &str,
    text: &str,
) -> String {
    serde_json::json!({
        "object": "whatsapp_business_account",
        "entry": [{
            "id": waba,
            "changes": [{
                "field": "messages",
                "value": {
                    "messaging_product": "whatsapp",
                    "metadata": {"phone_number_id": phone_number_id},
                    "messages": [{
                        "from": from,
                        "id": provider_message_id,
                        "timestamp": timestamp,
                        "type": "text",
                        "text": {"body": text}
                    }]
                }
            }]
        }]
    })
    .to_string()
}

/// Build a single-status envelope body in the provider's wire shape.
pub fn status_envelope(
    waba: &str,
    phone_number_id: &str,
    recipient: &str,
    provider_message_id: &str,
    timestamp: &str,
    status: &str,
) -> String {
    serde_json::json!({
        "object": "whatsapp_business_account",
        "entry": [{
            "id": waba,
            "changes": [{
                "field": "messages",
                "value": {
                    "messaging_product": "whatsapp",
                    "metadata": {"phone_number_id": phone_number_id},
                    "statuses": [{
                        "id": provider_message_id,
                        "recipient_id": recipient,
                        "status": status,
                        "timestamp": timestamp
                    }]
                }
            }]
        }]
    })
    .to_string()
}
