// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The per-delivery ingestion pipeline.
//!
//! Control flow per webhook delivery:
//! signature check -> transport dedup -> envelope parse -> normalize ->
//! per event: resolve tenant -> route conversation -> upsert message or
//! apply status. Events run in provider order; one event's timeout or
//! failure never aborts its siblings. Storage unavailability aborts the
//! whole delivery with an error so the provider's redelivery recovers it.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use herald_core::types::EventKind;
use herald_core::{HeraldError, InboundEvent};
use herald_ingest::{normalize, verify_signature, WebhookEnvelope};
use herald_storage::guard::TenantScope;
use herald_storage::queries::{deliveries, messages};
use herald_storage::{Database, StatusUpdateOutcome, resolve_tenant};

use crate::router;

/// Pipeline tuning, derived from the ingest/provider config sections.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Shared HMAC secret for delivery signatures.
    pub app_secret: String,
    /// Per-event processing budget.
    pub event_timeout: Duration,
    /// Retention window for transport delivery records.
    pub delivery_retention: Duration,
}

/// Tallies for one processed delivery, returned in the webhook response.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProcessingSummary {
    /// Canonical events found in the envelope.
    pub events: usize,
    /// New messages stored.
    pub stored: usize,
    /// Messages already present (provider retry).
    pub duplicates: usize,
    /// Status callbacks applied.
    pub status_applied: usize,
    /// Status callbacks ignored as stale.
    pub status_stale: usize,
    /// Status callbacks for unknown provider message ids.
    pub status_unknown: usize,
    /// Events whose phone identifier had no active binding.
    pub unmatched: usize,
    /// Events that failed or timed out individually.
    pub failed: usize,
    /// Whole delivery was a byte-identical retry; nothing processed.
    pub redelivered: bool,
}

enum EventOutcome {
    Stored,
    Duplicate,
    StatusApplied,
    StatusStale,
    StatusUnknown,
    Unmatched,
}

/// The webhook ingestion pipeline. One instance serves all requests;
/// it holds no per-request state.
pub struct WebhookPipeline {
    db: Arc<Database>,
    config: PipelineConfig,
}

impl WebhookPipeline {
    pub fn new(db: Arc<Database>, config: PipelineConfig) -> Self {
        Self { db, config }
    }

    /// Process one webhook delivery from its raw body and signature header.
    ///
    /// Errors out only for conditions the provider should retry or fix:
    /// bad signature, unparseable body, storage unavailable. Everything
    /// else (unmatched tenants, duplicates, stale statuses, malformed
    /// sub-events) is an acknowledged steady state in the summary.
    pub async fn process(
        &self,
        raw_body: &[u8],
        signature_header: Option<&str>,
    ) -> Result<ProcessingSummary, HeraldError> {
        if let Err(e) = verify_signature(&self.config.app_secret, raw_body, signature_header) {
            metrics::counter!("herald_webhook_deliveries_total", "outcome" => "rejected")
                .increment(1);
            return Err(e);
        }

        // Transport-level idempotency: a byte-identical retry of an
        // already-processed delivery is acknowledged without touching
        // the event pipeline.
        let delivery_key = hex::encode(Sha256::digest(raw_body));
        if !deliveries::record_delivery(&self.db, &delivery_key).await? {
            info!(%delivery_key, "acknowledging redelivered webhook body");
            metrics::counter!("herald_webhook_deliveries_total", "outcome" => "redelivered")
                .increment(1);
            return Ok(ProcessingSummary {
                redelivered: true,
                ..ProcessingSummary::default()
            });
        }

        let envelope = match WebhookEnvelope::parse(raw_body) {
            Ok(envelope) => envelope,
            Err(e) => {
                // The record must not mask a redelivery of a body we
                // never actually processed.
                let _ = deliveries::remove_delivery(&self.db, &delivery_key).await;
                metrics::counter!("herald_webhook_deliveries_total", "outcome" => "malformed")
                    .increment(1);
                return Err(e);
            }
        };

        let events = normalize(&envelope);
        let mut summary = ProcessingSummary {
            events: events.len(),
            ..ProcessingSummary::default()
        };

        for event in &events {
            match tokio::time::timeout(self.config.event_timeout, self.apply_event(event)).await {
                Ok(Ok(outcome)) => match outcome {
                    EventOutcome::Stored => summary.stored += 1,
                    EventOutcome::Duplicate => summary.duplicates += 1,
                    EventOutcome::StatusApplied => summary.status_applied += 1,
                    EventOutcome::StatusStale => summary.status_stale += 1,
                    EventOutcome::StatusUnknown => summary.status_unknown += 1,
                    EventOutcome::Unmatched => summary.unmatched += 1,
                },
                Ok(Err(e @ HeraldError::Storage { .. })) => {
                    // Store down: fail the delivery so the provider
                    // retries it, and free the delivery record.
                    let _ = deliveries::remove_delivery(&self.db, &delivery_key).await;
                    return Err(e);
                }
                Ok(Err(e)) => {
                    warn!(
                        provider_message_id = %event.provider_message_id,
                        error = %e,
                        "event processing failed"
                    );
                    metrics::counter!("herald_ingest_events_total", "outcome" => "failed")
                        .increment(1);
                    summary.failed += 1;
                }
                Err(_) => {
                    warn!(
                        provider_message_id = %event.provider_message_id,
                        timeout = ?self.config.event_timeout,
                        "event processing timed out"
                    );
                    metrics::counter!("herald_ingest_events_total", "outcome" => "timeout")
                        .increment(1);
                    summary.failed += 1;
                }
            }
        }

        // Opportunistic retention pass; never fails the request.
        let cutoff = (chrono::Utc::now()
            - chrono::Duration::from_std(self.config.delivery_retention)
                .unwrap_or(chrono::Duration::hours(72)))
        .to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
        if let Err(e) = deliveries::prune_deliveries(&self.db, &cutoff).await {
            warn!(error = %e, "delivery record pruning failed");
        }

        metrics::counter!("herald_webhook_deliveries_total", "outcome" => "accepted").increment(1);
        Ok(summary)
    }

    /// Apply one canonical event end to end.
    async fn apply_event(&self, event: &InboundEvent) -> Result<EventOutcome, HeraldError> {
        let Some(account) = resolve_tenant(&self.db, &event.phone_number_id).await? else {
            warn!(
                phone_number_id = %event.phone_number_id,
                business_account_id = %event.business_account_id,
                "webhook event for phone with no active tenant binding"
            );
            metrics::counter!("herald_ingest_events_total", "outcome" => "unmatched").increment(1);
            return Ok(EventOutcome::Unmatched);
        };
        let scope = TenantScope::for_account(&account);

        match &event.kind {
            EventKind::NewMessage { kind, payload } => {
                let (conversation, _) = router::route_or_create(&self.db, &scope, event).await?;
                let (_, created) = messages::upsert_inbound(
                    &self.db,
                    &scope,
                    &conversation,
                    &event.provider_message_id,
                    *kind,
                    payload,
                    &event.provider_timestamp,
                )
                .await?;
                if created {
                    metrics::counter!("herald_ingest_events_total", "outcome" => "stored")
                        .increment(1);
                    Ok(EventOutcome::Stored)
                } else {
                    metrics::counter!("herald_ingest_events_total", "outcome" => "duplicate")
                        .increment(1);
                    Ok(EventOutcome::Duplicate)
                }
            }
            EventKind::StatusUpdate { status } => {
                let outcome = messages::apply_status_update(
                    &self.db,
                    &scope,
                    &event.provider_message_id,
                    *status,
                )
                .await?;
                Ok(match outcome {
                    StatusUpdateOutcome::Applied(_) => EventOutcome::StatusApplied,
                    StatusUpdateOutcome::Stale(_) => EventOutcome::StatusStale,
                    StatusUpdateOutcome::NotFound => EventOutcome::StatusUnknown,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use herald_core::TenantId;
    use herald_ingest::sign;
    use herald_storage::models::{Account, AccountStatus};
    use herald_storage::queries::accounts::create_account;
    use herald_storage::queries::bindings::create_binding;
    use herald_storage::queries::conversations::list_conversations;
    use tempfile::tempdir;

    const SECRET: &str = "pipeline-secret";

    async fn setup() -> (WebhookPipeline, Arc<Database>, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db = Arc::new(
            Database::open(dir.path().join("p.db").to_str().unwrap())
                .await
                .unwrap(),
        );
        let account = Account {
            id: TenantId("acct-1".into()),
            slug: None,
            display_name: "T1".into(),
            status: AccountStatus::Active,
            created_at: "2026-01-01T00:00:00.000Z".into(),
        };
        create_account(&db, &account).await.unwrap();
        create_binding(&db, "pn-1", "waba-1", "acct-1", None)
            .await
            .unwrap();
        let pipeline = WebhookPipeline::new(
            db.clone(),
            PipelineConfig {
                app_secret: SECRET.into(),
                event_timeout: Duration::from_secs(5),
                delivery_retention: Duration::from_secs(72 * 3600),
            },
        );
        (pipeline, db, dir)
    }

    fn message_body(phone: &str, msg_id: &str, text: &str) -> String {
        format!(
            r#"{{"object":"whatsapp_business_account","entry":[{{"id":"waba-1","changes":[{{"value":{{"metadata":{{"phone_number_id":"{phone}"}},"messages":[{{"from":"15551234567","id":"{msg_id}","timestamp":"1760000000","type":"text","text":{{"body":"{text}"}}}}]}}}}]}}]}}"#
        )
    }

    #[tokio::test]
    async fn accepted_delivery_stores_message_and_conversation() {
        let (pipeline, db, _dir) = setup().await;
        let body = message_body("pn-1", "wamid.1", "hello");
        let header = sign(SECRET, body.as_bytes());

        let summary = pipeline
            .process(body.as_bytes(), Some(&header))
            .await
            .unwrap();
        assert_eq!(summary.events, 1);
        assert_eq!(summary.stored, 1);
        assert_eq!(summary.unmatched, 0);

        let scope = TenantScope::new(TenantId("acct-1".into()));
        let conversations = list_conversations(&db, &scope).await.unwrap();
        assert_eq!(conversations.len(), 1);
        assert_eq!(conversations[0].message_count, 1);
    }

    #[tokio::test]
    async fn byte_identical_retry_is_acknowledged_without_processing() {
        let (pipeline, db, _dir) = setup().await;
        let body = message_body("pn-1", "wamid.1", "hello");
        let header = sign(SECRET, body.as_bytes());

        pipeline
            .process(body.as_bytes(), Some(&header))
            .await
            .unwrap();
        let retry = pipeline
            .process(body.as_bytes(), Some(&header))
            .await
            .unwrap();
        assert!(retry.redelivered);
        assert_eq!(retry.stored, 0);

        let scope = TenantScope::new(TenantId("acct-1".into()));
        let conversations = list_conversations(&db, &scope).await.unwrap();
        assert_eq!(conversations[0].message_count, 1);
    }

    #[tokio::test]
    async fn rewrapped_retry_hits_message_idempotency() {
        let (pipeline, db, _dir) = setup().await;
        let body = message_body("pn-1", "wamid.1", "hello");
        let header = sign(SECRET, body.as_bytes());
        pipeline
            .process(body.as_bytes(), Some(&header))
            .await
            .unwrap();

        // The provider may rebatch a retried message into a different
        // envelope; the body digest differs but the message id repeats.
        let rebatched = format!(
            r#"{{"object":"whatsapp_business_account","entry":[{{"id":"waba-1","changes":[{{"value":{{"metadata":{{"phone_number_id":"pn-1"}},"messages":[{{"from":"15551234567","id":"wamid.1","timestamp":"1760000000","type":"text","text":{{"body":"hello"}}}},{{"from":"15551234567","id":"wamid.2","timestamp":"1760000001","type":"text","text":{{"body":"again"}}}}]}}}}]}}]}}"#
        );
        let header = sign(SECRET, rebatched.as_bytes());
        let summary = pipeline
            .process(rebatched.as_bytes(), Some(&header))
            .await
            .unwrap();
        assert_eq!(summary.duplicates, 1);
        assert_eq!(summary.stored, 1);

        let scope = TenantScope::new(TenantId("acct-1".into()));
        let conversations = list_conversations(&db, &scope).await.unwrap();
        assert_eq!(conversations[0].message_count, 2);
    }

    #[tokio::test]
    async fn unknown_phone_is_acknowledged_with_warning() {
        let (pipeline, db, _dir) = setup().await;
        let body = message_body("pn-unknown", "wamid.9", "hi");
        let header = sign(SECRET, body.as_bytes());

        let summary = pipeline
            .process(body.as_bytes(), Some(&header))
            .await
            .unwrap();
        assert_eq!(summary.unmatched, 1);
        assert_eq!(summary.stored, 0);

        let scope = TenantScope::new(TenantId("acct-1".into()));
        assert!(list_conversations(&db, &scope).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn tampered_body_is_unauthenticated() {
        let (pipeline, _db, _dir) = setup().await;
        let body = message_body("pn-1", "wamid.1", "hello");
        let header = sign(SECRET, body.as_bytes());
        let tampered = body.replace("hello", "hell0");

        let err = pipeline
            .process(tampered.as_bytes(), Some(&header))
            .await
            .unwrap_err();
        assert!(matches!(err, HeraldError::Unauthenticated { .. }));
    }

    #[tokio::test]
    async fn unparseable_body_is_malformed_and_retriable() {
        let (pipeline, _db, _dir) = setup().await;
        let body = b"{ not an envelope";
        let header = sign(SECRET, body);

        let err = pipeline.process(body, Some(&header)).await.unwrap_err();
        assert!(matches!(err, HeraldError::MalformedEnvelope { .. }));

        // The delivery record was compensated away: a later valid parse
        // of the same bytes would not be skipped as a redelivery.
        let err = pipeline.process(body, Some(&header)).await.unwrap_err();
        assert!(matches!(err, HeraldError::MalformedEnvelope { .. }));
    }

    #[tokio::test]
    async fn status_lattice_applies_across_deliveries() {
        let (pipeline, _db, _dir) = setup().await;
        let body = message_body("pn-1", "wamid.s", "hi");
        let header = sign(SECRET, body.as_bytes());
        pipeline
            .process(body.as_bytes(), Some(&header))
            .await
            .unwrap();

        let status_body = |status: &str, ts: &str| {
            format!(
                r#"{{"object":"whatsapp_business_account","entry":[{{"id":"waba-1","changes":[{{"value":{{"metadata":{{"phone_number_id":"pn-1"}},"statuses":[{{"id":"wamid.s","recipient_id":"15551234567","status":"{status}","timestamp":"{ts}"}}]}}}}]}}]}}"#
            )
        };

        let sent = status_body("sent", "1760000001");
        let summary = pipeline
            .process(sent.as_bytes(), Some(&sign(SECRET, sent.as_bytes())))
            .await
            .unwrap();
        assert_eq!(summary.status_applied, 1);

        let read = status_body("read", "1760000002");
        let summary = pipeline
            .process(read.as_bytes(), Some(&sign(SECRET, read.as_bytes())))
            .await
            .unwrap();
        assert_eq!(summary.status_applied, 1);

        // Out-of-order delivered arrives last and is ignored as stale.
        let delivered = status_body("delivered", "1760000003");
        let summary = pipeline
            .process(delivered.as_bytes(), Some(&sign(SECRET, delivered.as_bytes())))
            .await
            .unwrap();
        assert_eq!(summary.status_stale, 1);
        assert_eq!(summary.status_applied, 0);
    }
}
