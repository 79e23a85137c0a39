// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message persistence: idempotent inbound upsert, forward-only status
//! updates, and scoped reads.
//!
//! The upsert is a conditional insert on `(account_id,
//! provider_message_id)`, not read-then-write: provider delivery is
//! at-least-once and concurrent redelivery must collapse to one row.
//! Conversation counters move in the same transaction as the insert so
//! conversation and message state never diverge.

use rusqlite::params;
use tracing::debug;

use herald_core::types::{Direction, MessageKind, MessageStatus};
use herald_core::{ConversationId, HeraldError, TenantId};

use crate::database::{Database, now_timestamp};
use crate::guard::TenantScope;
use crate::models::{Conversation, Message};
use crate::queries::parse_enum_column;

const MESSAGE_COLUMNS: &str = "id, provider_message_id, conversation_id, account_id, direction, \
     kind, payload, provider_timestamp, status, created_at";

fn map_message(row: &rusqlite::Row<'_>) -> Result<Message, rusqlite::Error> {
    Ok(Message {
        id: row.get(0)?,
        provider_message_id: row.get(1)?,
        conversation_id: ConversationId(row.get(2)?),
        account_id: TenantId(row.get(3)?),
        direction: parse_enum_column::<Direction>(4, row.get(4)?)?,
        kind: parse_enum_column::<MessageKind>(5, row.get(5)?)?,
        payload: row.get(6)?,
        provider_timestamp: row.get(7)?,
        status: parse_enum_column::<MessageStatus>(8, row.get(8)?)?,
        created_at: row.get(9)?,
    })
}

/// Result of applying a status callback.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusUpdateOutcome {
    /// The transition was forward and has been stored.
    Applied(Message),
    /// The callback would move status backward; the stored row stands.
    Stale(Message),
    /// No message with that provider id exists in this scope.
    NotFound,
}

/// Store an inbound message idempotently.
///
/// Returns the stored row and whether this call inserted it. A retried
/// delivery returns the original row unchanged and leaves conversation
/// counters alone.
pub async fn upsert_inbound(
    db: &Database,
    scope: &TenantScope,
    conversation: &Conversation,
    provider_message_id: &str,
    kind: MessageKind,
    payload: &str,
    provider_timestamp: &str,
) -> Result<(Message, bool), HeraldError> {
    scope.assert_owns(conversation)?;

    let account_id = scope.sql_param();
    let conversation_id = conversation.id.0.clone();
    let provider_message_id = provider_message_id.to_string();
    let payload = payload.to_string();
    let provider_timestamp = provider_timestamp.to_string();
    let new_id = uuid::Uuid::new_v4().to_string();

    let (message, created) = db
        .connection()
        .call(move |conn| {
            let now = now_timestamp();
            let tx = conn.transaction()?;
            let inserted = tx.execute(
                "INSERT INTO messages
                     (id, provider_message_id, conversation_id, account_id, direction, kind,
                      payload, provider_timestamp, status, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                 ON CONFLICT (account_id, provider_message_id) DO NOTHING",
                params![
                    new_id,
                    provider_message_id,
                    conversation_id,
                    account_id,
                    Direction::Inbound.to_string(),
                    kind.to_string(),
                    payload,
                    provider_timestamp,
                    MessageStatus::Received.to_string(),
                    now,
                ],
            )?;
            if inserted == 1 {
                // max() keeps last_activity monotone even if an older
                // event lands after a newer sibling.
                tx.execute(
                    "UPDATE conversations
                     SET message_count = message_count + 1,
                         last_activity_at = max(last_activity_at, ?1)
                     WHERE id = ?2 AND account_id = ?3",
                    params![provider_timestamp, conversation_id, account_id],
                )?;
            }
            let message = tx.query_row(
                &format!(
                    "SELECT {MESSAGE_COLUMNS} FROM messages
                     WHERE account_id = ?1 AND provider_message_id = ?2"
                ),
                params![account_id, provider_message_id],
                map_message,
            )?;
            tx.commit()?;
            Ok((message, inserted == 1))
        })
        .await
        .map_err(crate::database::map_tr_err)?;

    scope.assert_owns(&message)?;
    Ok((message, created))
}

/// Apply a delivery-status callback under the forward-only lattice.
///
/// Stale (backward or repeated) transitions are ignored; the provider
/// redelivers status callbacks freely and the stored status must never
/// regress.
pub async fn apply_status_update(
    db: &Database,
    scope: &TenantScope,
    provider_message_id: &str,
    new_status: MessageStatus,
) -> Result<StatusUpdateOutcome, HeraldError> {
    let account_id = scope.sql_param();
    let message_key = provider_message_id.to_string();

    let outcome = db
        .connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let existing = {
                let mut stmt = tx.prepare(&format!(
                    "SELECT {MESSAGE_COLUMNS} FROM messages
                     WHERE account_id = ?1 AND provider_message_id = ?2"
                ))?;
                match stmt.query_row(params![account_id, message_key], map_message) {
                    Ok(message) => Some(message),
                    Err(rusqlite::Error::QueryReturnedNoRows) => None,
                    Err(e) => return Err(e.into()),
                }
            };

            let Some(existing) = existing else {
                tx.commit()?;
                return Ok(StatusUpdateOutcome::NotFound);
            };

            if !existing.status.accepts(new_status) {
                tx.commit()?;
                return Ok(StatusUpdateOutcome::Stale(existing));
            }

            tx.execute(
                "UPDATE messages SET status = ?1
                 WHERE account_id = ?2 AND provider_message_id = ?3",
                params![new_status.to_string(), account_id, message_key],
            )?;
            let updated = Message {
                status: new_status,
                ..existing
            };
            tx.commit()?;
            Ok(StatusUpdateOutcome::Applied(updated))
        })
        .await
        .map_err(crate::database::map_tr_err)?;

    match &outcome {
        StatusUpdateOutcome::Applied(message) | StatusUpdateOutcome::Stale(message) => {
            scope.assert_owns(message)?;
            if matches!(outcome, StatusUpdateOutcome::Stale(_)) {
                debug!(
                    provider_message_id = %message.provider_message_id,
                    stored = %message.status,
                    "ignoring stale status callback"
                );
            }
        }
        StatusUpdateOutcome::NotFound => {
            debug!(provider_message_id, "status callback for unknown message");
        }
    }
    Ok(outcome)
}

/// List a conversation's messages in provider-timestamp order.
///
/// `before` is an exclusive keyset bound on the provider timestamp for
/// paging backwards through history.
pub async fn list_messages(
    db: &Database,
    scope: &TenantScope,
    conversation_id: &ConversationId,
    limit: Option<i64>,
    before: Option<&str>,
) -> Result<Vec<Message>, HeraldError> {
    let account_id = scope.sql_param();
    let conversation_id = conversation_id.0.clone();
    let before = before.map(|s| s.to_string());

    let messages = db
        .connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages
                 WHERE conversation_id = ?1 AND account_id = ?2
                   AND (?3 IS NULL OR provider_timestamp < ?3)
                 ORDER BY provider_timestamp ASC
                 LIMIT ?4"
            ))?;
            let rows = stmt.query_map(
                params![conversation_id, account_id, before, limit.unwrap_or(-1)],
                map_message,
            )?;
            let mut messages = Vec::new();
            for row in rows {
                messages.push(row?);
            }
            Ok(messages)
        })
        .await
        .map_err(crate::database::map_tr_err)?;

    for message in &messages {
        scope.assert_owns(message)?;
    }
    Ok(messages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Account, AccountStatus};
    use crate::queries::accounts::create_account;
    use crate::queries::conversations::{get_conversation, get_or_create};
    use tempfile::tempdir;

    async fn setup() -> (Database, TenantScope, Conversation, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        let account = Account {
            id: TenantId("acct-1".into()),
            slug: None,
            display_name: "Test Tenant".into(),
            status: AccountStatus::Active,
            created_at: "2026-01-01T00:00:00.000Z".into(),
        };
        create_account(&db, &account).await.unwrap();
        let scope = TenantScope::for_account(&account);
        let (conversation, _) = get_or_create(&db, &scope, "pn-1", "15551234567")
            .await
            .unwrap();
        (db, scope, conversation, dir)
    }

    #[tokio::test]
    async fn upsert_stores_message_and_bumps_counter() {
        let (db, scope, conversation, _dir) = setup().await;

        let (message, created) = upsert_inbound(
            &db,
            &scope,
            &conversation,
            "wamid.1",
            MessageKind::Text,
            r#"{"body":"hello"}"#,
            "2026-01-02T10:00:00.000Z",
        )
        .await
        .unwrap();
        assert!(created);
        assert_eq!(message.direction, Direction::Inbound);
        assert_eq!(message.status, MessageStatus::Received);

        let refreshed = get_conversation(&db, &scope, &conversation.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(refreshed.message_count, 1);
        assert_eq!(refreshed.last_activity_at, "2026-01-02T10:00:00.000Z");
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn duplicate_provider_id_is_a_noop() {
        let (db, scope, conversation, _dir) = setup().await;

        let (first, created_first) = upsert_inbound(
            &db,
            &scope,
            &conversation,
            "wamid.1",
            MessageKind::Text,
            r#"{"body":"hello"}"#,
            "2026-01-02T10:00:00.000Z",
        )
        .await
        .unwrap();
        let (second, created_second) = upsert_inbound(
            &db,
            &scope,
            &conversation,
            "wamid.1",
            MessageKind::Text,
            r#"{"body":"hello"}"#,
            "2026-01-02T10:00:00.000Z",
        )
        .await
        .unwrap();

        assert!(created_first);
        assert!(!created_second);
        assert_eq!(first.id, second.id);

        let refreshed = get_conversation(&db, &scope, &conversation.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(refreshed.message_count, 1, "retry must not bump counters");
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn same_provider_id_under_other_tenant_is_distinct() {
        let (db, scope_a, conversation_a, _dir) = setup().await;
        let account_b = Account {
            id: TenantId("acct-b".into()),
            slug: None,
            display_name: "Tenant B".into(),
            status: AccountStatus::Active,
            created_at: "2026-01-01T00:00:00.000Z".into(),
        };
        create_account(&db, &account_b).await.unwrap();
        let scope_b = TenantScope::for_account(&account_b);
        let (conversation_b, _) = get_or_create(&db, &scope_b, "pn-b", "15551234567")
            .await
            .unwrap();

        let (_, created_a) = upsert_inbound(
            &db, &scope_a, &conversation_a,
            "wamid.shared", MessageKind::Text, "{}", "2026-01-02T10:00:00.000Z",
        )
        .await
        .unwrap();
        let (_, created_b) = upsert_inbound(
            &db, &scope_b, &conversation_b,
            "wamid.shared", MessageKind::Text, "{}", "2026-01-02T10:00:00.000Z",
        )
        .await
        .unwrap();

        // Idempotency is scoped per tenant, not global.
        assert!(created_a);
        assert!(created_b);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn upsert_under_wrong_scope_is_denied() {
        let (db, _scope, conversation, _dir) = setup().await;
        let wrong_scope = TenantScope::new(TenantId("acct-intruder".into()));

        let err = upsert_inbound(
            &db, &wrong_scope, &conversation,
            "wamid.1", MessageKind::Text, "{}", "2026-01-02T10:00:00.000Z",
        )
        .await
        .unwrap_err();
        assert!(matches!(err, HeraldError::AccessDenied { .. }));
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn status_updates_follow_the_lattice() {
        let (db, scope, conversation, _dir) = setup().await;
        upsert_inbound(
            &db, &scope, &conversation,
            "wamid.out", MessageKind::Text, "{}", "2026-01-02T10:00:00.000Z",
        )
        .await
        .unwrap();

        // received -> sent -> read applies; late delivered is stale.
        let sent = apply_status_update(&db, &scope, "wamid.out", MessageStatus::Sent)
            .await
            .unwrap();
        assert!(matches!(sent, StatusUpdateOutcome::Applied(_)));

        let read = apply_status_update(&db, &scope, "wamid.out", MessageStatus::Read)
            .await
            .unwrap();
        assert!(matches!(read, StatusUpdateOutcome::Applied(_)));

        let late = apply_status_update(&db, &scope, "wamid.out", MessageStatus::Delivered)
            .await
            .unwrap();
        let StatusUpdateOutcome::Stale(stored) = late else {
            panic!("expected Stale, got {late:?}");
        };
        assert_eq!(stored.status, MessageStatus::Read);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn any_state_may_move_to_failed_once() {
        let (db, scope, conversation, _dir) = setup().await;
        upsert_inbound(
            &db, &scope, &conversation,
            "wamid.f", MessageKind::Text, "{}", "2026-01-02T10:00:00.000Z",
        )
        .await
        .unwrap();

        let failed = apply_status_update(&db, &scope, "wamid.f", MessageStatus::Failed)
            .await
            .unwrap();
        assert!(matches!(failed, StatusUpdateOutcome::Applied(_)));

        // Terminal: nothing applies after failed, including failed again.
        let again = apply_status_update(&db, &scope, "wamid.f", MessageStatus::Failed)
            .await
            .unwrap();
        assert!(matches!(again, StatusUpdateOutcome::Stale(_)));
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn status_update_for_unknown_message_is_not_found() {
        let (db, scope, _conversation, _dir) = setup().await;
        let outcome = apply_status_update(&db, &scope, "wamid.ghost", MessageStatus::Delivered)
            .await
            .unwrap();
        assert_eq!(outcome, StatusUpdateOutcome::NotFound);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn list_messages_orders_and_pages() {
        let (db, scope, conversation, _dir) = setup().await;
        for (i, ts) in ["2026-01-02T10:00:01.000Z", "2026-01-02T10:00:02.000Z", "2026-01-02T10:00:03.000Z"]
            .iter()
            .enumerate()
        {
            upsert_inbound(
                &db, &scope, &conversation,
                &format!("wamid.{i}"), MessageKind::Text, "{}", ts,
            )
            .await
            .unwrap();
        }

        let all = list_messages(&db, &scope, &conversation.id, None, None)
            .await
            .unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].provider_message_id, "wamid.0");
        assert_eq!(all[2].provider_message_id, "wamid.2");

        let page = list_messages(
            &db,
            &scope,
            &conversation.id,
            Some(10),
            Some("2026-01-02T10:00:03.000Z"),
        )
        .await
        .unwrap();
        assert_eq!(page.len(), 2);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn list_messages_is_tenant_scoped() {
        let (db, scope, conversation, _dir) = setup().await;
        upsert_inbound(
            &db, &scope, &conversation,
            "wamid.1", MessageKind::Text, "{}", "2026-01-02T10:00:00.000Z",
        )
        .await
        .unwrap();

        let other = TenantScope::new(TenantId("acct-other".into()));
        let seen = list_messages(&db, &other, &conversation.id, None, None)
            .await
            .unwrap();
        assert!(seen.is_empty());
        db.close().await.unwrap();
    }
}
