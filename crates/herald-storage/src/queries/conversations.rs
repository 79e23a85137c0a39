// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation operations.
//!
//! Creation is conditional-insert-then-fetch on the composite key
//! `(account_id, phone_number_id, counterpart)`, executed on the single
//! writer thread: two concurrent first-contact events cannot produce
//! two rows, and there is no read-then-write race to lose.

use rusqlite::params;

use herald_core::{ConversationId, HeraldError, TenantId};

use crate::database::{Database, now_timestamp};
use crate::guard::TenantScope;
use crate::models::{Conversation, ConversationStatus};
use crate::queries::parse_enum_column;

pub(crate) const CONVERSATION_COLUMNS: &str = "id, account_id, phone_number_id, counterpart, \
     status, message_count, created_at, last_activity_at";

pub(crate) fn map_conversation(row: &rusqlite::Row<'_>) -> Result<Conversation, rusqlite::Error> {
    Ok(Conversation {
        id: ConversationId(row.get(0)?),
        account_id: TenantId(row.get(1)?),
        phone_number_id: row.get(2)?,
        counterpart: row.get(3)?,
        status: parse_enum_column::<ConversationStatus>(4, row.get(4)?)?,
        message_count: row.get(5)?,
        created_at: row.get(6)?,
        last_activity_at: row.get(7)?,
    })
}

/// Load the conversation for a composite key, creating it if absent.
///
/// New conversations start open with a zero message count; counters
/// move only when a message is stored. Returns the row and whether it
/// was created by this call.
pub async fn get_or_create(
    db: &Database,
    scope: &TenantScope,
    phone_number_id: &str,
    counterpart: &str,
) -> Result<(Conversation, bool), HeraldError> {
    let account_id = scope.sql_param();
    let phone_number_id = phone_number_id.to_string();
    let counterpart = counterpart.to_string();
    let new_id = uuid::Uuid::new_v4().to_string();

    let (conversation, created) = db
        .connection()
        .call(move |conn| {
            let now = now_timestamp();
            let inserted = conn.execute(
                "INSERT INTO conversations
                     (id, account_id, phone_number_id, counterpart, status, message_count, created_at, last_activity_at)
                 VALUES (?1, ?2, ?3, ?4, 'open', 0, ?5, ?5)
                 ON CONFLICT (account_id, phone_number_id, counterpart) DO NOTHING",
                params![new_id, account_id, phone_number_id, counterpart, now],
            )?;
            let conversation = conn.query_row(
                &format!(
                    "SELECT {CONVERSATION_COLUMNS} FROM conversations
                     WHERE account_id = ?1 AND phone_number_id = ?2 AND counterpart = ?3"
                ),
                params![account_id, phone_number_id, counterpart],
                map_conversation,
            )?;
            Ok((conversation, inserted == 1))
        })
        .await
        .map_err(crate::database::map_tr_err)?;

    scope.assert_owns(&conversation)?;
    Ok((conversation, created))
}

/// Fetch a conversation by id within the scope.
pub async fn get_conversation(
    db: &Database,
    scope: &TenantScope,
    id: &ConversationId,
) -> Result<Option<Conversation>, HeraldError> {
    let account_id = scope.sql_param();
    let id = id.0.clone();
    let found = db
        .connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CONVERSATION_COLUMNS} FROM conversations
                 WHERE id = ?1 AND account_id = ?2"
            ))?;
            let result = stmt.query_row(params![id, account_id], map_conversation);
            match result {
                Ok(conversation) => Ok(Some(conversation)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)?;

    if let Some(conversation) = &found {
        scope.assert_owns(conversation)?;
    }
    Ok(found)
}

/// List the scope's conversations, most recently active first.
pub async fn list_conversations(
    db: &Database,
    scope: &TenantScope,
) -> Result<Vec<Conversation>, HeraldError> {
    let account_id = scope.sql_param();
    let conversations = db
        .connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CONVERSATION_COLUMNS} FROM conversations
                 WHERE account_id = ?1 ORDER BY last_activity_at DESC"
            ))?;
            let rows = stmt.query_map(params![account_id], map_conversation)?;
            let mut conversations = Vec::new();
            for row in rows {
                conversations.push(row?);
            }
            Ok(conversations)
        })
        .await
        .map_err(crate::database::map_tr_err)?;

    for conversation in &conversations {
        scope.assert_owns(conversation)?;
    }
    Ok(conversations)
}

/// Set a conversation's status (open/archived). Returns whether a row
/// in the scope was updated.
pub async fn set_conversation_status(
    db: &Database,
    scope: &TenantScope,
    id: &ConversationId,
    status: ConversationStatus,
) -> Result<bool, HeraldError> {
    let account_id = scope.sql_param();
    let id = id.0.clone();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE conversations SET status = ?1 WHERE id = ?2 AND account_id = ?3",
                params![status.to_string(), id, account_id],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Account, AccountStatus};
    use crate::queries::accounts::create_account;
    use tempfile::tempdir;

    async fn setup_db_with_account(id: &str) -> (Database, TenantScope, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        let account = Account {
            id: TenantId(id.into()),
            slug: None,
            display_name: "Test Tenant".into(),
            status: AccountStatus::Active,
            created_at: "2026-01-01T00:00:00.000Z".into(),
        };
        create_account(&db, &account).await.unwrap();
        let scope = TenantScope::for_account(&account);
        (db, scope, dir)
    }

    #[tokio::test]
    async fn first_contact_creates_open_conversation() {
        let (db, scope, _dir) = setup_db_with_account("acct-1").await;

        let (conversation, created) = get_or_create(&db, &scope, "pn-1", "15551234567")
            .await
            .unwrap();
        assert!(created);
        assert_eq!(conversation.status, ConversationStatus::Open);
        assert_eq!(conversation.message_count, 0);
        assert_eq!(conversation.account_id, TenantId("acct-1".into()));
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn repeated_get_or_create_returns_same_row() {
        let (db, scope, _dir) = setup_db_with_account("acct-1").await;

        let (first, created_first) = get_or_create(&db, &scope, "pn-1", "15551234567")
            .await
            .unwrap();
        let (second, created_second) = get_or_create(&db, &scope, "pn-1", "15551234567")
            .await
            .unwrap();
        assert!(created_first);
        assert!(!created_second);
        assert_eq!(first.id, second.id);

        let all = list_conversations(&db, &scope).await.unwrap();
        assert_eq!(all.len(), 1);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn concurrent_first_contact_yields_one_conversation() {
        let (db, scope, _dir) = setup_db_with_account("acct-1").await;
        let db = std::sync::Arc::new(db);

        let mut handles = Vec::new();
        for _ in 0..8 {
            let db = db.clone();
            let scope = scope.clone();
            handles.push(tokio::spawn(async move {
                get_or_create(&db, &scope, "pn-1", "15551234567").await
            }));
        }

        let mut ids = std::collections::HashSet::new();
        let mut creations = 0;
        for handle in handles {
            let (conversation, created) = handle.await.unwrap().unwrap();
            ids.insert(conversation.id.0.clone());
            if created {
                creations += 1;
            }
        }
        assert_eq!(ids.len(), 1, "all tasks must land on one row");
        assert_eq!(creations, 1, "exactly one task creates");
    }

    #[tokio::test]
    async fn distinct_counterparts_get_distinct_conversations() {
        let (db, scope, _dir) = setup_db_with_account("acct-1").await;

        get_or_create(&db, &scope, "pn-1", "15551230001").await.unwrap();
        get_or_create(&db, &scope, "pn-1", "15551230002").await.unwrap();

        let all = list_conversations(&db, &scope).await.unwrap();
        assert_eq!(all.len(), 2);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn scope_cannot_see_other_tenants_conversations() {
        let (db, scope_a, _dir) = setup_db_with_account("acct-a").await;
        let account_b = Account {
            id: TenantId("acct-b".into()),
            slug: None,
            display_name: "Tenant B".into(),
            status: AccountStatus::Active,
            created_at: "2026-01-01T00:00:00.000Z".into(),
        };
        create_account(&db, &account_b).await.unwrap();
        let scope_b = TenantScope::for_account(&account_b);

        let (conv_a, _) = get_or_create(&db, &scope_a, "pn-a", "15551230001")
            .await
            .unwrap();
        get_or_create(&db, &scope_b, "pn-b", "15551230001")
            .await
            .unwrap();

        let seen_by_b = list_conversations(&db, &scope_b).await.unwrap();
        assert_eq!(seen_by_b.len(), 1);
        assert!(seen_by_b.iter().all(|c| c.account_id == TenantId("acct-b".into())));

        // Fetching A's conversation under B's scope finds nothing.
        let cross = get_conversation(&db, &scope_b, &conv_a.id).await.unwrap();
        assert!(cross.is_none());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn archive_is_scoped_and_reversible() {
        let (db, scope, _dir) = setup_db_with_account("acct-1").await;
        let (conversation, _) = get_or_create(&db, &scope, "pn-1", "15551234567")
            .await
            .unwrap();

        assert!(
            set_conversation_status(&db, &scope, &conversation.id, ConversationStatus::Archived)
                .await
                .unwrap()
        );
        let archived = get_conversation(&db, &scope, &conversation.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(archived.status, ConversationStatus::Archived);

        let other_scope = TenantScope::new(TenantId("acct-x".into()));
        assert!(
            !set_conversation_status(&db, &other_scope, &conversation.id, ConversationStatus::Open)
                .await
                .unwrap()
        );
        db.close().await.unwrap();
    }
}
