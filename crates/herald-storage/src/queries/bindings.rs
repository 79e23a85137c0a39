// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Phone binding provisioning and lookup.
//!
//! A phone identifier has at most one active binding at any time; the
//! schema's partial unique index enforces it. Rebinding deactivates the
//! prior row in the same transaction, so no interleaving can observe
//! two active bindings.

use rusqlite::params;

use herald_core::HeraldError;

use crate::database::{Database, now_timestamp};
use crate::models::PhoneBinding;

const BINDING_COLUMNS: &str = "id, phone_number_id, business_account_id, account_ref, \
     display_number, active, created_at, deactivated_at";

fn map_binding(row: &rusqlite::Row<'_>) -> Result<PhoneBinding, rusqlite::Error> {
    Ok(PhoneBinding {
        id: row.get(0)?,
        phone_number_id: row.get(1)?,
        business_account_id: row.get(2)?,
        account_ref: row.get(3)?,
        display_number: row.get(4)?,
        active: row.get::<_, i64>(5)? != 0,
        created_at: row.get(6)?,
        deactivated_at: row.get(7)?,
    })
}

/// Create an active binding for a phone identifier.
///
/// Fails if the phone already has an active binding; use [`rebind`] to
/// move a number between tenants.
pub async fn create_binding(
    db: &Database,
    phone_number_id: &str,
    business_account_id: &str,
    account_ref: &str,
    display_number: Option<&str>,
) -> Result<PhoneBinding, HeraldError> {
    let phone_number_id = phone_number_id.to_string();
    let business_account_id = business_account_id.to_string();
    let account_ref = account_ref.to_string();
    let display_number = display_number.map(|s| s.to_string());
    db.connection()
        .call(move |conn| {
            let now = now_timestamp();
            conn.execute(
                "INSERT INTO phone_bindings
                     (phone_number_id, business_account_id, account_ref, display_number, active, created_at)
                 VALUES (?1, ?2, ?3, ?4, 1, ?5)",
                params![
                    phone_number_id,
                    business_account_id,
                    account_ref,
                    display_number,
                    now,
                ],
            )?;
            let id = conn.last_insert_rowid();
            let binding = conn.query_row(
                &format!("SELECT {BINDING_COLUMNS} FROM phone_bindings WHERE id = ?1"),
                params![id],
                map_binding,
            )?;
            Ok(binding)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Fetch the currently active binding for a phone identifier, if any.
pub async fn get_active_binding(
    db: &Database,
    phone_number_id: &str,
) -> Result<Option<PhoneBinding>, HeraldError> {
    let phone_number_id = phone_number_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {BINDING_COLUMNS} FROM phone_bindings
                 WHERE phone_number_id = ?1 AND active = 1"
            ))?;
            let result = stmt.query_row(params![phone_number_id], map_binding);
            match result {
                Ok(binding) => Ok(Some(binding)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Deactivate the active binding for a phone identifier.
///
/// Soft-update only; binding history is retained. Returns whether a
/// binding was actually deactivated.
pub async fn deactivate_binding(
    db: &Database,
    phone_number_id: &str,
) -> Result<bool, HeraldError> {
    let phone_number_id = phone_number_id.to_string();
    db.connection()
        .call(move |conn| {
            let now = now_timestamp();
            let changed = conn.execute(
                "UPDATE phone_bindings SET active = 0, deactivated_at = ?1
                 WHERE phone_number_id = ?2 AND active = 1",
                params![now, phone_number_id],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Atomically move a phone identifier to a new tenant.
///
/// The prior binding (if any) is deactivated and the new one inserted
/// in a single transaction, so the partial unique index never trips and
/// no reader can observe both active.
pub async fn rebind(
    db: &Database,
    phone_number_id: &str,
    business_account_id: &str,
    new_account_ref: &str,
    display_number: Option<&str>,
) -> Result<PhoneBinding, HeraldError> {
    let phone_number_id = phone_number_id.to_string();
    let business_account_id = business_account_id.to_string();
    let new_account_ref = new_account_ref.to_string();
    let display_number = display_number.map(|s| s.to_string());
    db.connection()
        .call(move |conn| {
            let now = now_timestamp();
            let tx = conn.transaction()?;
            tx.execute(
                "UPDATE phone_bindings SET active = 0, deactivated_at = ?1
                 WHERE phone_number_id = ?2 AND active = 1",
                params![now, phone_number_id],
            )?;
            tx.execute(
                "INSERT INTO phone_bindings
                     (phone_number_id, business_account_id, account_ref, display_number, active, created_at)
                 VALUES (?1, ?2, ?3, ?4, 1, ?5)",
                params![
                    phone_number_id,
                    business_account_id,
                    new_account_ref,
                    display_number,
                    now,
                ],
            )?;
            let id = tx.last_insert_rowid();
            let binding = tx.query_row(
                &format!("SELECT {BINDING_COLUMNS} FROM phone_bindings WHERE id = ?1"),
                params![id],
                map_binding,
            )?;
            tx.commit()?;
            Ok(binding)
        })
        .await
        .map_err(crate::database::map_tr_err)
}
