// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tenant directory: provider phone identifier to canonical account.
//!
//! Historical records stored the tenant reference on a binding as
//! either the canonical opaque account id or the legacy short slug.
//! Resolution joins against both columns so every downstream component
//! sees exactly one canonical [`Account`] regardless of which form the
//! binding carries.
//!
//! Every call is a fresh read. Webhook deliveries can be retried over a
//! window long enough for bindings to change, so a cached binding would
//! route events to a tenant that no longer owns the number.

use rusqlite::params;
use tracing::debug;

use herald_core::HeraldError;

use crate::database::Database;
use crate::models::Account;
use crate::queries::accounts::map_account;

/// Resolve the tenant currently bound to a phone identifier.
///
/// `Ok(None)` is a legitimate steady state: the provider delivers
/// webhooks for numbers that were disconnected or never configured.
/// Only storage failures are errors.
pub async fn resolve_tenant(
    db: &Database,
    phone_number_id: &str,
) -> Result<Option<Account>, HeraldError> {
    let phone = phone_number_id.to_string();
    let resolved = db
        .connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT a.id, a.slug, a.display_name, a.status, a.created_at
                 FROM phone_bindings b
                 JOIN accounts a ON a.id = b.account_ref OR a.slug = b.account_ref
                 WHERE b.phone_number_id = ?1 AND b.active = 1",
            )?;
            let result = stmt.query_row(params![phone], map_account);
            match result {
                Ok(account) => Ok(Some(account)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)?;

    if resolved.is_none() {
        debug!(phone_number_id, "no active binding for phone identifier");
    }
    Ok(resolved)
}
