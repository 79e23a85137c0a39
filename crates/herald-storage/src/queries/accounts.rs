// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Account (tenant) operations.

use rusqlite::params;

use herald_core::{HeraldError, TenantId};

use crate::database::Database;
use crate::models::{Account, AccountStatus};
use crate::queries::parse_enum_column;

pub(crate) const ACCOUNT_COLUMNS: &str = "id, slug, display_name, status, created_at";

pub(crate) fn map_account(row: &rusqlite::Row<'_>) -> Result<Account, rusqlite::Error> {
    Ok(Account {
        id: TenantId(row.get(0)?),
        slug: row.get(1)?,
        display_name: row.get(2)?,
        status: parse_enum_column::<AccountStatus>(3, row.get(3)?)?,
        created_at: row.get(4)?,
    })
}

/// Create a new account.
pub async fn create_account(db: &Database, account: &Account) -> Result<(), HeraldError> {
    let account = account.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO accounts (id, slug, display_name, status, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    account.id.0,
                    account.slug,
                    account.display_name,
                    account.status.to_string(),
                    account.created_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Look up an account by canonical id OR legacy slug.
///
/// This is the normalization point for the two historical tenant
/// reference forms: whichever form the caller holds, the canonical
/// account row comes back.
pub async fn get_account(db: &Database, reference: &str) -> Result<Option<Account>, HeraldError> {
    let reference = reference.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = ?1 OR slug = ?1"
            ))?;
            let result = stmt.query_row(params![reference], map_account);
            match result {
                Ok(account) => Ok(Some(account)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}
