// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transport-level delivery deduplication.
//!
//! Tracks delivery keys (a digest of the raw body) already processed so
//! a byte-identical provider retry can be acknowledged without touching
//! the rest of the pipeline. Independent of per-message idempotency.

use rusqlite::params;

use herald_core::HeraldError;

use crate::database::{Database, now_timestamp};

/// Record a delivery key. Returns `true` if this is the first sighting.
pub async fn record_delivery(db: &Database, delivery_key: &str) -> Result<bool, HeraldError> {
    let delivery_key = delivery_key.to_string();
    db.connection()
        .call(move |conn| {
            let now = now_timestamp();
            let inserted = conn.execute(
                "INSERT INTO webhook_deliveries (delivery_key, received_at)
                 VALUES (?1, ?2)
                 ON CONFLICT (delivery_key) DO NOTHING",
                params![delivery_key, now],
            )?;
            Ok(inserted == 1)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Remove a single delivery record.
///
/// Compensation path: when processing fails after the key was recorded,
/// the record is removed so the provider's redelivery is not skipped.
pub async fn remove_delivery(db: &Database, delivery_key: &str) -> Result<(), HeraldError> {
    let delivery_key = delivery_key.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "DELETE FROM webhook_deliveries WHERE delivery_key = ?1",
                params![delivery_key],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Delete delivery records received before `cutoff`. Returns how many
/// rows were pruned.
pub async fn prune_deliveries(db: &Database, cutoff: &str) -> Result<usize, HeraldError> {
    let cutoff = cutoff.to_string();
    db.connection()
        .call(move |conn| {
            let pruned = conn.execute(
                "DELETE FROM webhook_deliveries WHERE received_at < ?1",
                params![cutoff],
            )?;
            Ok(pruned)
        })
        .await
        .map_err(crate::database::map_tr_err)
}
