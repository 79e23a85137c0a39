// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation routing.
//!
//! Given a resolved tenant and a canonical event, loads the
//! conversation the event belongs to, creating it on first contact.
//! The composite key is always (tenant, phone identifier, counterpart)
//! built from the canonical tenant id; legacy reference forms never
//! reach this layer.

use herald_core::{HeraldError, InboundEvent};
use herald_storage::guard::TenantScope;
use herald_storage::models::Conversation;
use herald_storage::queries::conversations;
use herald_storage::Database;
use tracing::debug;

/// Load or lazily create the conversation for an event.
///
/// Creation is a schema-backed create-if-absent on the composite key:
/// two rapid first-contact events for the same thread land on one row.
/// Returns the conversation and whether this call created it.
pub async fn route_or_create(
    db: &Database,
    scope: &TenantScope,
    event: &InboundEvent,
) -> Result<(Conversation, bool), HeraldError> {
    let (conversation, created) =
        conversations::get_or_create(db, scope, &event.phone_number_id, &event.counterpart)
            .await?;
    if created {
        debug!(
            conversation = %conversation.id,
            phone_number_id = %event.phone_number_id,
            counterpart = %event.counterpart,
            "created conversation on first contact"
        );
    }
    Ok((conversation, created))
}
