// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain model types for storage entities.
//!
//! Column values for enum fields are the lowercase strum renderings;
//! timestamps are RFC 3339 UTC TEXT with millisecond precision.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use herald_core::types::{ConversationId, Direction, MessageKind, MessageStatus, TenantId};

/// Lifecycle status of a tenant account.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    Active,
    Suspended,
    Pending,
}

/// A customer organization, the unit of data isolation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Canonical opaque id. The only form downstream code ever sees.
    pub id: TenantId,
    /// Legacy human-assigned short id; bindings may still reference it.
    pub slug: Option<String>,
    pub display_name: String,
    pub status: AccountStatus,
    pub created_at: String,
}

/// A provider phone identifier bound to a tenant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhoneBinding {
    pub id: i64,
    pub phone_number_id: String,
    pub business_account_id: String,
    /// Tenant reference as recorded: canonical id or legacy slug.
    pub account_ref: String,
    pub display_number: Option<String>,
    pub active: bool,
    pub created_at: String,
    pub deactivated_at: Option<String>,
}

/// Lifecycle status of a conversation. Conversations are never
/// deleted, only archived.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ConversationStatus {
    Open,
    Archived,
}

/// A thread between one tenant's bound phone and one counterpart number.
///
/// Identity is the composite (account, phone number id, counterpart);
/// the schema enforces its uniqueness.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    pub account_id: TenantId,
    pub phone_number_id: String,
    pub counterpart: String,
    pub status: ConversationStatus,
    pub message_count: i64,
    pub created_at: String,
    pub last_activity_at: String,
}

/// A single stored message, inbound or outbound.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    /// Provider-assigned id; unique per tenant, the idempotency key.
    pub provider_message_id: String,
    pub conversation_id: ConversationId,
    /// Denormalized tenant stamp checked by the workspace guard.
    pub account_id: TenantId,
    pub direction: Direction,
    pub kind: MessageKind,
    /// Provider content sub-object, serialized as JSON.
    pub payload: String,
    pub provider_timestamp: String,
    pub status: MessageStatus,
    pub created_at: String,
}
