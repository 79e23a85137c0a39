// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Canonical domain types shared across the Herald workspace.
//!
//! The normalizer produces [`InboundEvent`] values from raw provider
//! envelopes; everything downstream (directory, router, storage)
//! operates only on these canonical forms.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Canonical identifier of a tenant (account).
///
/// Always the opaque account id. Legacy slug references are normalized
/// into this form by the tenant directory before anything downstream
/// sees them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TenantId(pub String);

impl TenantId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TenantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unique identifier for a conversation row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(pub String);

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Message direction relative to the tenant.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Inbound,
    Outbound,
}

/// Content type of a message, as reported by the provider.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Text,
    Image,
    Audio,
    Video,
    Document,
    Sticker,
    Location,
    Contacts,
    Reaction,
    Button,
    Interactive,
    Template,
}

/// Delivery status of a message.
///
/// Transitions form a forward-only lattice: `sent -> delivered -> read`,
/// and any non-terminal state may move to `failed`. `received` is the
/// initial status of inbound messages and takes no callback updates.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Received,
    Sent,
    Delivered,
    Read,
    Failed,
}

impl MessageStatus {
    fn rank(self) -> u8 {
        match self {
            MessageStatus::Received => 0,
            MessageStatus::Sent => 1,
            MessageStatus::Delivered => 2,
            MessageStatus::Read => 3,
            MessageStatus::Failed => 4,
        }
    }

    /// Whether a callback may move a message from `self` to `next`.
    ///
    /// Provider redelivery makes stale callbacks routine; a transition
    /// that is not strictly forward is rejected by the store and the
    /// stored status stands.
    pub fn accepts(self, next: MessageStatus) -> bool {
        if self == MessageStatus::Failed {
            return false;
        }
        if next == MessageStatus::Failed {
            return true;
        }
        next.rank() > self.rank()
    }
}

/// Kind-specific content of a canonical inbound event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventKind {
    /// A new message from the counterpart.
    NewMessage {
        kind: MessageKind,
        /// Provider content sub-object, serialized as JSON.
        payload: String,
    },
    /// A delivery-status callback for a previously stored message.
    StatusUpdate { status: MessageStatus },
}

/// A single canonical event flattened out of a provider webhook envelope.
///
/// Order within one envelope is the provider's own ordering and must be
/// preserved: last-activity timestamps and status transitions depend on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundEvent {
    /// Provider id of the business account the entry belongs to.
    pub business_account_id: String,
    /// Provider id of the tenant's connected phone number.
    pub phone_number_id: String,
    /// External counterpart number (E.164 digits as sent by the provider).
    pub counterpart: String,
    /// Provider-assigned message id, the natural idempotency key.
    pub provider_message_id: String,
    /// Provider timestamp normalized to RFC 3339 UTC.
    pub provider_timestamp: String,
    pub kind: EventKind,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn status_lattice_is_forward_only() {
        use MessageStatus::*;
        assert!(Sent.accepts(Delivered));
        assert!(Sent.accepts(Read));
        assert!(Delivered.accepts(Read));
        assert!(!Read.accepts(Delivered));
        assert!(!Delivered.accepts(Sent));
        assert!(!Delivered.accepts(Delivered));
    }

    #[test]
    fn any_state_may_fail_but_failed_is_terminal() {
        use MessageStatus::*;
        assert!(Sent.accepts(Failed));
        assert!(Read.accepts(Failed));
        assert!(!Failed.accepts(Failed));
        assert!(!Failed.accepts(Read));
    }

    #[test]
    fn status_round_trips_through_strings() {
        for status in [
            MessageStatus::Received,
            MessageStatus::Sent,
            MessageStatus::Delivered,
            MessageStatus::Read,
            MessageStatus::Failed,
        ] {
            let s = status.to_string();
            assert_eq!(MessageStatus::from_str(&s).unwrap(), status);
        }
    }

    #[test]
    fn message_kind_parses_provider_type_strings() {
        assert_eq!(MessageKind::from_str("text").unwrap(), MessageKind::Text);
        assert_eq!(MessageKind::from_str("image").unwrap(), MessageKind::Image);
        assert!(MessageKind::from_str("unsupported_thing").is_err());
    }

    #[test]
    fn inbound_event_serializes() {
        let event = InboundEvent {
            business_account_id: "waba-1".into(),
            phone_number_id: "pn-1".into(),
            counterpart: "15551234567".into(),
            provider_message_id: "wamid.A".into(),
            provider_timestamp: "2026-01-01T00:00:00.000Z".into(),
            kind: EventKind::NewMessage {
                kind: MessageKind::Text,
                payload: r#"{"body":"hi"}"#.into(),
            },
        };
        let json = serde_json::to_string(&event).unwrap();
        let parsed: InboundEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, event);
    }
}
