// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Flattening of provider envelopes into canonical inbound events.
//!
//! One envelope may batch several business-account entries, each with
//! several change records, each carrying message and status sub-events.
//! The normalizer walks that nesting in provider order and emits a flat
//! `Vec<InboundEvent>`; downstream code applies events strictly in this
//! order because last-activity timestamps and status transitions depend
//! on it.
//!
//! A sub-event that cannot be parsed is skipped with a warning. The
//! rest of the envelope is unaffected; batches never fail atomically.

use std::str::FromStr;

use serde_json::Value;
use tracing::warn;

use herald_core::types::{EventKind, InboundEvent, MessageKind, MessageStatus};

use crate::envelope::{BUSINESS_ACCOUNT_OBJECT, WebhookEnvelope};

/// Flatten an envelope into an ordered sequence of canonical events.
pub fn normalize(envelope: &WebhookEnvelope) -> Vec<InboundEvent> {
    let mut events = Vec::new();

    if envelope.object != BUSINESS_ACCOUNT_OBJECT {
        warn!(object = %envelope.object, "ignoring envelope for unexpected webhook object");
        return events;
    }

    for entry in &envelope.entry {
        for change in &entry.changes {
            let value = &change.value;
            let Some(metadata) = &value.metadata else {
                warn!(
                    entry = %entry.id,
                    field = change.field.as_deref().unwrap_or("-"),
                    "skipping change without phone metadata"
                );
                continue;
            };
            let phone_number_id = &metadata.phone_number_id;

            for raw in &value.messages {
                match parse_message(raw, &entry.id, phone_number_id) {
                    Some(event) => events.push(event),
                    None => {
                        warn!(entry = %entry.id, "skipping unparseable message sub-event");
                    }
                }
            }

            for raw in &value.statuses {
                match parse_status(raw, &entry.id, phone_number_id) {
                    Some(event) => events.push(event),
                    None => {
                        warn!(entry = %entry.id, "skipping unparseable status sub-event");
                    }
                }
            }
        }
    }

    events
}

/// Parse one raw message sub-event into a canonical NewMessage event.
fn parse_message(raw: &Value, business_account_id: &str, phone_number_id: &str) -> Option<InboundEvent> {
    let counterpart = raw.get("from")?.as_str()?;
    let provider_message_id = raw.get("id")?.as_str()?;
    let timestamp = provider_timestamp(raw)?;
    let kind_str = raw.get("type")?.as_str()?;

    let Ok(kind) = MessageKind::from_str(kind_str) else {
        warn!(kind = kind_str, id = provider_message_id, "unsupported message type");
        return None;
    };

    // The content sub-object is keyed by the type name, e.g.
    // `"text": {"body": "..."}`. Kept as serialized JSON; Herald does
    // not interpret message content.
    let payload = raw
        .get(kind_str)
        .map(|content| content.to_string())
        .unwrap_or_else(|| "{}".to_string());

    Some(InboundEvent {
        business_account_id: business_account_id.to_string(),
        phone_number_id: phone_number_id.to_string(),
        counterpart: counterpart.to_string(),
        provider_message_id: provider_message_id.to_string(),
        provider_timestamp: timestamp,
        kind: EventKind::NewMessage {
            kind,
            payload,
        },
    })
}

/// Parse one raw status sub-event into a canonical StatusUpdate event.
fn parse_status(raw: &Value, business_account_id: &str, phone_number_id: &str) -> Option<InboundEvent> {
    let provider_message_id = raw.get("id")?.as_str()?;
    let counterpart = raw.get("recipient_id")?.as_str()?;
    let timestamp = provider_timestamp(raw)?;
    let status_str = raw.get("status")?.as_str()?;

    let Ok(status) = MessageStatus::from_str(status_str) else {
        warn!(status = status_str, id = provider_message_id, "unrecognized status value");
        return None;
    };

    Some(InboundEvent {
        business_account_id: business_account_id.to_string(),
        phone_number_id: phone_number_id.to_string(),
        counterpart: counterpart.to_string(),
        provider_message_id: provider_message_id.to_string(),
        provider_timestamp: timestamp,
        kind: EventKind::StatusUpdate { status },
    })
}

/// Convert the provider's epoch-seconds timestamp string to RFC 3339 UTC.
///
/// Millisecond precision with a `Z` suffix, matching every stored
/// timestamp so lexicographic ordering agrees with time ordering.
fn provider_timestamp(raw: &Value) -> Option<String> {
    let epoch = raw.get("timestamp")?.as_str()?.parse::<i64>().ok()?;
    let dt = chrono::DateTime::from_timestamp(epoch, 0)?;
    Some(dt.to_rfc3339_opts(chrono::SecondsFormat::Millis, true))
}
