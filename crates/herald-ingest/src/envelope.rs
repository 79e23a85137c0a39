// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Serde model of the provider's webhook envelope.
//!
//! The outer nesting (`entry[].changes[].value`) is typed; the
//! message/status sub-events inside a change are kept as raw
//! `serde_json::Value` so one malformed sub-event can be skipped
//! during normalization without failing the whole envelope parse.

use serde::Deserialize;
use serde_json::Value;

use herald_core::HeraldError;

/// Envelope `object` value for business-account webhooks.
pub const BUSINESS_ACCOUNT_OBJECT: &str = "whatsapp_business_account";

/// A full webhook delivery body.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEnvelope {
    /// Webhook object class; only business-account envelopes carry events.
    pub object: String,
    /// One entry per business account, possibly batched.
    #[serde(default)]
    pub entry: Vec<EnvelopeEntry>,
}

/// One business-account entry inside an envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct EnvelopeEntry {
    /// Provider id of the business account.
    pub id: String,
    #[serde(default)]
    pub changes: Vec<EntryChange>,
}

/// One change record inside an entry.
#[derive(Debug, Clone, Deserialize)]
pub struct EntryChange {
    #[serde(default)]
    pub field: Option<String>,
    pub value: ChangeValue,
}

/// The value payload of a change: metadata plus sub-event arrays.
#[derive(Debug, Clone, Deserialize)]
pub struct ChangeValue {
    #[serde(default)]
    pub messaging_product: Option<String>,
    #[serde(default)]
    pub metadata: Option<ChangeMetadata>,
    /// New inbound messages, raw; parsed individually.
    #[serde(default)]
    pub messages: Vec<Value>,
    /// Delivery-status callbacks, raw; parsed individually.
    #[serde(default)]
    pub statuses: Vec<Value>,
}

/// Phone-number metadata attached to a change.
#[derive(Debug, Clone, Deserialize)]
pub struct ChangeMetadata {
    #[serde(default)]
    pub display_phone_number: Option<String>,
    pub phone_number_id: String,
}

impl WebhookEnvelope {
    /// Parse an envelope from the raw request body.
    ///
    /// Failure here means the body as a whole is not a provider
    /// envelope; per-sub-event problems are the normalizer's concern.
    pub fn parse(raw_body: &[u8]) -> Result<Self, HeraldError> {
        serde_json::from_slice(raw_body).map_err(|e| HeraldError::MalformedEnvelope {
            detail: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_two_level_envelope() {
        let body = br#"{
            "object": "whatsapp_business_account",
            "entry": [{
                "id": "waba-1",
                "changes": [{
                    "field": "messages",
                    "value": {
                        "messaging_product": "whatsapp",
                        "metadata": {"display_phone_number": "15550001111", "phone_number_id": "pn-1"},
                        "messages": [{"from": "15551234567", "id": "wamid.A", "timestamp": "1760000000", "type": "text", "text": {"body": "hi"}}]
                    }
                }]
            }]
        }"#;
        let envelope = WebhookEnvelope::parse(body).unwrap();
        assert_eq!(envelope.object, BUSINESS_ACCOUNT_OBJECT);
        assert_eq!(envelope.entry.len(), 1);
        assert_eq!(envelope.entry[0].id, "waba-1");
        let value = &envelope.entry[0].changes[0].value;
        assert_eq!(value.metadata.as_ref().unwrap().phone_number_id, "pn-1");
        assert_eq!(value.messages.len(), 1);
        assert!(value.statuses.is_empty());
    }

    #[test]
    fn missing_arrays_default_to_empty() {
        let body = br#"{"object": "whatsapp_business_account", "entry": [{"id": "waba-1", "changes": [{"value": {}}]}]}"#;
        let envelope = WebhookEnvelope::parse(body).unwrap();
        let value = &envelope.entry[0].changes[0].value;
        assert!(value.messages.is_empty());
        assert!(value.statuses.is_empty());
        assert!(value.metadata.is_none());
    }

    #[test]
    fn non_json_body_is_malformed() {
        let err = WebhookEnvelope::parse(b"not json").unwrap_err();
        assert!(matches!(err, HeraldError::MalformedEnvelope { .. }));
    }
}
