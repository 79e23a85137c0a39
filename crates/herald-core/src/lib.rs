// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Herald ingestion engine.
//!
//! This crate provides the error taxonomy and the canonical domain
//! types shared by every other Herald crate. It has no I/O of its own.

pub mod error;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::HeraldError;
pub use types::{
    ConversationId, Direction, EventKind, InboundEvent, MessageKind, MessageStatus, TenantId,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn herald_error_has_all_variants() {
        let _config = HeraldError::Config("test".into());
        let _storage = HeraldError::Storage {
            source: Box::new(std::io::Error::other("test")),
        };
        let _unauth = HeraldError::Unauthenticated {
            reason: "test".into(),
        };
        let _malformed = HeraldError::MalformedEnvelope {
            detail: "test".into(),
        };
        let _denied = HeraldError::AccessDenied {
            entity: "conversation",
            id: "c-1".into(),
        };
        let _timeout = HeraldError::Timeout {
            duration: std::time::Duration::from_secs(5),
        };
        let _internal = HeraldError::Internal("test".into());
    }

    #[test]
    fn access_denied_names_the_entity() {
        let err = HeraldError::AccessDenied {
            entity: "message",
            id: "m-9".into(),
        };
        let rendered = err.to_string();
        assert!(rendered.contains("message"));
        assert!(rendered.contains("m-9"));
    }

    #[test]
    fn tenant_id_displays_raw_value() {
        let id = TenantId("acct_01J".into());
        assert_eq!(id.to_string(), "acct_01J");
        assert_eq!(id.as_str(), "acct_01J");
    }
}
