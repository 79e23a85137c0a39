// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook signature verification.
//!
//! The provider signs every delivery with HMAC-SHA256 over the exact
//! raw request body and sends the digest as `X-Hub-Signature-256:
//! sha256=<hex>`. Verification must run against the raw bytes, never a
//! re-serialized form, and must compare in constant time.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::warn;

use herald_core::HeraldError;

type HmacSha256 = Hmac<Sha256>;

/// Verify a webhook delivery signature.
///
/// Every failure class maps to [`HeraldError::Unauthenticated`] and is
/// logged for security auditing. This check is pure and never retried
/// here; redelivery is the provider's concern.
pub fn verify_signature(
    app_secret: &str,
    raw_body: &[u8],
    signature_header: Option<&str>,
) -> Result<(), HeraldError> {
    let header = signature_header.ok_or_else(|| {
        warn!("webhook rejected: missing X-Hub-Signature-256 header");
        HeraldError::Unauthenticated {
            reason: "missing signature header".into(),
        }
    })?;

    // Only `sha256=` is accepted; the prefix is case-sensitive.
    let hex_digest = header.strip_prefix("sha256=").ok_or_else(|| {
        warn!("webhook rejected: unsupported signature algorithm");
        HeraldError::Unauthenticated {
            reason: "unsupported signature algorithm".into(),
        }
    })?;

    let expected = hex::decode(hex_digest).map_err(|_| {
        warn!("webhook rejected: signature is not valid hex");
        HeraldError::Unauthenticated {
            reason: "signature is not valid hex".into(),
        }
    })?;

    let mut mac = HmacSha256::new_from_slice(app_secret.as_bytes()).map_err(|_| {
        HeraldError::Unauthenticated {
            reason: "invalid webhook secret".into(),
        }
    })?;
    mac.update(raw_body);

    // verify_slice is constant-time.
    mac.verify_slice(&expected).map_err(|_| {
        warn!("webhook rejected: signature mismatch");
        HeraldError::Unauthenticated {
            reason: "signature mismatch".into(),
        }
    })
}

/// Compute the `sha256=<hex>` header value for a body.
///
/// Used by tests and local tooling to produce deliveries Herald will
/// accept.
pub fn sign(app_secret: &str, raw_body: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(app_secret.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(raw_body);
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}
