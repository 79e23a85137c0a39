// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook ingestion front end: signature verification and event
//! normalization.
//!
//! Both halves are pure CPU-bound steps with no I/O; everything that
//! touches the persistence store lives downstream in herald-router and
//! herald-storage.

pub mod envelope;
pub mod normalize;
pub mod signature;

pub use envelope::WebhookEnvelope;
pub use normalize::normalize;
pub use signature::{sign, verify_signature};
