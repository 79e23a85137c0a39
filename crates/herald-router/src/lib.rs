// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation routing and the per-delivery webhook pipeline.
//!
//! This crate ties the pure ingest front end (signature, normalize) to
//! the storage layer: resolve tenant, route conversation, persist
//! message, apply status. All tenant-scoped calls go through the
//! workspace guard owned by herald-storage.

pub mod pipeline;
pub mod router;

pub use pipeline::{PipelineConfig, ProcessingSummary, WebhookPipeline};
pub use router::route_or_create;
