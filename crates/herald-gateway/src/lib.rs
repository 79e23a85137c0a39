// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP gateway for the Herald ingestion engine.
//!
//! Exposes the provider webhook endpoint (POST + subscribe handshake),
//! the tenant-scoped read API consumed by the dashboard and the
//! outbound-send path, and an unauthenticated health endpoint.

pub mod handlers;
pub mod server;

pub use server::{GatewayState, ServerConfig, build_router, start_server};
