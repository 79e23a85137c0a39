// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the Herald ingestion engine.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, a
//! single-writer concurrency model via `tokio-rusqlite`, typed query
//! modules per entity, the tenant directory, and the workspace
//! isolation guard.
//!
//! The hard invariants live in the schema: at most one active phone
//! binding per identifier, one conversation per composite key, one
//! message per (tenant, provider message id). Query functions express
//! them as conditional inserts, never read-then-write.

pub mod database;
pub mod directory;
pub mod guard;
pub mod migrations;
pub mod models;
pub mod queries;

pub use database::Database;
pub use directory::resolve_tenant;
pub use guard::{TenantOwned, TenantScope};
pub use models::*;
pub use queries::messages::StatusUpdateOutcome;
