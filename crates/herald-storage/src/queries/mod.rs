// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules, one per entity.
//!
//! All functions accept `&Database` and run through the single
//! background writer thread. Tenant-scoped operations additionally take
//! a [`crate::guard::TenantScope`].

pub mod accounts;
pub mod bindings;
pub mod conversations;
pub mod deliveries;
pub mod messages;

/// Parse an enum column stored as lowercase text, mapping failures to a
/// rusqlite conversion error so they surface as storage errors.
pub(crate) fn parse_enum_column<T>(idx: usize, raw: String) -> Result<T, rusqlite::Error>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.parse::<T>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}
