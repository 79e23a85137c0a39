// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Workspace isolation guard.
//!
//! `TenantScope` is the single authoritative point where tenant-id
//! equality is checked. Every tenant-scoped query takes a scope: the
//! scope supplies the `account_id` bind parameter that filters the SQL,
//! and `assert_owns` re-verifies the stamp on every entity read back or
//! written. No other module compares tenant ids.

use tracing::error;

use herald_core::{HeraldError, TenantId};

use crate::models::{Account, Conversation, Message};

/// An entity stamped with the tenant it belongs to.
pub trait TenantOwned {
    /// Entity name used in AccessDenied reports.
    const ENTITY: &'static str;

    fn tenant_id(&self) -> &TenantId;
    fn entity_id(&self) -> String;
}

impl TenantOwned for Conversation {
    const ENTITY: &'static str = "conversation";

    fn tenant_id(&self) -> &TenantId {
        &self.account_id
    }

    fn entity_id(&self) -> String {
        self.id.0.clone()
    }
}

impl TenantOwned for Message {
    const ENTITY: &'static str = "message";

    fn tenant_id(&self) -> &TenantId {
        &self.account_id
    }

    fn entity_id(&self) -> String {
        self.id.clone()
    }
}

/// The tenant scope of the current operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantScope {
    tenant: TenantId,
}

impl TenantScope {
    pub fn new(tenant: TenantId) -> Self {
        Self { tenant }
    }

    /// Scope for a resolved account. Always built from the canonical
    /// id, never from a legacy reference form.
    pub fn for_account(account: &Account) -> Self {
        Self::new(account.id.clone())
    }

    pub fn tenant_id(&self) -> &TenantId {
        &self.tenant
    }

    /// Bind value for `account_id = ?` clauses in scoped queries.
    pub(crate) fn sql_param(&self) -> String {
        self.tenant.0.clone()
    }

    /// Verify that `entity` is stamped with this scope's tenant.
    ///
    /// A mismatch is fatal for the operation and is never downgraded;
    /// the entity's own tenant id is logged but not returned to the
    /// caller.
    pub fn assert_owns<T: TenantOwned>(&self, entity: &T) -> Result<(), HeraldError> {
        if entity.tenant_id() == &self.tenant {
            return Ok(());
        }
        error!(
            entity = T::ENTITY,
            id = %entity.entity_id(),
            scope = %self.tenant,
            stamped = %entity.tenant_id(),
            "workspace isolation violation"
        );
        Err(HeraldError::AccessDenied {
            entity: T::ENTITY,
            id: entity.entity_id(),
        })
    }
}
