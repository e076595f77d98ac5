//! Permission grant model.
//!
//! # Invariants
//! - A [`GrantSet`] holds at most one grant per module key.
//! - A key missing from a [`GrantSet`] denies every action.

use crate::model::identity::IdentityId;
use crate::model::module::{ModuleKey, PermissionAction};
use std::collections::BTreeMap;

/// The four capabilities carried by one grant row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Capabilities {
    pub can_view: bool,
    pub can_create: bool,
    pub can_edit: bool,
    pub can_delete: bool,
}

impl Capabilities {
    pub fn view_only() -> Self {
        Self {
            can_view: true,
            ..Self::default()
        }
    }

    pub fn all() -> Self {
        Self {
            can_view: true,
            can_create: true,
            can_edit: true,
            can_delete: true,
        }
    }

    pub fn allows(&self, action: PermissionAction) -> bool {
        match action {
            PermissionAction::View => self.can_view,
            PermissionAction::Create => self.can_create,
            PermissionAction::Edit => self.can_edit,
            PermissionAction::Delete => self.can_delete,
        }
    }
}

/// Grant of capabilities on one module for one subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionGrant {
    pub subject_id: IdentityId,
    pub module: ModuleKey,
    pub capabilities: Capabilities,
}

impl PermissionGrant {
    pub fn new(
        subject_id: impl Into<IdentityId>,
        module: impl Into<ModuleKey>,
        capabilities: Capabilities,
    ) -> Self {
        Self {
            subject_id: subject_id.into(),
            module: module.into(),
            capabilities,
        }
    }
}

/// Grants of one subject, keyed by module.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GrantSet {
    by_module: BTreeMap<ModuleKey, Capabilities>,
}

impl GrantSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a set from grant rows. Later rows for the same module win.
    pub fn from_grants<'a>(grants: impl IntoIterator<Item = &'a PermissionGrant>) -> Self {
        let by_module = grants
            .into_iter()
            .map(|grant| (grant.module, grant.capabilities))
            .collect();
        Self { by_module }
    }

    pub fn get(&self, module: ModuleKey) -> Option<Capabilities> {
        self.by_module.get(&module).copied()
    }

    /// Deny-by-default lookup.
    pub fn allows(&self, module: ModuleKey, action: PermissionAction) -> bool {
        self.get(module)
            .is_some_and(|capabilities| capabilities.allows(action))
    }

    pub fn len(&self) -> usize {
        self.by_module.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_module.is_empty()
    }

    pub fn modules(&self) -> impl Iterator<Item = ModuleKey> + '_ {
        self.by_module.keys().copied()
    }
}
