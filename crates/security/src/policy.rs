//! Access policy: pure decisions over role scopes and collection metadata.

use std::collections::BTreeSet;
use terra_stac_config::Settings;
use terra_stac_core::{AccessType, CollectionAuth};

/// Decides whether a set of role scopes may access a collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessPolicy {
    admin_role: String,
}

impl AccessPolicy {
    pub fn new(admin_role: impl Into<String>) -> Self {
        Self {
            admin_role: admin_role.into(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.role_admin.clone())
    }

    pub fn admin_role(&self) -> &str {
        &self.admin_role
    }

    /// True iff the administrator role is among the scopes
    pub fn is_admin(&self, scopes: &BTreeSet<String>) -> bool {
        scopes.contains(&self.admin_role)
    }

    /// Administrators always pass; everyone else needs a role listed for
    /// the requested access type.
    pub fn is_authorized(
        &self,
        scopes: &BTreeSet<String>,
        auth: &CollectionAuth,
        access: AccessType,
    ) -> bool {
        self.is_admin(scopes) || any_role_match(scopes, auth.roles(access))
    }
}

/// Whether the two role sets share at least one role
pub fn any_role_match(scopes: &BTreeSet<String>, roles: &BTreeSet<String>) -> bool {
    !scopes.is_disjoint(roles)
}
