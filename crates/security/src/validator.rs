//! Validation of collection authorization metadata on create and update.

use std::collections::BTreeSet;
use terra_stac_config::Settings;
use terra_stac_core::{
    AccessType, AuthDraft, Collection, CollectionAuth, CollectionDraft, Error, Principal, Result,
    AUTH_FIELD,
};

/// Derives the `_auth` metadata of a collection from its body and the
/// request parameters, rejecting configurations that would be insecure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthMetadataValidator {
    admin_role: String,
    editor_role: String,
    anonymous_role: String,
    editor_public_collections: bool,
}

impl AuthMetadataValidator {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            admin_role: settings.role_admin.clone(),
            editor_role: settings.role_editor.clone(),
            anonymous_role: settings.role_anonymous.clone(),
            editor_public_collections: settings.editor_public_collections,
        }
    }

    /// Merge `overrides` into the draft's `_auth`, validate the result and
    /// turn the draft into a persistable collection.
    pub fn ensure_auth_present(
        &self,
        draft: CollectionDraft,
        overrides: &AuthDraft,
        principal: &Principal,
    ) -> Result<Collection> {
        let CollectionDraft { id, auth, fields } = draft;
        let mut auth = auth.unwrap_or_default();

        for access in [AccessType::Read, AccessType::Write] {
            if let Some(roles) = overrides.get(access) {
                auth.set(access, roles.clone());
            }
        }

        let (read, write) = match (auth.read, auth.write) {
            (Some(read), Some(write)) => (read, write),
            _ => {
                return Err(Error::bad_request(format!(
                    "collection '{id}' must define both '{AUTH_FIELD}.read' and '{AUTH_FIELD}.write'"
                )))
            }
        };

        if write.contains(&self.anonymous_role) {
            return Err(Error::bad_request(format!(
                "role '{}' cannot be granted write access",
                self.anonymous_role
            )));
        }

        if read.contains(&self.anonymous_role) && !self.may_publish(principal) {
            return Err(Error::bad_request(format!(
                "insufficient permissions to grant role '{}' read access",
                self.anonymous_role
            )));
        }

        Ok(Collection::new(id, CollectionAuth { read, write }, fields))
    }

    /// Whether the principal may make a collection publicly readable
    pub fn may_publish(&self, principal: &Principal) -> bool {
        principal.has_role(&self.admin_role)
            || (self.editor_public_collections && principal.has_role(&self.editor_role))
    }
}

/// Collect role names from repeated request parameters, ignoring blanks
pub fn roles_from_params<'a>(values: impl IntoIterator<Item = &'a str>) -> BTreeSet<String> {
    values
        .into_iter()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}
