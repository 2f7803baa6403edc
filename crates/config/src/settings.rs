//! Centralized settings for terra-stac
//!
//! `Settings` is immutable after construction and is handed explicitly to the
//! credential resolver, the access policy, the metadata validator and the
//! router. Several configurations can coexist in one process.

use serde::{Deserialize, Serialize};
use terra_stac_core::{
    Error, Result, DEFAULT_ROLES_CLAIM, DEFAULT_ROLE_ADMIN, DEFAULT_ROLE_ANONYMOUS,
    DEFAULT_ROLE_EDITOR,
};

/// Runtime settings of the authorization layer and the HTTP service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Role that bypasses every per-collection check
    pub role_admin: String,

    /// Role allowed to create collections
    pub role_editor: String,

    /// Implicit role of every principal
    pub role_anonymous: String,

    /// Whether editors may grant the anonymous role read access
    pub editor_public_collections: bool,

    /// OpenID Connect issuer; without it only anonymous access is possible
    pub oidc_issuer: Option<String>,

    /// Dot-separated path of the role list inside verified claims
    pub oidc_roles_claim: String,

    /// Expected `aud` claim, checked only when set
    pub oidc_audience: Option<String>,

    pub stac_id: String,
    pub stac_title: String,
    pub stac_description: String,

    pub cors_allow_origins: Vec<String>,
    pub cors_allow_methods: Vec<String>,
    pub cors_allow_credentials: bool,

    pub app_host: String,
    pub app_port: u16,

    /// Default and maximum page size of collection listings
    pub collections_page_size: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            role_admin: DEFAULT_ROLE_ADMIN.to_string(),
            role_editor: DEFAULT_ROLE_EDITOR.to_string(),
            role_anonymous: DEFAULT_ROLE_ANONYMOUS.to_string(),
            editor_public_collections: false,
            oidc_issuer: None,
            oidc_roles_claim: DEFAULT_ROLES_CLAIM.to_string(),
            oidc_audience: None,
            stac_id: "terra-stac-api".to_string(),
            stac_title: "terra-stac-api".to_string(),
            stac_description: "STAC API".to_string(),
            cors_allow_origins: vec!["*".to_string()],
            cors_allow_methods: vec!["OPTIONS".to_string(), "GET".to_string(), "POST".to_string()],
            cors_allow_credentials: true,
            app_host: "0.0.0.0".to_string(),
            app_port: 8080,
            collections_page_size: 100,
        }
    }
}

impl Settings {
    /// Check invariants that cannot be expressed by the types alone
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("role_admin", &self.role_admin),
            ("role_editor", &self.role_editor),
            ("role_anonymous", &self.role_anonymous),
            ("oidc_roles_claim", &self.oidc_roles_claim),
        ] {
            if value.trim().is_empty() {
                return Err(Error::configuration(format!("{name} must not be empty")));
            }
        }

        if self.role_anonymous == self.role_admin || self.role_anonymous == self.role_editor {
            return Err(Error::configuration(
                "role_anonymous must differ from role_admin and role_editor",
            ));
        }

        if self.collections_page_size == 0 {
            return Err(Error::configuration(
                "collections_page_size must be greater than zero",
            ));
        }

        Ok(())
    }

    /// Address the HTTP service binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.app_host, self.app_port)
    }
}
