//! Credential resolution: turns the `Authorization` header of a request into
//! a `Principal`.

use crate::claims::{roles_at_path, username};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use terra_stac_config::Settings;
use terra_stac_core::{Error, Principal, Result};

/// Capability verifying a bearer token and returning its claims
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    /// Verify the token signature and validity.
    ///
    /// # Returns
    /// * `Ok(claims)` - The token is valid
    /// * `Err(Error::InvalidCredential)` - The token is malformed, expired or
    ///   not signed by a trusted key
    async fn verify(&self, token: &str) -> Result<Value>;
}

/// Resolves request credentials into principals
#[derive(Clone)]
pub struct CredentialResolver {
    /// Token verifier; without one every bearer token is rejected
    verifier: Option<Arc<dyn TokenVerifier>>,
    roles_claim: String,
    anonymous_role: String,
}

impl CredentialResolver {
    pub fn new(verifier: Option<Arc<dyn TokenVerifier>>, settings: &Settings) -> Self {
        Self {
            verifier,
            roles_claim: settings.oidc_roles_claim.clone(),
            anonymous_role: settings.role_anonymous.clone(),
        }
    }

    /// Resolve the raw value of an `Authorization` header.
    ///
    /// A missing header or a scheme other than `Bearer` yields the anonymous
    /// principal. A bearer token that fails verification is an error.
    pub async fn resolve(&self, authorization: Option<&str>) -> Result<Principal> {
        let Some(token) = authorization.and_then(bearer_token) else {
            return Ok(Principal::anonymous(&self.anonymous_role));
        };

        let verifier = self.verifier.as_ref().ok_or_else(|| {
            Error::invalid_credential("token authentication is not configured")
        })?;

        let claims = match verifier.verify(token).await {
            Ok(claims) => claims,
            Err(e) => {
                tracing::warn!(error = %e, "rejected bearer token");
                return Err(match e {
                    Error::InvalidCredential { .. } => e,
                    other => Error::invalid_credential(other.to_string()),
                });
            }
        };

        let roles = roles_at_path(&claims, &self.roles_claim);
        let principal =
            Principal::authenticated(username(&claims), roles, &self.anonymous_role);
        tracing::debug!(
            username = principal.username().unwrap_or(""),
            scopes = ?principal.scopes(),
            "resolved principal"
        );
        Ok(principal)
    }

    pub fn anonymous_role(&self) -> &str {
        &self.anonymous_role
    }
}

/// Extract the token from a `Bearer <token>` header value
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}
