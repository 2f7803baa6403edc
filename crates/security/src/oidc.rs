//! OpenID Connect discovery and JWT verification.
//!
//! The issuer metadata and its signing keys are fetched once at startup and
//! kept for the lifetime of the verifier. A failed fetch is a startup error;
//! per-request verification never touches the network.

use crate::resolver::TokenVerifier;
use async_trait::async_trait;
use jsonwebtoken::{decode, decode_header, jwk::JwkSet, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use terra_stac_core::{Error, Result};
use url::Url;

const WELL_KNOWN_PATH: &str = ".well-known/openid-configuration";

/// Subset of the issuer's discovery document used by the verifier
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DiscoveryDocument {
    pub issuer: String,
    pub jwks_uri: String,
    #[serde(default)]
    pub authorization_endpoint: Option<String>,
    #[serde(default)]
    pub token_endpoint: Option<String>,
    #[serde(default)]
    pub grant_types_supported: Vec<String>,
}

/// Verifies bearer tokens against the keys published by an OIDC issuer
#[derive(Debug, Clone)]
pub struct OidcVerifier {
    discovery: DiscoveryDocument,
    jwks: JwkSet,
    algorithms: Vec<Algorithm>,
    audience: Option<String>,
}

impl OidcVerifier {
    /// Fetch discovery metadata and signing keys of `issuer`
    pub async fn discover(issuer: &str, audience: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| Error::network(issuer, e.to_string()))?;
        Self::discover_with_client(&client, issuer, audience).await
    }

    pub async fn discover_with_client(
        client: &reqwest::Client,
        issuer: &str,
        audience: Option<String>,
    ) -> Result<Self> {
        let well_known = well_known_url(issuer)?;
        let discovery: DiscoveryDocument = fetch_json(client, well_known.as_str()).await?;
        let jwks: JwkSet = fetch_json(client, &discovery.jwks_uri).await?;

        tracing::info!(
            issuer = %discovery.issuer,
            keys = jwks.keys.len(),
            "loaded OIDC signing keys"
        );

        Ok(Self {
            discovery,
            jwks,
            algorithms: vec![
                Algorithm::RS256,
                Algorithm::RS384,
                Algorithm::RS512,
                Algorithm::PS256,
                Algorithm::PS384,
                Algorithm::PS512,
                Algorithm::ES256,
                Algorithm::ES384,
                Algorithm::EdDSA,
            ],
            audience,
        })
    }

    /// Replace the accepted signing algorithms
    #[must_use]
    pub fn with_algorithms(mut self, algorithms: Vec<Algorithm>) -> Self {
        self.algorithms = algorithms;
        self
    }

    pub fn discovery(&self) -> &DiscoveryDocument {
        &self.discovery
    }

    fn decoding_key(&self, kid: Option<&str>) -> Result<DecodingKey> {
        let jwk = match kid {
            Some(kid) => self.jwks.find(kid),
            None if self.jwks.keys.len() == 1 => self.jwks.keys.first(),
            None => None,
        }
        .ok_or_else(|| Error::invalid_credential("unknown signing key"))?;

        DecodingKey::from_jwk(jwk).map_err(|e| Error::invalid_credential(e.to_string()))
    }
}

#[async_trait]
impl TokenVerifier for OidcVerifier {
    async fn verify(&self, token: &str) -> Result<Value> {
        let header = decode_header(token).map_err(|e| Error::invalid_credential(e.to_string()))?;
        if !self.algorithms.contains(&header.alg) {
            return Err(Error::invalid_credential(format!(
                "signing algorithm {:?} is not accepted",
                header.alg
            )));
        }

        let key = self.decoding_key(header.kid.as_deref())?;

        let mut validation = Validation::new(header.alg);
        validation.set_issuer(&[&self.discovery.issuer]);
        match &self.audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }

        decode::<Value>(token, &key, &validation)
            .map(|data| data.claims)
            .map_err(|e| Error::invalid_credential(e.to_string()))
    }
}

fn well_known_url(issuer: &str) -> Result<Url> {
    let base = if issuer.ends_with('/') {
        issuer.to_string()
    } else {
        format!("{issuer}/")
    };
    Url::parse(&base)
        .and_then(|url| url.join(WELL_KNOWN_PATH))
        .map_err(|e| Error::configuration(format!("invalid OIDC issuer '{issuer}': {e}")))
}

async fn fetch_json<T: serde::de::DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
) -> Result<T> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| Error::network(url, e.to_string()))?;

    if !response.status().is_success() {
        return Err(Error::network(
            url,
            format!("unexpected status {}", response.status()),
        ));
    }

    response
        .json()
        .await
        .map_err(|e| Error::network(url, format!("invalid response body: {e}")))
}
