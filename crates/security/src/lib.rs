//! Security features for terra-stac
//!
//! This crate provides the authorization building blocks shared by every
//! catalog entry point:
//! - Credential resolution (bearer token to `Principal`)
//! - OpenID Connect discovery and token verification
//! - The access policy deciding READ/WRITE on a collection
//! - Validation of collection authorization metadata on write

pub mod claims;
pub mod oidc;
pub mod policy;
pub mod resolver;
pub mod validator;

pub use oidc::{DiscoveryDocument, OidcVerifier};
pub use policy::AccessPolicy;
pub use resolver::{CredentialResolver, TokenVerifier};
pub use validator::AuthMetadataValidator;
