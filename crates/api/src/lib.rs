//! HTTP surface of terra-stac
//!
//! An axum router exposing the STAC API. Every request is authenticated by
//! middleware that resolves the bearer token into a `Principal`; handlers
//! pass that principal to the authorization-enforcing catalog and map the
//! resulting errors onto HTTP statuses.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::{status_code, ApiError, ApiResult};
pub use routes::{cors_layer, router};
pub use state::AppState;
