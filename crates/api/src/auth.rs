//! Request authentication.
//!
//! `authenticate` runs for every request and stores the resolved `Principal`
//! in the request extensions. Mutating routes additionally carry
//! `require_authenticated`, which turns anonymous requests away with a 401
//! before any handler logic runs.

use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use terra_stac_core::{Error, Principal};

pub async fn authenticate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let authorization = match request.headers().get(AUTHORIZATION) {
        Some(value) => Some(
            value
                .to_str()
                .map_err(|_| Error::invalid_credential("malformed authorization header"))?
                .to_string(),
        ),
        None => None,
    };

    let principal = state.resolver.resolve(authorization.as_deref()).await?;
    request.extensions_mut().insert(principal);
    Ok(next.run(request).await)
}

pub async fn require_authenticated(request: Request, next: Next) -> Result<Response, ApiError> {
    let authenticated = request
        .extensions()
        .get::<Principal>()
        .is_some_and(Principal::is_authenticated);
    if !authenticated {
        return Err(Error::unauthorized("authentication required").into());
    }
    Ok(next.run(request).await)
}
