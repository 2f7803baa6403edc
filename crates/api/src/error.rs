//! Mapping of the error taxonomy onto HTTP responses.

use axum::http::header::WWW_AUTHENTICATE;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use terra_stac_core::{Error, BEARER_CHALLENGE};

pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Error body returned for every failed request
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub description: String,
}

/// Handler error wrapping the domain error
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        Self(error)
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(error: serde_json::Error) -> Self {
        Self(Error::from(error))
    }
}

/// HTTP status of a domain error
pub fn status_code(error: &Error) -> StatusCode {
    match error {
        Error::InvalidCredential { .. } | Error::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
        Error::Forbidden { .. } => StatusCode::FORBIDDEN,
        Error::NotFound { .. } => StatusCode::NOT_FOUND,
        Error::BadRequest { .. } | Error::Json { .. } => StatusCode::BAD_REQUEST,
        Error::Conflict { .. } => StatusCode::CONFLICT,
        Error::Store { .. } | Error::Configuration { .. } | Error::Network { .. } => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_code(&self.0);
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }

        let body = ErrorBody {
            code: self.0.code(),
            description: self.0.to_string(),
        };
        let mut response = (status, Json(body)).into_response();
        if self.0.requires_challenge() {
            response
                .headers_mut()
                .insert(WWW_AUTHENTICATE, HeaderValue::from_static(BEARER_CHALLENGE));
        }
        response
    }
}
