//! Route handlers and their shared request helpers.

pub mod collections;
pub mod items;
pub mod landing;
pub mod search;

use crate::error::ApiResult;
use axum::body::Bytes;
use axum::http::header::HOST;
use axum::http::HeaderMap;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use terra_stac_catalog::Serializer;
use terra_stac_core::{AuthDraft, AUTH_READ_PARAM, AUTH_WRITE_PARAM};
use terra_stac_security::validator::roles_from_params;

const FORWARDED_PROTO: &str = "x-forwarded-proto";

/// Serializer rooted at the URL the client used to reach the service
pub(crate) fn serializer(headers: &HeaderMap) -> Serializer {
    let scheme = headers
        .get(FORWARDED_PROTO)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("http");
    let host = headers
        .get(HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");
    Serializer::new(format!("{scheme}://{host}"))
}

/// Decoded query string parameters, in order
pub(crate) fn query_pairs(raw: Option<&str>) -> Vec<(String, String)> {
    raw.map(|query| {
        url::form_urlencoded::parse(query.as_bytes())
            .into_owned()
            .collect()
    })
    .unwrap_or_default()
}

pub(crate) fn str_pairs(pairs: &[(String, String)]) -> impl Iterator<Item = (&str, &str)> {
    pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
}

pub(crate) fn parse_body<T: DeserializeOwned>(body: &Bytes) -> ApiResult<T> {
    Ok(serde_json::from_slice(body)?)
}

/// Role lists supplied through `_auth_read` / `_auth_write` parameters.
/// Each parameter may be repeated and may hold comma separated roles.
pub(crate) fn auth_overrides(pairs: &[(String, String)]) -> AuthDraft {
    let roles = |name: &str| {
        let values: Vec<&str> = pairs
            .iter()
            .filter(|(key, _)| key == name)
            .flat_map(|(_, value)| value.split(','))
            .collect();
        let present = pairs.iter().any(|(key, _)| key == name);
        present.then(|| roles_from_params(values))
    };
    AuthDraft {
        read: roles(AUTH_READ_PARAM),
        write: roles(AUTH_WRITE_PARAM),
    }
}

/// `next` link of a paginated `GET` listing: the request parameters with the
/// token replaced
pub(crate) fn next_get_link(
    serializer: &Serializer,
    path: &str,
    pairs: &[(String, String)],
    token: &str,
    media_type: &str,
) -> Value {
    let mut query = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in pairs.iter().filter(|(key, _)| key != "token") {
        query.append_pair(key, value);
    }
    query.append_pair("token", token);
    json!({
        "rel": "next",
        "type": media_type,
        "method": "GET",
        "href": format!("{}?{}", serializer.href(path), query.finish()),
    })
}

/// `next` link of a paginated `POST` search: the request body with the
/// token replaced
pub(crate) fn next_post_link(serializer: &Serializer, path: &str, body: &Value, token: &str) -> Value {
    let mut body = match body {
        Value::Object(fields) => fields.clone(),
        _ => serde_json::Map::new(),
    };
    body.insert("token".to_string(), json!(token));
    json!({
        "rel": "next",
        "type": "application/geo+json",
        "method": "POST",
        "href": serializer.href(path),
        "body": body,
    })
}
