#![allow(dead_code)]
//! Shared fixtures for router scenario tests.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::sync::Arc;
use terra_stac_api::{router, AppState};
use terra_stac_catalog::{CatalogStore, MemoryStore, Refresh};
use terra_stac_config::Settings;
use terra_stac_core::{Error, Item, Result};
use terra_stac_security::TokenVerifier;
use tower::ServiceExt;

pub const PROTECTED: &str = "protected";
pub const PUBLIC: &str = "terrascope_s2_toc_v2";
pub const ROLE_PROTECTED: &str = "protected-role";
pub const ROLE_SENTINEL: &str = "sentinel2";

/// Tokens are role names: `Bearer a,b` resolves to roles `a` and `b`.
/// `invalid` fails verification.
pub struct RoleTokenVerifier;

#[async_trait]
impl TokenVerifier for RoleTokenVerifier {
    async fn verify(&self, token: &str) -> Result<Value> {
        if token == "invalid" {
            return Err(Error::invalid_credential("signature mismatch"));
        }
        let roles: Vec<&str> = token.split(',').filter(|r| !r.is_empty()).collect();
        Ok(json!({
            "preferred_username": "tester",
            "realm_access": {"roles": roles}
        }))
    }
}

pub fn item(collection: &str, id: &str) -> Value {
    json!({
        "type": "Feature",
        "stac_version": "1.0.0",
        "id": id,
        "collection": collection,
        "bbox": [4.0, 50.0, 5.0, 51.0],
        "geometry": {
            "type": "Polygon",
            "coordinates": [[[4.0, 50.0], [5.0, 50.0], [5.0, 51.0], [4.0, 51.0], [4.0, 50.0]]]
        },
        "properties": {"datetime": "2023-05-01T10:00:00Z"},
        "assets": {},
        "links": []
    })
}

pub fn collection(id: &str, read: &[&str], write: &[&str]) -> Value {
    json!({
        "type": "Collection",
        "stac_version": "1.0.0",
        "id": id,
        "title": format!("{id} title"),
        "description": "test collection",
        "license": "proprietary",
        "extent": {
            "spatial": {"bbox": [[-180.0, -90.0, 180.0, 90.0]]},
            "temporal": {"interval": [["2015-01-01T00:00:00Z", null]]}
        },
        "links": [],
        "_auth": {"read": read, "write": write}
    })
}

pub async fn app_with(settings: Settings) -> Router {
    let store = MemoryStore::new();
    for value in [
        collection(PROTECTED, &[ROLE_PROTECTED], &[ROLE_PROTECTED]),
        collection(PUBLIC, &["anonymous"], &[ROLE_SENTINEL]),
    ] {
        store
            .create_collection(serde_json::from_value(value).unwrap())
            .await
            .unwrap();
    }
    for (collection, ids) in [(PROTECTED, ["p1", "p2"]), (PUBLIC, ["s1", "s2"])] {
        let items: Vec<Item> = ids
            .iter()
            .map(|id| serde_json::from_value(item(collection, id)).unwrap())
            .collect();
        store
            .bulk_insert(collection, items, Refresh::WaitFor)
            .await
            .unwrap();
    }

    router(AppState::new(
        Arc::new(store),
        Some(Arc::new(RoleTokenVerifier)),
        settings,
    ))
}

pub async fn app() -> Router {
    app_with(Settings::default()).await
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> TestResponse {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::HOST, "testserver");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    TestResponse {
        status,
        headers,
        body,
    }
}

pub async fn get(app: &Router, uri: &str, token: Option<&str>) -> TestResponse {
    send(app, Method::GET, uri, token, None).await
}

pub fn assert_bearer_challenge(response: &TestResponse) {
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.headers.get(header::WWW_AUTHENTICATE).unwrap(),
        "Bearer"
    );
}
