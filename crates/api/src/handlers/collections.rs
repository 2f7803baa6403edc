//! Collection endpoints.

use super::{auth_overrides, next_get_link, parse_body, query_pairs, serializer};
use crate::error::ApiResult;
use crate::state::AppState;
use axum::body::Bytes;
use axum::extract::{Path, RawQuery, State};
use axum::http::{HeaderMap, StatusCode};
use axum::{Extension, Json};
use serde_json::Value;
use terra_stac_core::{CollectionDraft, Error, Principal};

pub async fn all_collections(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> ApiResult<Json<Value>> {
    let pairs = query_pairs(query.as_deref());
    let mut limit = None;
    let mut token = None;
    for (key, value) in &pairs {
        match key.as_str() {
            "limit" => {
                limit = Some(value.parse().map_err(|_| {
                    Error::bad_request(format!("invalid limit '{value}'"))
                })?)
            }
            "token" => token = Some(value.clone()),
            _ => {}
        }
    }

    let page = state
        .catalog
        .all_collections(&principal, limit, token)
        .await?;
    let serializer = serializer(&headers);
    let next = page
        .next
        .as_deref()
        .map(|token| next_get_link(&serializer, "collections", &pairs, token, "application/json"));
    Ok(Json(serializer.collections(page, next)?))
}

pub async fn get_collection(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(collection_id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Json<Value>> {
    let collection = state
        .catalog
        .get_collection(&principal, &collection_id)
        .await?;
    Ok(Json(serializer(&headers).collection(collection)?))
}

pub async fn create_collection(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let draft: CollectionDraft = parse_body(&body)?;
    let overrides = auth_overrides(&query_pairs(query.as_deref()));
    let collection = state
        .catalog
        .create_collection(&principal, draft, &overrides)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(serializer(&headers).collection(collection)?),
    ))
}

pub async fn update_collection(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(collection_id): Path<String>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    let draft: CollectionDraft = parse_body(&body)?;
    let overrides = auth_overrides(&query_pairs(query.as_deref()));
    let collection = state
        .catalog
        .update_collection(&principal, &collection_id, draft, &overrides)
        .await?;
    Ok(Json(serializer(&headers).collection(collection)?))
}

pub async fn delete_collection(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(collection_id): Path<String>,
) -> ApiResult<StatusCode> {
    state
        .catalog
        .delete_collection(&principal, &collection_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
