//! Item endpoints, including the bulk transaction.

use super::{next_get_link, parse_body, query_pairs, serializer, str_pairs};
use crate::error::ApiResult;
use crate::state::AppState;
use axum::body::Bytes;
use axum::extract::{Path, RawQuery, State};
use axum::http::{HeaderMap, StatusCode};
use axum::{Extension, Json};
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;
use terra_stac_catalog::SearchRequest;
use terra_stac_core::{Error, Item, Principal};

/// Body of `POST /collections/{id}/bulk_items`
#[derive(Debug, Deserialize)]
pub struct BulkItems {
    pub items: IndexMap<String, Item>,
    #[serde(default)]
    pub method: Option<String>,
}

pub async fn item_collection(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(collection_id): Path<String>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> ApiResult<Json<Value>> {
    let pairs = query_pairs(query.as_deref());
    let request = SearchRequest::from_pairs(str_pairs(&pairs))?;
    let page = state
        .catalog
        .item_collection(&principal, &collection_id, request.into_query()?)
        .await?;

    let serializer = serializer(&headers);
    let path = format!("collections/{collection_id}/items");
    let next = page
        .next
        .as_deref()
        .map(|token| next_get_link(&serializer, &path, &pairs, token, "application/geo+json"));
    Ok(Json(serializer.item_collection(page, next)?))
}

pub async fn get_item(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path((collection_id, item_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> ApiResult<Json<Value>> {
    let item = state
        .catalog
        .get_item(&principal, &collection_id, &item_id)
        .await?;
    Ok(Json(serializer(&headers).item(item)?))
}

/// Create one item, or every feature of a `FeatureCollection` as a single
/// all-or-nothing write
pub async fn create_item(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(collection_id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let document: Value = parse_body(&body)?;
    let serializer = serializer(&headers);

    if document.get("type").and_then(Value::as_str) == Some("FeatureCollection") {
        let features = match document.get("features") {
            Some(Value::Array(features)) => features.clone(),
            _ => return Err(Error::bad_request("feature collection without features").into()),
        };
        let items = features
            .into_iter()
            .map(serde_json::from_value::<Item>)
            .collect::<Result<Vec<_>, _>>()?;
        let created = state
            .catalog
            .create_items(&principal, &collection_id, items)
            .await?
            .into_iter()
            .map(|item| serializer.item(item))
            .collect::<Result<Vec<_>, _>>()?;
        return Ok((
            StatusCode::CREATED,
            Json(serde_json::json!({"type": "FeatureCollection", "features": created})),
        ));
    }

    let item: Item = serde_json::from_value(document)?;
    let item = state
        .catalog
        .create_item(&principal, &collection_id, item)
        .await?;
    Ok((StatusCode::CREATED, Json(serializer.item(item)?)))
}

pub async fn update_item(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path((collection_id, item_id)): Path<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    let item: Item = parse_body(&body)?;
    let item = state
        .catalog
        .update_item(&principal, &collection_id, &item_id, item)
        .await?;
    Ok(Json(serializer(&headers).item(item)?))
}

pub async fn patch_item(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path((collection_id, item_id)): Path<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    let patch: Value = parse_body(&body)?;
    let item = state
        .catalog
        .patch_item(&principal, &collection_id, &item_id, &patch)
        .await?;
    Ok(Json(serializer(&headers).item(item)?))
}

pub async fn delete_item(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path((collection_id, item_id)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    state
        .catalog
        .delete_item(&principal, &collection_id, &item_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn bulk_items(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(collection_id): Path<String>,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    let bulk: BulkItems = parse_body(&body)?;
    if let Some(method) = bulk.method.as_deref() {
        if !matches!(method, "insert" | "upsert") {
            return Err(Error::bad_request(format!("unsupported bulk method '{method}'")).into());
        }
    }

    let inserted = state
        .catalog
        .bulk_insert(&principal, &collection_id, bulk.items.into_values().collect())
        .await?;
    Ok(Json(Value::String(format!(
        "Successfully added {inserted} Items."
    ))))
}
