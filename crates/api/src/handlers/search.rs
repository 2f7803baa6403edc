//! Item search and aggregation endpoints.

use super::{next_get_link, next_post_link, parse_body, query_pairs, serializer, str_pairs};
use crate::error::ApiResult;
use crate::state::AppState;
use axum::body::Bytes;
use axum::extract::{Path, RawQuery, State};
use axum::http::HeaderMap;
use axum::{Extension, Json};
use serde_json::{json, Value};
use terra_stac_catalog::{AggregateRequest, Aggregation, SearchRequest, Serializer};
use terra_stac_core::Principal;

pub async fn search_get(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> ApiResult<Json<Value>> {
    let pairs = query_pairs(query.as_deref());
    let request = SearchRequest::from_pairs(str_pairs(&pairs))?;
    let page = state
        .catalog
        .search(&principal, request.into_query()?)
        .await?;

    let serializer = serializer(&headers);
    let next = page
        .next
        .as_deref()
        .map(|token| next_get_link(&serializer, "search", &pairs, token, "application/geo+json"));
    Ok(Json(serializer.item_collection(page, next)?))
}

pub async fn search_post(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    let document: Value = if body.is_empty() {
        json!({})
    } else {
        parse_body(&body)?
    };
    let request: SearchRequest = serde_json::from_value(document.clone())?;
    let page = state
        .catalog
        .search(&principal, request.into_query()?)
        .await?;

    let serializer = serializer(&headers);
    let next = page
        .next
        .as_deref()
        .map(|token| next_post_link(&serializer, "search", &document, token));
    Ok(Json(serializer.item_collection(page, next)?))
}

pub async fn aggregate_get(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> ApiResult<Json<Value>> {
    let pairs = query_pairs(query.as_deref());
    let request = AggregateRequest::from_pairs(str_pairs(&pairs))?;
    aggregate(&state, &principal, None, request, &serializer(&headers), "aggregate").await
}

pub async fn aggregate_post(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    let request = aggregate_body(&body)?;
    aggregate(&state, &principal, None, request, &serializer(&headers), "aggregate").await
}

pub async fn collection_aggregate_get(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(collection_id): Path<String>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> ApiResult<Json<Value>> {
    let pairs = query_pairs(query.as_deref());
    let request = AggregateRequest::from_pairs(str_pairs(&pairs))?;
    let path = format!("collections/{collection_id}/aggregate");
    aggregate(
        &state,
        &principal,
        Some(&collection_id),
        request,
        &serializer(&headers),
        &path,
    )
    .await
}

pub async fn collection_aggregate_post(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(collection_id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    let request = aggregate_body(&body)?;
    let path = format!("collections/{collection_id}/aggregate");
    aggregate(
        &state,
        &principal,
        Some(&collection_id),
        request,
        &serializer(&headers),
        &path,
    )
    .await
}

/// Aggregations available across the catalog
pub async fn aggregations(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    headers: HeaderMap,
) -> ApiResult<Json<Value>> {
    let descriptors = state.catalog.aggregations(&principal, None).await?;
    let serializer = serializer(&headers);
    Ok(Json(json!({
        "type": "AggregationCollection",
        "aggregations": descriptors,
        "links": [
            serializer.link("root", "", "application/json"),
            serializer.link("self", "aggregations", "application/json"),
        ],
    })))
}

/// Aggregations available for one collection; requires READ on it
pub async fn collection_aggregations(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(collection_id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Json<Value>> {
    let descriptors = state
        .catalog
        .aggregations(&principal, Some(&collection_id))
        .await?;
    let serializer = serializer(&headers);
    Ok(Json(json!({
        "type": "AggregationCollection",
        "aggregations": descriptors,
        "links": [
            serializer.link("root", "", "application/json"),
            serializer.link("collection", &format!("collections/{collection_id}"), "application/json"),
            serializer.link("self", &format!("collections/{collection_id}/aggregations"), "application/json"),
        ],
    })))
}

fn aggregate_body(body: &Bytes) -> ApiResult<AggregateRequest> {
    if body.is_empty() {
        Ok(AggregateRequest::default())
    } else {
        parse_body(body)
    }
}

async fn aggregate(
    state: &AppState,
    principal: &Principal,
    collection_id: Option<&str>,
    request: AggregateRequest,
    serializer: &Serializer,
    path: &str,
) -> ApiResult<Json<Value>> {
    let kinds = request.kinds()?;
    let aggregations: Vec<Aggregation> = state
        .catalog
        .aggregate(principal, collection_id, request.search.into_query()?, &kinds)
        .await?;
    Ok(Json(json!({
        "type": "AggregationCollection",
        "aggregations": aggregations,
        "links": [
            serializer.link("root", "", "application/json"),
            serializer.link("self", path, "application/json"),
        ],
    })))
}
