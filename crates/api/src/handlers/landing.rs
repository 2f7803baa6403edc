//! Landing page, conformance, queryables and the management ping.

use super::serializer;
use crate::error::ApiResult;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::{Extension, Json};
use serde_json::{json, Value};
use terra_stac_catalog::Serializer;
use terra_stac_core::Principal;

pub const STAC_VERSION: &str = "1.0.0";

pub const CONFORMANCE_CLASSES: &[&str] = &[
    "https://api.stacspec.org/v1.0.0/core",
    "https://api.stacspec.org/v1.0.0/collections",
    "https://api.stacspec.org/v1.0.0/ogcapi-features",
    "https://api.stacspec.org/v1.0.0/ogcapi-features/extensions/transaction",
    "https://api.stacspec.org/v1.0.0/item-search",
    "https://api.stacspec.org/v0.3.0/aggregation",
    "http://www.opengis.net/spec/ogcapi-features-1/1.0/conf/core",
    "http://www.opengis.net/spec/ogcapi-features-1/1.0/conf/oas30",
    "http://www.opengis.net/spec/ogcapi-features-1/1.0/conf/geojson",
    "http://www.opengis.net/spec/ogcapi-features-4/1.0/conf/simpletx",
];

/// Root catalog. Child links are listed only for collections the caller
/// may read.
pub async fn landing_page(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    headers: HeaderMap,
) -> ApiResult<Json<Value>> {
    let serializer = serializer(&headers);
    let collections = state
        .catalog
        .authorized_collections(principal.scopes(), Some(vec!["title".to_string()]))
        .await?;

    let mut links = vec![
        serializer.link("self", "", "application/json"),
        serializer.link("root", "", "application/json"),
        serializer.link("conformance", "conformance", "application/json"),
        serializer.link("data", "collections", "application/json"),
        json!({
            "rel": "search",
            "type": "application/geo+json",
            "method": "GET",
            "href": serializer.href("search"),
        }),
        json!({
            "rel": "search",
            "type": "application/geo+json",
            "method": "POST",
            "href": serializer.href("search"),
        }),
        serializer.link("aggregate", "aggregate", "application/json"),
        serializer.link("aggregations", "aggregations", "application/json"),
        serializer.link(
            "http://www.opengis.net/def/rel/ogc/1.0/queryables",
            "queryables",
            "application/schema+json",
        ),
    ];
    links.extend(collections.into_iter().map(|collection| {
        let title = collection
            .fields
            .get("title")
            .and_then(Value::as_str)
            .unwrap_or(&collection.id)
            .to_string();
        json!({
            "rel": "child",
            "type": "application/json",
            "title": title,
            "href": serializer.href(&format!("collections/{}", collection.id)),
        })
    }));

    Ok(Json(json!({
        "type": "Catalog",
        "stac_version": STAC_VERSION,
        "id": state.settings.stac_id,
        "title": state.settings.stac_title,
        "description": state.settings.stac_description,
        "conformsTo": CONFORMANCE_CLASSES,
        "links": links,
    })))
}

pub async fn conformance() -> Json<Value> {
    Json(json!({ "conformsTo": CONFORMANCE_CLASSES }))
}

pub async fn queryables(headers: HeaderMap) -> Json<Value> {
    let serializer = serializer(&headers);
    Json(queryables_document(&serializer, "queryables"))
}

pub async fn collection_queryables(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(collection_id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Json<Value>> {
    state
        .catalog
        .get_collection(&principal, &collection_id)
        .await?;
    let serializer = serializer(&headers);
    Ok(Json(queryables_document(
        &serializer,
        &format!("collections/{collection_id}/queryables"),
    )))
}

pub async fn ping() -> Json<Value> {
    Json(json!({ "message": "PONG" }))
}

fn queryables_document(serializer: &Serializer, path: &str) -> Value {
    json!({
        "$schema": "https://json-schema.org/draft/2019-09/schema",
        "$id": serializer.href(path),
        "type": "object",
        "title": "Queryables for STAC API",
        "properties": {
            "id": {
                "description": "ID",
                "$ref": "https://schemas.stacspec.org/v1.0.0/item-spec/json-schema/item.json#/definitions/core/allOf/2/properties/id"
            },
            "collection": {
                "description": "Collection",
                "$ref": "https://schemas.stacspec.org/v1.0.0/item-spec/json-schema/item.json#/collection"
            },
            "geometry": {
                "description": "Geometry",
                "$ref": "https://schemas.stacspec.org/v1.0.0/item-spec/json-schema/item.json#/definitions/core/allOf/1/oneOf/0/properties/geometry"
            },
            "datetime": {
                "description": "Datetime",
                "$ref": "https://schemas.stacspec.org/v1.0.0/item-spec/json-schema/datetime.json#/properties/datetime"
            }
        },
        "additionalProperties": true
    })
}
