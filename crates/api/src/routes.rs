//! Router assembly.

use crate::auth::{authenticate, require_authenticated};
use crate::handlers::{collections, items, landing, search};
use crate::state::AppState;
use axum::http::{HeaderValue, Method};
use axum::middleware;
use axum::routing::{get, post, put};
use axum::Router;
use terra_stac_config::Settings;
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

/// Build the service router.
///
/// Mutating routes are guarded so that anonymous callers receive a 401
/// before any business logic runs; every other route resolves its access
/// decisions per collection.
pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/collections", post(collections::create_collection))
        .route(
            "/collections/:collection_id",
            put(collections::update_collection).delete(collections::delete_collection),
        )
        .route("/collections/:collection_id/items", post(items::create_item))
        .route(
            "/collections/:collection_id/items/:item_id",
            put(items::update_item)
                .patch(items::patch_item)
                .delete(items::delete_item),
        )
        .route(
            "/collections/:collection_id/bulk_items",
            post(items::bulk_items),
        )
        .route_layer(middleware::from_fn(require_authenticated));

    let public = Router::new()
        .route("/", get(landing::landing_page))
        .route("/conformance", get(landing::conformance))
        .route("/queryables", get(landing::queryables))
        .route("/_mgmt/ping", get(landing::ping))
        .route("/collections", get(collections::all_collections))
        .route("/collections/:collection_id", get(collections::get_collection))
        .route(
            "/collections/:collection_id/queryables",
            get(landing::collection_queryables),
        )
        .route(
            "/collections/:collection_id/items",
            get(items::item_collection),
        )
        .route(
            "/collections/:collection_id/items/:item_id",
            get(items::get_item),
        )
        .route(
            "/search",
            get(search::search_get).post(search::search_post),
        )
        .route(
            "/aggregate",
            get(search::aggregate_get).post(search::aggregate_post),
        )
        .route(
            "/collections/:collection_id/aggregate",
            get(search::collection_aggregate_get).post(search::collection_aggregate_post),
        )
        .route(
            "/aggregations",
            get(search::aggregations).post(search::aggregations),
        )
        .route(
            "/collections/:collection_id/aggregations",
            get(search::collection_aggregations).post(search::collection_aggregations),
        );

    let cors = cors_layer(&state.settings);
    public
        .merge(protected)
        .layer(middleware::from_fn_with_state(state.clone(), authenticate))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// CORS policy from the settings. A wildcard origin combined with
/// credentials mirrors the request origin, since browsers reject `*` there.
pub fn cors_layer(settings: &Settings) -> CorsLayer {
    let wildcard = settings.cors_allow_origins.iter().any(|o| o == "*");
    let origins = match (wildcard, settings.cors_allow_credentials) {
        (true, true) => AllowOrigin::mirror_request(),
        (true, false) => AllowOrigin::any(),
        (false, _) => AllowOrigin::list(
            settings
                .cors_allow_origins
                .iter()
                .filter_map(|origin| match HeaderValue::from_str(origin) {
                    Ok(value) => Some(value),
                    Err(_) => {
                        tracing::warn!(origin = %origin, "ignoring invalid CORS origin");
                        None
                    }
                }),
        ),
    };

    let methods: Vec<Method> = settings
        .cors_allow_methods
        .iter()
        .filter_map(|method| match Method::from_bytes(method.trim().as_bytes()) {
            Ok(method) => Some(method),
            Err(_) => {
                tracing::warn!(method = %method, "ignoring invalid CORS method");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(methods)
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(settings.cors_allow_credentials)
}
