use axum::{Json, Router, middleware, routing::get};
use utoipa::OpenApi;

use crate::compression::compression_layer;
use crate::features::{health, render};
use crate::openapi::ApiDoc;
use crate::request_id::request_id_middleware;
use crate::state::AppState;

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// 组装完整路由。
///
/// `/health`、`/api-docs/openapi.json`、`/favicon.ico` 是精确路由，优先于渲染通配路由。
pub fn build_app(state: AppState) -> Router {
    Router::<AppState>::new()
        .route("/health", get(health::health_check))
        .route("/api-docs/openapi.json", get(openapi_json))
        .merge(render::create_render_router())
        .with_state(state)
        .layer(compression_layer())
        .layer(middleware::from_fn(request_id_middleware))
}
