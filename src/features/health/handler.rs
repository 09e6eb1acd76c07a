use axum::{extract::State, http::StatusCode, response::Json};
use serde::Serialize;

use crate::state::AppState;

/// 健康检查响应
#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    #[schema(example = "healthy")]
    pub status: String,
    #[schema(example = "gif-backend")]
    pub service: String,
    /// Cargo package version
    #[schema(example = "0.1.0")]
    pub version: String,
    /// 未指明模式的路径所使用的渲染模式
    #[schema(example = "countdown")]
    pub default_mode: String,
    /// 是否使用缓存命中
    pub cache_reads: bool,
    /// 在途后台任务数（缓存写入）
    pub background_tasks: usize,
}

#[utoipa::path(
    get,
    path = "/health",
    summary = "健康检查",
    description = "探活端点：返回服务状态、版本、默认渲染模式与缓存读开关。",
    responses((status = 200, description = "服务健康", body = HealthResponse)),
    tag = "Health"
)]
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            service: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            default_mode: state.default_mode.to_string(),
            cache_reads: state.cache.policy().read_enabled,
            background_tasks: state.background.in_flight(),
        }),
    )
}
