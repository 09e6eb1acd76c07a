//! 请求 → 图像 的渲染链路
//!
//! 处理顺序：缓存查询 →（未命中）参数规范化 → 引擎适配器 → 解码 → 构造响应 → 后台写缓存。

pub mod adapter;
pub mod cache;
pub mod decoder;
pub mod handler;
pub mod params;
pub mod types;

use axum::{Router, routing::get};

use crate::state::AppState;

pub use adapter::{RenderEngineAdapter, RenderOutput};
pub use cache::{
    CacheCoordinator, CacheKey, CachePolicy, CacheStoreError, CachedResponse, MokaResponseStore,
    ResponseStore,
};
pub use params::{QueryParams, normalize};
pub use types::{RenderConfig, RenderMode};

/// 渲染路由：`/favicon.ico` 单独处理，其余任意路径都走渲染链路。
pub fn create_render_router() -> Router<AppState> {
    Router::new()
        .route("/favicon.ico", get(handler::favicon))
        .route("/", get(handler::render_image))
        .route("/*path", get(handler::render_image))
}
