use std::time::Instant;

use axum::{
    extract::State,
    http::{HeaderMap, HeaderValue, Method, StatusCode, Uri, header},
    response::{IntoResponse, Response},
};

use crate::{error::AppError, state::AppState};

use super::cache::{CacheKey, CachedResponse};
use super::decoder;
use super::params::{self, QueryParams};
use super::types::RenderMode;

/// 浏览器自动请求的站点图标：空 204，不读缓存也不渲染。
pub async fn favicon() -> StatusCode {
    StatusCode::NO_CONTENT
}

#[utoipa::path(
    get,
    path = "/{mode}",
    summary = "生成动画 GIF",
    description = "按路径第一段选择渲染模式（countdown / led-banner / flashing-text / typing-text / flashing-letters / color-varying-text），其余路径使用默认模式。所有渲染参数来自查询串，缺失或非法的数值回落到默认值。相同 URL 的结果在缓存有效期内直接复用。",
    params(
        ("mode" = RenderMode, Path, description = "渲染模式；省略或未知时使用配置的默认模式"),
        ("background" = Option<String>, Query, description = "背景色（十六进制，别名 bg）"),
        ("color" = Option<String>, Query, description = "前景色（十六进制）"),
        ("date" = Option<String>, Query, description = "倒计时目标日期，默认 2025-01-01；无法解析时返回 500"),
        ("gmt" = Option<i64>, Query, description = "时区偏移（小时）"),
        ("frames" = Option<i64>, Query, description = "帧数"),
        ("lang" = Option<String>, Query, description = "倒计时标签语言"),
        ("kind" = Option<String>, Query, description = "倒计时样式：rounded | rounded-ticks | rounded-dots | 其他为纯文本"),
        ("text" = Option<String>, Query, description = "文字内容"),
        ("width" = Option<i64>, Query, description = "画布宽度"),
        ("height" = Option<i64>, Query, description = "画布高度"),
        ("delay" = Option<f64>, Query, description = "帧间隔（毫秒）"),
        ("spaceSize" = Option<i64>, Query, description = "横幅文字间隔空格数"),
        ("speed" = Option<i64>, Query, description = "横幅速度"),
        ("forward" = Option<bool>, Query, description = "横幅方向，仅 \"true\" 为真"),
    ),
    responses(
        (status = 200, description = "GIF bytes", content_type = "image/gif"),
        (status = 500, description = "参数校验 / 引擎 / 解码失败", body = crate::error::ErrorBody)
    ),
    tag = "Render"
)]
pub async fn render_image(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let t_total = Instant::now();
    let key = CacheKey::from_request(&method, &uri, &headers);

    if let Some(hit) = state.cache.lookup(&key).await {
        tracing::info!(
            target: "render_performance",
            key = key.as_str(),
            "缓存命中，耗时: {}ms",
            t_total.elapsed().as_millis()
        );
        return Ok(hit.into_response());
    }

    let mode = RenderMode::from_path(uri.path(), state.default_mode);
    let config = params::normalize(mode, &QueryParams::from_uri(&uri))?;

    let output = state.renderer.render(&config).await?;

    let t_decode = Instant::now();
    let body = decoder::decode(&output)?;
    tracing::debug!(
        target: "render_performance",
        "解码完成，{} 字节, 耗时: {}ms",
        body.len(),
        t_decode.elapsed().as_millis()
    );

    let mut res_headers = HeaderMap::new();
    res_headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("image/gif"));
    res_headers.insert(header::CONTENT_LENGTH, HeaderValue::from(body.len()));
    res_headers.insert(header::CONTENT_DISPOSITION, HeaderValue::from_static("inline"));
    res_headers.insert(header::CACHE_CONTROL, state.cache.cache_control());

    let response = CachedResponse {
        status: StatusCode::OK,
        headers: res_headers,
        body,
    };
    state.cache.store(key, response.clone());

    tracing::info!(
        target: "render_performance",
        mode = %mode,
        "请求完成（未命中缓存），总耗时: {}ms",
        t_total.elapsed().as_millis()
    );
    Ok(response.into_response())
}
