use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::features::health::handler::health_check,
        crate::features::render::handler::render_image,
    ),
    components(schemas(
        crate::error::ErrorBody,
        crate::features::health::HealthResponse,
        crate::features::render::RenderMode,
    )),
    tags(
        (
            name = "Render",
            description = "动画 GIF 渲染：倒计时、LED 横幅、闪烁文字、打字机、逐字母闪烁、变色文字。"
        ),
        (name = "Health", description = "健康检查：服务探活。"),
    ),
    info(
        title = "GIF Backend API",
        version = env!("CARGO_PKG_VERSION"),
        description = "按 URL 渲染动画 GIF 的服务（Axum + utoipa）。除 /health、/api-docs 与 /favicon.ico 外，任何路径都会进入渲染链路。"
    )
)]
pub struct ApiDoc;
