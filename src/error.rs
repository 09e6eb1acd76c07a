use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::features::engine::EngineError;

/// 应用统一错误类型
///
/// 渲染链路上的三类失败（参数校验 / 引擎 / 解码）都会在请求处理边界被转换为
/// `500` + JSON 错误体，任何一个请求的失败都不会影响其他请求。
#[derive(Error, Debug)]
pub enum AppError {
    /// 参数校验错误（例如无法解析的日期）
    #[error("参数校验错误: {0}")]
    Validation(String),

    /// 渲染引擎错误（实例化失败、调用失败、超时）
    #[error("渲染引擎错误: {0}")]
    Engine(#[from] EngineError),

    /// 引擎输出不是合法的 base64 编码
    #[error("图像解码错误: {0}")]
    Decode(String),

    /// 内部服务器错误
    #[error("内部错误: {0}")]
    Internal(String),
}

/// 错误响应体：`{"error": "...", "code": "...", "requestId": "..."}`
#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    /// 人类可读的错误信息
    #[schema(example = "参数校验错误: 无法解析的日期参数 date=not-a-date")]
    pub error: String,

    /// 稳定的错误码，用于程序化处理。
    #[schema(example = "VALIDATION_FAILED")]
    pub code: String,

    /// 可选：请求追踪 ID（由 request-id 中间件注入）。
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl AppError {
    /// 渲染链路的所有失败统一映射为服务端错误。
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_)
            | AppError::Engine(_)
            | AppError::Decode(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn stable_code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_FAILED",
            AppError::Engine(EngineError::Timeout(_)) => "ENGINE_TIMEOUT",
            AppError::Engine(_) => "ENGINE_FAILED",
            AppError::Decode(_) => "DECODE_FAILED",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorBody {
            error: self.to_string(),
            code: self.stable_code().to_string(),
            request_id: crate::request_id::current_request_id(),
        };

        tracing::warn!(code = %body.code, "请求处理失败: {}", body.error);

        let mut res = Json(body).into_response();
        *res.status_mut() = status;
        res
    }
}

impl From<base64::DecodeError> for AppError {
    fn from(err: base64::DecodeError) -> Self {
        AppError::Decode(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[test]
    fn every_pipeline_failure_is_a_server_error() {
        let errors = [
            AppError::Validation("bad date".into()),
            AppError::Engine(EngineError::Timeout(10)),
            AppError::Decode("bad padding".into()),
            AppError::Internal("join".into()),
        ];
        for e in errors {
            assert_eq!(e.status_code(), StatusCode::INTERNAL_SERVER_ERROR, "{e}");
        }
    }

    #[test]
    fn engine_timeout_has_its_own_code() {
        assert_eq!(
            AppError::Engine(EngineError::Timeout(5)).stable_code(),
            "ENGINE_TIMEOUT"
        );
        assert_eq!(
            AppError::Engine(EngineError::Render("boom".into())).stable_code(),
            "ENGINE_FAILED"
        );
    }

    #[tokio::test]
    async fn error_body_carries_message_under_error_key() {
        let resp = AppError::Validation("无法解析的日期参数 date=x".into()).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = to_bytes(resp.into_body(), usize::MAX)
            .await
            .expect("read body");
        let json: serde_json::Value = serde_json::from_slice(&body).expect("parse json");
        assert!(
            json["error"].as_str().unwrap_or("").contains("date=x"),
            "unexpected body: {json}"
        );
        assert_eq!(json["code"].as_str(), Some("VALIDATION_FAILED"));
        assert!(json.get("requestId").is_none());
    }
}
