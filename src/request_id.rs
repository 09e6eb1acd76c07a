//! 请求追踪 ID
//!
//! 每个请求都带一个 ID：客户端给出合法的 `X-Request-Id` 时沿用，否则生成 `req_<uuid>`。
//! ID 会写回响应头、进入 tracing span，并在错误体中回显。

use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use tracing::Instrument;
use uuid::Uuid;

pub static REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// 客户端 ID 最大长度
const MAX_CLIENT_ID_LEN: usize = 128;

/// 请求扩展中的 request id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

impl RequestId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn generate() -> Self {
        Self(format!("req_{}", Uuid::new_v4().simple()))
    }
}

tokio::task_local! {
    static TASK_REQUEST_ID: String;
}

/// 当前任务所处请求的 ID（不在请求上下文中时为 `None`）
pub fn current_request_id() -> Option<String> {
    TASK_REQUEST_ID.try_with(|v| v.clone()).ok()
}

fn is_acceptable(v: &str) -> bool {
    !v.is_empty()
        && v.len() <= MAX_CLIENT_ID_LEN
        && v.bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'))
}

fn resolve(req: &Request) -> RequestId {
    req.headers()
        .get(&REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|raw| is_acceptable(raw))
        .map(|raw| RequestId(raw.to_string()))
        .unwrap_or_else(RequestId::generate)
}

pub async fn request_id_middleware(mut req: Request, next: Next) -> Response {
    let id = resolve(&req);
    req.extensions_mut().insert(id.clone());

    let span = tracing::info_span!(
        "request",
        request_id = id.as_str(),
        method = %req.method(),
        path = req.uri().path()
    );

    let mut res = TASK_REQUEST_ID
        .scope(id.0.clone(), next.run(req).instrument(span))
        .await;

    if let Ok(value) = HeaderValue::from_str(id.as_str()) {
        res.headers_mut().insert(REQUEST_ID_HEADER.clone(), value);
    }
    res
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn request_with(id: Option<&str>) -> Request {
        let mut builder = Request::builder().uri("/");
        if let Some(id) = id {
            builder = builder.header("x-request-id", id);
        }
        builder.body(Body::empty()).expect("request")
    }

    #[test]
    fn safe_client_ids_are_kept() {
        assert_eq!(resolve(&request_with(Some(" cdn.edge-42_a "))).as_str(), "cdn.edge-42_a");
    }

    #[test]
    fn unsafe_or_missing_ids_are_replaced() {
        let long = "a".repeat(MAX_CLIENT_ID_LEN + 1);
        for bad in [None, Some(""), Some("has space"), Some("a/b"), Some(long.as_str())] {
            let id = resolve(&request_with(bad));
            assert!(id.as_str().starts_with("req_"), "{bad:?} -> {}", id.as_str());
        }
    }

    #[test]
    fn outside_a_request_there_is_no_id() {
        assert!(current_request_id().is_none());
    }
}
