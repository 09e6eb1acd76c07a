use std::sync::Arc;

use axum::{
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use chrono::{DateTime, Utc};
use gif_backend::features::engine::{BuiltinEngineFactory, FixedClock};
use gif_backend::{AppConfig, AppState, build_app};
use resvg::usvg::fontdb;
use tower::ServiceExt;

fn app() -> axum::Router {
    let now: DateTime<Utc> = DateTime::parse_from_rfc3339("2025-12-20T00:00:00Z")
        .expect("timestamp")
        .with_timezone(&Utc);
    // 空字体库：不依赖宿主机字体
    let factory = BuiltinEngineFactory::new(Arc::new(fontdb::Database::new()), Arc::new(FixedClock(now)));
    let state = AppState::from_config(&AppConfig::default(), Arc::new(factory));
    build_app(state)
}

async fn fetch(uri: &str) -> (StatusCode, Option<String>, Vec<u8>) {
    let resp = app()
        .oneshot(
            Request::builder()
                .uri(uri)
                .header("host", "gif.test")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("oneshot");
    let status = resp.status();
    let ct = resp
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("read body")
        .to_vec();
    (status, ct, body)
}

#[tokio::test]
async fn countdown_renders_a_real_gif() {
    let (status, ct, body) = fetch("/?date=2025-12-25&frames=5").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ct.as_deref(), Some("image/gif"));
    assert!(body.starts_with(b"GIF89a"));
}

#[tokio::test]
async fn small_text_modes_render_real_gifs() {
    for uri in [
        "/led-banner?text=HI&width=120&height=40&frames=2",
        "/flashing-text?text=GO&width=120&height=80&frames=2&words=2",
        "/typing-text?text=AB&width=120&height=60",
        "/flashing-letters?text=AB&width=120&height=60&frames=2",
        "/color-varying-text?text=AB&width=120&height=60&frames=2",
    ] {
        let (status, ct, body) = fetch(uri).await;
        assert_eq!(status, StatusCode::OK, "{uri}");
        assert_eq!(ct.as_deref(), Some("image/gif"), "{uri}");
        assert!(body.starts_with(b"GIF89a"), "{uri}");
    }
}
