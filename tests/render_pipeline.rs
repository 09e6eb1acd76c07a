mod common;

use std::time::Duration;

use axum::http::{StatusCode, header};
use common::{STUB_GIF, StubBehavior, body_bytes, body_json, config, get, send, stub_app};

#[tokio::test]
async fn countdown_request_carries_normalized_arguments() {
    let (app, _state, stub) = stub_app(&config(false), StubBehavior::Gif);

    let resp = send(&app, get("/?date=2025-12-25&frames=5")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[header::CONTENT_TYPE], "image/gif");
    assert_eq!(resp.headers()[header::CACHE_CONTROL], "public, max-age=3600");
    assert_eq!(resp.headers()[header::CONTENT_DISPOSITION], "inline");
    assert_eq!(
        resp.headers()[header::CONTENT_LENGTH],
        STUB_GIF.len().to_string().as_str()
    );
    assert_eq!(body_bytes(resp).await.as_ref(), STUB_GIF);

    let calls = stub.calls();
    assert_eq!(calls.len(), 1);
    let (entry, args) = &calls[0];
    assert_eq!(entry, "build");
    assert_eq!(args["date"], "2025-12-25T00:00:00.000Z");
    assert_eq!(args["frames"], 5);
    assert_eq!(args["background"], "000");
    assert_eq!(args["kind"], "rounded");
}

#[tokio::test]
async fn first_path_segment_selects_the_mode() {
    let (app, _state, stub) = stub_app(&config(false), StubBehavior::Gif);

    for (path, entry) in [
        ("/led-banner?text=HI", "buildLedBanner"),
        ("/flashing-text", "buildFlashingText"),
        ("/typing-text/extra/segments", "buildTypingText"),
        ("/flashing-letters", "buildFlashingLetters"),
        ("/color-varying-text", "buildColorVaryingText"),
        ("/something-else", "build"),
    ] {
        let resp = send(&app, get(path)).await;
        assert_eq!(resp.status(), StatusCode::OK, "{path}");
        assert_eq!(stub.calls().last().expect("call").0, entry, "{path}");
    }

    let banner = &stub.calls()[0].1;
    assert_eq!(banner["text"], "HI");
    assert_eq!(banner["forward"], false);
    assert_eq!(banner["spaceSize"], 5);
}

#[tokio::test]
async fn every_request_gets_a_fresh_engine_instance() {
    let (app, _state, stub) = stub_app(&config(false), StubBehavior::Gif);
    for _ in 0..3 {
        send(&app, get("/?frames=2")).await;
    }
    assert_eq!(stub.instantiations(), 3);
}

#[tokio::test]
async fn favicon_is_empty_and_touches_nothing() {
    let (app, state, stub) = stub_app(&config(true), StubBehavior::Gif);

    let resp = send(&app, get("/favicon.ico")).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert!(body_bytes(resp).await.is_empty());

    state.background.wait_idle().await;
    assert_eq!(stub.instantiations(), 0);
    assert_eq!(state.background.finished(), 0);
}

#[tokio::test]
async fn unparsable_date_fails_before_the_engine() {
    let (app, state, stub) = stub_app(&config(true), StubBehavior::Gif);

    let resp = send(&app, get("/?date=not-a-date")).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(resp).await;
    assert!(
        json["error"].as_str().unwrap_or("").contains("not-a-date"),
        "unexpected body: {json}"
    );
    assert_eq!(json["code"], "VALIDATION_FAILED");

    state.background.wait_idle().await;
    assert_eq!(stub.instantiations(), 0);
    assert_eq!(state.background.finished(), 0);
}

#[tokio::test]
async fn engine_failure_is_a_500_and_is_not_cached() {
    let (app, state, _stub) = stub_app(&config(true), StubBehavior::Fail);

    let resp = send(&app, get("/?frames=1")).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(resp).await["code"], "ENGINE_FAILED");

    state.background.wait_idle().await;
    assert_eq!(state.background.finished(), 0);
}

#[tokio::test]
async fn malformed_engine_output_is_a_decode_failure() {
    let (app, _state, _stub) = stub_app(&config(false), StubBehavior::Garbage);

    let resp = send(&app, get("/")).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(resp).await["code"], "DECODE_FAILED");
}

#[tokio::test]
async fn slow_engine_hits_the_time_limit() {
    let mut cfg = config(false);
    cfg.render.timeout_ms = 50;
    let (app, _state, _stub) = stub_app(&cfg, StubBehavior::Sleep(Duration::from_millis(500)));

    let resp = send(&app, get("/")).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(resp).await["code"], "ENGINE_TIMEOUT");
}
