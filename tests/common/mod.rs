#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    Router,
    body::{Body, Bytes, to_bytes},
    http::{Request, Response},
};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use gif_backend::features::engine::{EngineError, EngineFactory, RenderEngine};
use gif_backend::{AppConfig, AppState, build_app};
use tower::ServiceExt;

pub const STUB_GIF: &[u8] = b"GIF89a\x01\x00\x01\x00\x00\x00\x00;";

/// 桩引擎的行为
#[derive(Debug, Clone)]
pub enum StubBehavior {
    /// 返回 `STUB_GIF` 的 base64
    Gif,
    /// 入口调用失败
    Fail,
    /// 返回非法 base64
    Garbage,
    /// 睡眠后再返回
    Sleep(Duration),
}

/// 记录实例化与调用情况的桩工厂
#[derive(Debug)]
pub struct StubFactory {
    pub behavior: StubBehavior,
    pub instantiations: AtomicUsize,
    pub calls: Mutex<Vec<(String, serde_json::Value)>>,
}

impl StubFactory {
    pub fn new(behavior: StubBehavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            instantiations: AtomicUsize::new(0),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn instantiations(&self) -> usize {
        self.instantiations.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<(String, serde_json::Value)> {
        self.calls.lock().expect("calls lock").clone()
    }
}

struct StubEngine {
    factory: Arc<StubFactory>,
}

impl RenderEngine for StubEngine {
    fn call(&mut self, entry: &str, args: &serde_json::Value) -> Result<String, EngineError> {
        self.factory
            .calls
            .lock()
            .expect("calls lock")
            .push((entry.to_string(), args.clone()));
        match &self.factory.behavior {
            StubBehavior::Gif => Ok(STANDARD.encode(STUB_GIF)),
            StubBehavior::Fail => Err(EngineError::Render("stub failure".into())),
            StubBehavior::Garbage => Ok("not*base64".into()),
            StubBehavior::Sleep(d) => {
                std::thread::sleep(*d);
                Ok(STANDARD.encode(STUB_GIF))
            }
        }
    }
}

/// `EngineFactory` 需要 `&self`，桩引擎要回指工厂，所以用一层 Arc 包装。
pub struct SharedStub(pub Arc<StubFactory>);

impl EngineFactory for SharedStub {
    fn instantiate(&self) -> Result<Box<dyn RenderEngine>, EngineError> {
        self.0.instantiations.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(StubEngine {
            factory: self.0.clone(),
        }))
    }
}

pub fn config(read_enabled: bool) -> AppConfig {
    let mut cfg = AppConfig::default();
    cfg.cache.read_enabled = Some(read_enabled);
    cfg
}

pub fn stub_app(cfg: &AppConfig, behavior: StubBehavior) -> (Router, AppState, Arc<StubFactory>) {
    let stub = StubFactory::new(behavior);
    let state = AppState::from_config(cfg, Arc::new(SharedStub(stub.clone())));
    (build_app(state.clone()), state, stub)
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("host", "gif.test")
        .body(Body::empty())
        .expect("request")
}

pub async fn send(app: &Router, req: Request<Body>) -> Response<Body> {
    app.clone().oneshot(req).await.expect("oneshot")
}

pub async fn body_bytes(resp: Response<Body>) -> Bytes {
    to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("read body")
}

pub async fn body_json(resp: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(resp).await).expect("parse json")
}
