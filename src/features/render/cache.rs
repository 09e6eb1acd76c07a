//! 边缘响应缓存
//!
//! - [`CacheKey`]：由请求方法 + 完整 URL（含查询串，顺序敏感）确定；
//! - [`ResponseStore`]：进程内共享的响应存储接口，默认实现基于 moka；
//! - [`CacheCoordinator`]：查询命中、未命中时在后台登记表上异步写入。

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use futures_util::future::BoxFuture;
use moka::Expiry;
use moka::future::Cache;
use thiserror::Error;

use crate::background::BackgroundTasks;

/// 缓存键："METHOD URL"
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(method: &Method, url: &str) -> Self {
        Self(format!("{method} {url}"))
    }

    /// 从请求行与 Host 头推导完整 URL。
    ///
    /// 服务端收到的通常是 origin-form（`/path?query`），此时用 `Host` 补全。
    pub fn from_request(method: &Method, uri: &Uri, headers: &HeaderMap) -> Self {
        if uri.scheme().is_some() && uri.authority().is_some() {
            return Self::new(method, &uri.to_string());
        }
        let host = headers
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .filter(|h| !h.is_empty())
            .unwrap_or("localhost");
        let path_and_query = uri.path_and_query().map(|p| p.as_str()).unwrap_or("/");
        Self::new(method, &format!("http://{host}{path_and_query}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// 完整的已缓存响应（状态 + 头 + 体），写入时整体覆盖。
#[derive(Debug, Clone)]
pub struct CachedResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl CachedResponse {
    /// 近似占用字节数，用于容量加权
    pub fn weight(&self) -> usize {
        let headers: usize = self
            .headers
            .iter()
            .map(|(k, v)| k.as_str().len() + v.len())
            .sum();
        self.body.len() + headers
    }
}

impl IntoResponse for CachedResponse {
    fn into_response(self) -> Response {
        let mut res = Response::new(Body::from(self.body));
        *res.status_mut() = self.status;
        *res.headers_mut() = self.headers;
        res
    }
}

#[derive(Debug, Error)]
pub enum CacheStoreError {
    #[error("响应体过大: {size} 字节（单条上限 {limit} 字节）")]
    TooLarge { size: usize, limit: usize },

    #[error("缓存后端错误: {0}")]
    Backend(String),
}

/// 共享响应存储
pub trait ResponseStore: Send + Sync {
    fn get<'a>(&'a self, key: &'a CacheKey) -> BoxFuture<'a, Option<CachedResponse>>;

    /// 写入（覆盖）一条响应，`max_age` 之后过期。
    fn put(
        &self,
        key: CacheKey,
        response: CachedResponse,
        max_age: Duration,
    ) -> BoxFuture<'_, Result<(), CacheStoreError>>;
}

#[derive(Debug, Clone)]
struct StoredEntry {
    response: CachedResponse,
    max_age: Duration,
}

/// 每条记录按自身的 max-age 过期；覆盖写入会重新计时。
struct PerEntryMaxAge;

impl Expiry<CacheKey, StoredEntry> for PerEntryMaxAge {
    fn expire_after_create(
        &self,
        _key: &CacheKey,
        value: &StoredEntry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.max_age)
    }

    fn expire_after_update(
        &self,
        _key: &CacheKey,
        value: &StoredEntry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.max_age)
    }
}

/// 基于 moka 的进程内响应存储（容量按字节加权）
#[derive(Clone)]
pub struct MokaResponseStore {
    cache: Cache<CacheKey, StoredEntry>,
    max_entry_bytes: usize,
}

impl MokaResponseStore {
    pub fn new(max_bytes: u64, max_entry_bytes: usize) -> Self {
        let cache = Cache::builder()
            .weigher(|_k, v: &StoredEntry| v.response.weight().try_into().unwrap_or(u32::MAX))
            .max_capacity(max_bytes)
            .expire_after(PerEntryMaxAge)
            .build();
        Self {
            cache,
            max_entry_bytes,
        }
    }

    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    /// 处理挂起的淘汰/过期任务（主要给测试用）
    pub async fn sync(&self) {
        self.cache.run_pending_tasks().await;
    }
}

impl ResponseStore for MokaResponseStore {
    fn get<'a>(&'a self, key: &'a CacheKey) -> BoxFuture<'a, Option<CachedResponse>> {
        Box::pin(async move { self.cache.get(key).await.map(|e| e.response) })
    }

    fn put(
        &self,
        key: CacheKey,
        response: CachedResponse,
        max_age: Duration,
    ) -> BoxFuture<'_, Result<(), CacheStoreError>> {
        Box::pin(async move {
            let size = response.weight();
            if size > self.max_entry_bytes {
                return Err(CacheStoreError::TooLarge {
                    size,
                    limit: self.max_entry_bytes,
                });
            }
            self.cache
                .insert(key, StoredEntry { response, max_age })
                .await;
            Ok(())
        })
    }
}

/// 缓存策略（构造时确定）
#[derive(Debug, Clone, Copy)]
pub struct CachePolicy {
    /// 是否使用命中结果；写入总会发生
    pub read_enabled: bool,
    pub max_age: Duration,
}

#[derive(Clone)]
pub struct CacheCoordinator {
    store: Arc<dyn ResponseStore>,
    tasks: BackgroundTasks,
    policy: CachePolicy,
}

impl CacheCoordinator {
    pub fn new(store: Arc<dyn ResponseStore>, tasks: BackgroundTasks, policy: CachePolicy) -> Self {
        Self {
            store,
            tasks,
            policy,
        }
    }

    pub fn policy(&self) -> CachePolicy {
        self.policy
    }

    /// 成功响应携带的 `cache-control`
    pub fn cache_control(&self) -> HeaderValue {
        let value = format!("public, max-age={}", self.policy.max_age.as_secs());
        HeaderValue::from_str(&value).unwrap_or(HeaderValue::from_static("public, max-age=3600"))
    }

    /// 查询先前的响应；读关闭或未命中时返回 `None`，从不失败。
    pub async fn lookup(&self, key: &CacheKey) -> Option<CachedResponse> {
        if !self.policy.read_enabled {
            return None;
        }
        self.store.get(key).await
    }

    /// 在后台写入响应，立即返回；写入失败只记录日志。
    pub fn store(&self, key: CacheKey, response: CachedResponse) {
        let store = self.store.clone();
        let max_age = self.policy.max_age;
        self.tasks.spawn("cache_store", async move {
            let t0 = Instant::now();
            match store.put(key.clone(), response, max_age).await {
                Ok(()) => tracing::debug!(
                    target: "render_performance",
                    key = key.as_str(),
                    "缓存写入完成，耗时: {}ms",
                    t0.elapsed().as_millis()
                ),
                Err(e) => tracing::warn!(key = key.as_str(), "缓存写入失败（已忽略）: {}", e),
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gif_response(body: &'static [u8]) -> CachedResponse {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("image/gif"));
        CachedResponse {
            status: StatusCode::OK,
            headers,
            body: Bytes::from_static(body),
        }
    }

    fn key(url: &str) -> CacheKey {
        CacheKey::new(&Method::GET, url)
    }

    #[test]
    fn key_is_method_plus_full_url_and_order_sensitive() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("gif.example"));

        let a: Uri = "/?a=1&b=2".parse().expect("uri");
        let b: Uri = "/?b=2&a=1".parse().expect("uri");
        let ka = CacheKey::from_request(&Method::GET, &a, &headers);
        let kb = CacheKey::from_request(&Method::GET, &b, &headers);
        assert_eq!(ka.as_str(), "GET http://gif.example/?a=1&b=2");
        assert_ne!(ka, kb);

        let head = CacheKey::from_request(&Method::HEAD, &a, &headers);
        assert_ne!(ka, head);

        let absolute: Uri = "https://other.example/x?y=1".parse().expect("uri");
        assert_eq!(
            CacheKey::from_request(&Method::GET, &absolute, &headers).as_str(),
            "GET https://other.example/x?y=1"
        );
    }

    #[tokio::test]
    async fn put_then_get_and_overwrite() {
        let store = MokaResponseStore::new(1024 * 1024, 1024);
        let k = key("http://h/?x=1");
        assert!(store.get(&k).await.is_none());

        store
            .put(k.clone(), gif_response(b"one"), Duration::from_secs(60))
            .await
            .expect("put");
        assert_eq!(store.get(&k).await.expect("hit").body.as_ref(), b"one");

        store
            .put(k.clone(), gif_response(b"two"), Duration::from_secs(60))
            .await
            .expect("put");
        assert_eq!(store.get(&k).await.expect("hit").body.as_ref(), b"two");
    }

    #[tokio::test]
    async fn entries_expire_after_max_age() {
        let store = MokaResponseStore::new(1024 * 1024, 1024);
        let k = key("http://h/?short");
        store
            .put(k.clone(), gif_response(b"gif"), Duration::from_millis(50))
            .await
            .expect("put");
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(store.get(&k).await.is_none());
    }

    #[tokio::test]
    async fn oversized_entries_are_refused() {
        let store = MokaResponseStore::new(1024 * 1024, 8);
        let err = store
            .put(key("http://h/"), gif_response(b"0123456789abcdef"), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, CacheStoreError::TooLarge { .. }));
        store.sync().await;
        assert_eq!(store.entry_count(), 0);
    }

    #[tokio::test]
    async fn coordinator_respects_read_toggle_but_always_stores() {
        let store = Arc::new(MokaResponseStore::new(1024 * 1024, 1024));
        let tasks = BackgroundTasks::new();
        let policy = CachePolicy {
            read_enabled: false,
            max_age: Duration::from_secs(3600),
        };
        let writer_only = CacheCoordinator::new(store.clone(), tasks.clone(), policy);
        let k = key("http://h/?toggle");

        writer_only.store(k.clone(), gif_response(b"gif"));
        tasks.wait_idle().await;
        assert!(writer_only.lookup(&k).await.is_none());

        let reader = CacheCoordinator::new(
            store,
            tasks,
            CachePolicy {
                read_enabled: true,
                ..policy
            },
        );
        assert_eq!(reader.lookup(&k).await.expect("hit").body.as_ref(), b"gif");
        assert_eq!(
            reader.cache_control(),
            HeaderValue::from_static("public, max-age=3600")
        );
    }

    #[tokio::test]
    async fn cached_response_round_trips_into_a_response() {
        let res = gif_response(b"GIF89a").into_response();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers()[header::CONTENT_TYPE], "image/gif");
    }
}
