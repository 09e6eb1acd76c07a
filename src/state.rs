use std::sync::Arc;

use crate::background::BackgroundTasks;
use crate::config::AppConfig;
use crate::features::engine::EngineFactory;
use crate::features::render::{
    CacheCoordinator, CachePolicy, MokaResponseStore, RenderEngineAdapter, RenderMode,
    ResponseStore,
};

/// 聚合的应用共享状态
#[derive(Clone)]
pub struct AppState {
    /// 引擎适配器（实例化 + 调用 + 超时 + 并发许可）
    pub renderer: RenderEngineAdapter,
    pub cache: CacheCoordinator,
    /// 缓存写入等后台任务；优雅退出时排空
    pub background: BackgroundTasks,
    pub default_mode: RenderMode,
}

impl AppState {
    /// 按配置组装状态，响应存储使用进程内 moka 缓存。
    pub fn from_config(config: &AppConfig, factory: Arc<dyn EngineFactory>) -> Self {
        let store = MokaResponseStore::new(
            config.cache.max_bytes,
            usize::try_from(config.cache.max_entry_bytes).unwrap_or(usize::MAX),
        );
        Self::with_store(config, factory, Arc::new(store))
    }

    /// 使用给定的响应存储组装状态。
    pub fn with_store(
        config: &AppConfig,
        factory: Arc<dyn EngineFactory>,
        store: Arc<dyn ResponseStore>,
    ) -> Self {
        let background = BackgroundTasks::new();
        let policy = CachePolicy {
            read_enabled: config.cache_read_enabled(),
            max_age: config.cache.max_age(),
        };
        let max_parallel = usize::try_from(config.render.max_parallel).unwrap_or(0);

        tracing::info!(
            "渲染并发许可: {}，引擎时限: {}ms，缓存读取: {}",
            if max_parallel == 0 {
                num_cpus::get()
            } else {
                max_parallel
            },
            config.render.timeout_ms,
            if policy.read_enabled { "启用" } else { "关闭" }
        );

        Self {
            renderer: RenderEngineAdapter::new(factory, config.render.timeout(), max_parallel),
            cache: CacheCoordinator::new(store, background.clone(), policy),
            background,
            default_mode: config.render.default_mode,
        }
    }
}
