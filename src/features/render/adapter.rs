use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Semaphore;

use crate::error::AppError;
use crate::features::engine::{EngineError, EngineFactory};

use super::types::RenderConfig;

/// 引擎输出：图像字节的 base64 文本，解码后即丢弃。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOutput(String);

impl RenderOutput {
    pub fn new(encoded: impl Into<String>) -> Self {
        Self(encoded.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// 渲染引擎适配器
///
/// 每次调用都实例化一个全新的引擎，在阻塞线程池上同步调用入口，调用结束即丢弃实例。
/// 并发渲染数由信号量限制；超时后请求立即失败，阻塞任务继续跑完但结果被丢弃
/// （许可随任务一起释放，避免超时请求堆积压垮 CPU）。
#[derive(Clone)]
pub struct RenderEngineAdapter {
    factory: Arc<dyn EngineFactory>,
    timeout: Duration,
    permits: Arc<Semaphore>,
}

impl RenderEngineAdapter {
    /// `max_parallel == 0` 时按 CPU 核数限制并发。
    pub fn new(factory: Arc<dyn EngineFactory>, timeout: Duration, max_parallel: usize) -> Self {
        let permits = if max_parallel == 0 {
            num_cpus::get()
        } else {
            max_parallel
        };
        Self {
            factory,
            timeout,
            permits: Arc::new(Semaphore::new(permits)),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn render(&self, config: &RenderConfig) -> Result<RenderOutput, AppError> {
        let entry = config.mode().entry_point();
        let args = config.to_engine_args()?;

        let t_wait = Instant::now();
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| AppError::Internal(format!("获取渲染信号量失败: {e}")))?;
        tracing::debug!(
            target: "render_performance",
            "信号量获取完成，剩余许可: {}, 等待: {}ms",
            self.permits.available_permits(),
            t_wait.elapsed().as_millis()
        );

        let factory = self.factory.clone();
        let t_render = Instant::now();
        let job = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            let mut engine = factory.instantiate()?;
            engine.call(entry, &args)
        });

        let encoded = match tokio::time::timeout(self.timeout, job).await {
            Err(_) => {
                let ms = self.timeout.as_millis() as u64;
                tracing::warn!(entry, "引擎调用超时（{}ms），结果将被丢弃", ms);
                return Err(EngineError::Timeout(ms).into());
            }
            Ok(Err(join_err)) => {
                return Err(EngineError::Aborted(join_err.to_string()).into());
            }
            Ok(Ok(result)) => result?,
        };

        tracing::info!(
            target: "render_performance",
            entry,
            "引擎渲染完成，输出 {} 字符, 耗时: {}ms",
            encoded.len(),
            t_render.elapsed().as_millis()
        );
        Ok(RenderOutput(encoded))
    }
}
