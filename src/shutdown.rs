//! 优雅退出
//!
//! 收到 SIGINT / SIGTERM（Windows 为 Ctrl+C）后：
//! 1. 停止接收新连接，等待在途请求完成；
//! 2. 在限定时间内排空后台任务（主要是缓存写入），超时则放弃剩余任务。

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Notify;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::background::BackgroundTasks;
use crate::config::ShutdownConfig;

/// 退出原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// 用户中断信号 (Ctrl+C)
    Interrupt,
    /// 终止信号 (SIGTERM)
    Terminate,
    /// 应用请求退出
    Application,
}

#[derive(Debug, thiserror::Error)]
pub enum ShutdownError {
    #[error("信号设置失败: {0}")]
    SignalSetup(String),

    #[error("优雅退出超时")]
    Timeout,
}

/// 优雅退出管理器（克隆共享同一状态）
#[derive(Debug, Clone, Default)]
pub struct ShutdownManager {
    inner: Arc<ShutdownInner>,
}

#[derive(Debug, Default)]
struct ShutdownInner {
    notify: Notify,
    /// 首个退出原因；之后的重复信号被忽略
    reason: Mutex<Option<ShutdownReason>>,
    shutting_down: AtomicBool,
}

impl ShutdownManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn reason(&self) -> ShutdownReason {
        self.inner
            .reason
            .lock()
            .ok()
            .and_then(|g| *g)
            .unwrap_or(ShutdownReason::Application)
    }

    /// 等待退出信号；已触发时立即返回首个原因。
    pub async fn wait_for_shutdown(&self) -> ShutdownReason {
        let notified = self.inner.notify.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();
        if !self.is_shutting_down() {
            debug!("等待退出信号...");
            notified.await;
        }
        self.reason()
    }

    /// 触发优雅退出（只有第一次生效）
    pub fn trigger_shutdown(&self, reason: ShutdownReason) {
        if self
            .inner
            .shutting_down
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("重复的退出信号被忽略: {:?}", reason);
            return;
        }

        info!("触发优雅退出: {:?}", reason);
        if let Ok(mut guard) = self.inner.reason.lock() {
            *guard = Some(reason);
        }
        self.inner.notify.notify_waiters();
    }

    pub fn is_shutting_down(&self) -> bool {
        self.inner.shutting_down.load(Ordering::SeqCst)
    }

    /// 启动信号监听（Linux/macOS：SIGINT + SIGTERM；Windows：Ctrl+C）
    pub fn start_signal_handler(&self) -> Result<(), ShutdownError> {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};

            let mut sigint = signal(SignalKind::interrupt())
                .map_err(|e| ShutdownError::SignalSetup(e.to_string()))?;
            let mut sigterm = signal(SignalKind::terminate())
                .map_err(|e| ShutdownError::SignalSetup(e.to_string()))?;

            let manager = self.clone();
            tokio::spawn(async move {
                tokio::select! {
                    _ = sigint.recv() => {
                        info!("接收到SIGINT信号 (Ctrl+C)");
                        manager.trigger_shutdown(ShutdownReason::Interrupt);
                    }
                    _ = sigterm.recv() => {
                        info!("接收到SIGTERM信号");
                        manager.trigger_shutdown(ShutdownReason::Terminate);
                    }
                }
            });
        }

        #[cfg(not(unix))]
        {
            let manager = self.clone();
            tokio::spawn(async move {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    error!("监听Ctrl+C信号失败: {}", e);
                    return;
                }
                info!("接收到Ctrl+C信号");
                manager.trigger_shutdown(ShutdownReason::Interrupt);
            });
        }

        Ok(())
    }
}

/// 在 `drain_duration` 内等待后台任务完成；超时只记录被放弃的数量。
///
/// 返回是否全部排空。
pub async fn drain_background(tasks: &BackgroundTasks, config: &ShutdownConfig) -> bool {
    let pending = tasks.in_flight();
    if pending == 0 {
        return true;
    }
    info!("等待 {} 个后台任务完成...", pending);
    match tasks.drain(config.drain_duration()).await {
        Ok(()) => {
            info!("后台任务已全部完成");
            true
        }
        Err(left) => {
            warn!(
                "后台任务排空超时（{}s），放弃 {} 个任务",
                config.background_drain_secs, left
            );
            false
        }
    }
}

/// 服务器退出后的收尾：排空后台任务，整体受 `timeout_secs` 约束。
pub async fn finish(tasks: &BackgroundTasks, config: &ShutdownConfig) -> Result<(), ShutdownError> {
    match timeout(config.timeout_duration(), drain_background(tasks, config)).await {
        Ok(_) => Ok(()),
        Err(_) => {
            error!("优雅退出超时（{}s）", config.timeout_secs);
            Err(ShutdownError::Timeout)
        }
    }
}
