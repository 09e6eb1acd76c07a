//! 后台任务登记表
//!
//! 缓存写入等“发出即不管”（fire-and-forget）的工作都通过这里派发：
//! - 派发方不等待任务完成，响应可以先返回给客户端；
//! - 任务的失败只在任务内部记录日志，不会传播给已完成的响应；
//! - 登记表记录在途任务数量，优雅退出与测试都可以等待其全部完成。

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::Notify;

/// 后台任务登记表（可廉价克隆，所有克隆共享同一份计数）
#[derive(Debug, Clone, Default)]
pub struct BackgroundTasks {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    /// 在途任务数
    in_flight: AtomicUsize,
    /// 已结束任务数（含 panic 结束的任务）
    finished: AtomicU64,
    /// 在途任务清零时唤醒等待者
    idle: Notify,
}

/// 随任务 future 一起移动；无论任务正常结束还是 panic，drop 时都会归还计数。
struct InFlightGuard {
    inner: Arc<Inner>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.inner.finished.fetch_add(1, Ordering::SeqCst);
        if self.inner.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.inner.idle.notify_waiters();
        }
    }
}

impl BackgroundTasks {
    pub fn new() -> Self {
        Self::default()
    }

    /// 派发一个后台任务，立即返回。
    pub fn spawn<F>(&self, label: &'static str, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.inner.in_flight.fetch_add(1, Ordering::SeqCst);
        let guard = InFlightGuard {
            inner: self.inner.clone(),
        };
        tracing::trace!(task = label, "派发后台任务");
        tokio::spawn(async move {
            let _guard = guard;
            task.await;
        });
    }

    /// 当前在途任务数
    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.load(Ordering::SeqCst)
    }

    /// 自创建以来已结束的任务数
    pub fn finished(&self) -> u64 {
        self.inner.finished.load(Ordering::SeqCst)
    }

    /// 等待所有在途任务结束（包括等待期间新派发的任务）。
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            tokio::pin!(notified);
            // 先登记等待，再检查计数，避免错过 notify_waiters。
            notified.as_mut().enable();
            if self.in_flight() == 0 {
                return;
            }
            notified.await;
        }
    }

    /// 带超时的排空：超时返回仍在途的任务数。
    pub async fn drain(&self, timeout: Duration) -> Result<(), usize> {
        match tokio::time::timeout(timeout, self.wait_idle()).await {
            Ok(()) => Ok(()),
            Err(_) => Err(self.in_flight()),
        }
    }
}
