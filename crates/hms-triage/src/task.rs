//! 可取消的后台任务
//!
//! 每个后台任务都带取消令牌和 JoinHandle；`stop` 取消并等待任务结束，
//! 返回后不会再有任何一次回调执行。句柄被丢弃时同样会取消任务。

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::{CancellationToken, DropGuard};

/// 活跃任务计数
#[derive(Debug, Clone, Default)]
pub struct TaskGauge(Arc<AtomicUsize>);

impl TaskGauge {
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前存活的任务数
    pub fn active(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    fn enter(&self) -> GaugeGuard {
        self.0.fetch_add(1, Ordering::SeqCst);
        GaugeGuard(self.0.clone())
    }
}

struct GaugeGuard(Arc<AtomicUsize>);

impl Drop for GaugeGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// 后台任务句柄
#[derive(Debug)]
pub struct BackgroundTask {
    name: String,
    token: CancellationToken,
    handle: JoinHandle<()>,
    _cancel_on_drop: DropGuard,
}

impl BackgroundTask {
    /// 启动任务，`body` 接收取消令牌并负责在取消时退出
    pub fn spawn<F, Fut>(name: impl Into<String>, gauge: Option<&TaskGauge>, body: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let name = name.into();
        let token = CancellationToken::new();
        let guard = gauge.map(TaskGauge::enter);
        let future = body(token.clone());
        let task_name = name.clone();

        let handle = tokio::spawn(async move {
            let _guard = guard;
            tracing::debug!("Task started: {}", task_name);
            future.await;
            tracing::debug!("Task finished: {}", task_name);
        });

        Self {
            name,
            _cancel_on_drop: token.clone().drop_guard(),
            token,
            handle,
        }
    }

    /// 启动周期任务，首次执行在一个周期之后
    pub fn spawn_periodic<F, Fut>(
        name: impl Into<String>,
        period: Duration,
        gauge: Option<&TaskGauge>,
        mut tick: F,
    ) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self::spawn(name, gauge, move |token| async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        if token.is_cancelled() {
                            break;
                        }
                        tick().await;
                    }
                }
            }
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// 取消并等待任务退出
    pub async fn stop(self) {
        let Self {
            name,
            token,
            handle,
            _cancel_on_drop,
        } = self;

        token.cancel();
        if let Err(e) = handle.await {
            if !e.is_cancelled() {
                tracing::error!("Task {} ended abnormally: {}", name, e);
            }
        }
        tracing::debug!("Task stopped: {}", name);
    }
}
