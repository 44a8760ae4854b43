//! 告警通知器
//!
//! 监听候诊队列变化，驱动 [`SirenMachine`] 并把命令落实到音频输出上。
//! 全系统同一时刻最多只有一个重复播报计时器。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hms_core::utils::alert_message;
use hms_core::{QueueItemId, Result, Vitals};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::Mutex;

use crate::queue::QueueStore;
use crate::siren::{SirenCommand, SirenMachine, SirenState};
use crate::task::{BackgroundTask, TaskGauge};

/// 告警历史保留条数
const HISTORY_LIMIT: usize = 100;

/// 音频输出
#[async_trait]
pub trait AudioSink: Send + Sync {
    /// 立即播报
    async fn speak(&self, message: &str) -> Result<()>;
    /// 取消所有待播和正在播放的语音
    async fn cancel_all(&self) -> Result<()>;
}

/// 只写日志的音频输出，用于无声卡的部署
#[derive(Debug, Default)]
pub struct TracingAudioSink;

#[async_trait]
impl AudioSink for TracingAudioSink {
    async fn speak(&self, message: &str) -> Result<()> {
        tracing::warn!(target: "siren", "{}", message);
        Ok(())
    }

    async fn cancel_all(&self) -> Result<()> {
        tracing::debug!(target: "siren", "speech cancelled");
        Ok(())
    }
}

/// 告警事件类型
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AlarmEventKind {
    Raised,     // 警报器启动
    Retargeted, // 切换目标
    Cleared,    // 警报器停止
}

/// 告警事件
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AlarmEvent {
    pub kind: AlarmEventKind,
    pub item_id: QueueItemId,
    pub bay_number: u32,
    pub at: DateTime<Utc>,
}

struct SirenRuntime {
    machine: SirenMachine,
    repeat: Option<BackgroundTask>,
    history: VecDeque<AlarmEvent>,
}

impl SirenRuntime {
    fn record(&mut self, kind: AlarmEventKind, item_id: QueueItemId, bay_number: u32) {
        if self.history.len() == HISTORY_LIMIT {
            self.history.pop_front();
        }
        self.history.push_back(AlarmEvent {
            kind,
            item_id,
            bay_number,
            at: Utc::now(),
        });
    }
}

struct NotifierInner {
    queue: QueueStore,
    sink: Arc<dyn AudioSink>,
    repeat_interval: Duration,
    runtime: Mutex<SirenRuntime>,
    timers: TaskGauge,
    watcher: Mutex<Option<BackgroundTask>>,
}

/// 告警通知器
#[derive(Clone)]
pub struct AlarmNotifier {
    inner: Arc<NotifierInner>,
}

impl fmt::Debug for AlarmNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlarmNotifier")
            .field("repeat_interval", &self.inner.repeat_interval)
            .field("active_timers", &self.inner.timers.active())
            .finish()
    }
}

impl AlarmNotifier {
    pub fn new(queue: QueueStore, sink: Arc<dyn AudioSink>, repeat_interval: Duration) -> Self {
        Self {
            inner: Arc::new(NotifierInner {
                queue,
                sink,
                repeat_interval,
                runtime: Mutex::new(SirenRuntime {
                    machine: SirenMachine::new(),
                    repeat: None,
                    history: VecDeque::new(),
                }),
                timers: TaskGauge::new(),
                watcher: Mutex::new(None),
            }),
        }
    }

    /// 开始监听队列变化，重复调用无副作用
    pub async fn start(&self) {
        let mut watcher = self.inner.watcher.lock().await;
        if watcher.is_some() {
            return;
        }

        // 只持有弱引用，最后一个句柄被丢弃时通知器随之拆除
        let notifier = Arc::downgrade(&self.inner);
        let mut changes = self.inner.queue.subscribe();
        *watcher = Some(BackgroundTask::spawn("alarm-notifier", None, move |token| async move {
            if !Self::sync_weak(&notifier).await {
                return;
            }
            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    changed = changes.changed() => {
                        if changed.is_err() || !Self::sync_weak(&notifier).await {
                            break;
                        }
                    }
                }
            }
        }));

        tracing::info!("Alarm notifier started");
    }

    /// 停止监听并关闭警报器，可重复调用
    pub async fn stop(&self) {
        let watcher = self.inner.watcher.lock().await.take();
        if let Some(watcher) = watcher {
            watcher.stop().await;
        }

        let mut runtime = self.inner.runtime.lock().await;
        let previous = runtime.machine.state();
        if let Some(command) = runtime.machine.reset() {
            self.apply(&mut runtime, previous, command).await;
        }
        if let Some(repeat) = runtime.repeat.take() {
            repeat.stop().await;
        }
    }

    /// 按当前队列重新评估警报器，返回执行的命令
    pub async fn sync(&self) -> Option<SirenCommand> {
        let mut runtime = self.inner.runtime.lock().await;
        let alarming = self.inner.queue.list_alarming().await;
        let previous = runtime.machine.state();
        let command = runtime.machine.evaluate(&alarming)?;
        self.apply(&mut runtime, previous, command).await;
        Some(command)
    }

    /// 通知器已被拆除时返回 `false`
    async fn sync_weak(inner: &Weak<NotifierInner>) -> bool {
        match inner.upgrade() {
            Some(inner) => {
                AlarmNotifier { inner }.sync().await;
                true
            }
            None => false,
        }
    }

    /// 消除告警：清除告警标记并恢复基线生命体征，随后重新评估警报器
    ///
    /// `baseline` 为空时恢复告警触发时记录的读数。
    pub async fn silence(&self, id: QueueItemId, baseline: Option<Vitals>) -> bool {
        let cleared = self.inner.queue.set_alarm(id, false, baseline).await;
        if cleared {
            tracing::info!("Alarm silenced for ER patient {}", id);
        } else {
            tracing::debug!("ER patient {} not alarming, nothing to silence", id);
        }
        self.sync().await;
        cleared
    }

    pub async fn state(&self) -> SirenState {
        self.inner.runtime.lock().await.machine.state()
    }

    /// 是否有重复播报计时器在运行
    pub async fn is_active(&self) -> bool {
        self.inner.runtime.lock().await.repeat.is_some()
    }

    /// 存活的重复播报计时器数量
    pub fn active_repeat_timers(&self) -> usize {
        self.inner.timers.active()
    }

    pub async fn history(&self) -> Vec<AlarmEvent> {
        self.inner.runtime.lock().await.history.iter().cloned().collect()
    }

    async fn apply(&self, runtime: &mut SirenRuntime, previous: SirenState, command: SirenCommand) {
        match command {
            SirenCommand::Start { item_id, bay_number } => {
                tracing::warn!("Siren raised for ER bay {} (patient {})", bay_number, item_id);
                self.announce(bay_number).await;
                self.start_repeat(runtime, bay_number).await;
                runtime.record(AlarmEventKind::Raised, item_id, bay_number);
            }
            SirenCommand::Retarget {
                previous: previous_id,
                item_id,
                bay_number,
            } => {
                tracing::warn!(
                    "Siren moved from patient {} to ER bay {} (patient {})",
                    previous_id,
                    bay_number,
                    item_id
                );
                self.stop_repeat(runtime).await;
                self.cancel_speech().await;
                self.announce(bay_number).await;
                self.start_repeat(runtime, bay_number).await;
                runtime.record(AlarmEventKind::Retargeted, item_id, bay_number);
            }
            SirenCommand::Stop => {
                self.stop_repeat(runtime).await;
                self.cancel_speech().await;
                if let SirenState::Alarming { item_id, bay_number } = previous {
                    runtime.record(AlarmEventKind::Cleared, item_id, bay_number);
                }
                tracing::info!("Siren stopped, no ER patient alarming");
            }
        }
    }

    async fn start_repeat(&self, runtime: &mut SirenRuntime, bay_number: u32) {
        debug_assert!(runtime.repeat.is_none(), "siren repeat timer already running");
        self.stop_repeat(runtime).await;

        let sink = self.inner.sink.clone();
        let message = Arc::new(alert_message(bay_number));
        runtime.repeat = Some(BackgroundTask::spawn_periodic(
            format!("siren-bay-{}", bay_number),
            self.inner.repeat_interval,
            Some(&self.inner.timers),
            move || {
                let sink = sink.clone();
                let message = message.clone();
                async move {
                    if let Err(e) = sink.speak(&message).await {
                        tracing::error!("Failed to repeat siren announcement: {}", e);
                    }
                }
            },
        ));
    }

    async fn stop_repeat(&self, runtime: &mut SirenRuntime) {
        if let Some(repeat) = runtime.repeat.take() {
            repeat.stop().await;
        }
    }

    async fn announce(&self, bay_number: u32) {
        if let Err(e) = self.inner.sink.speak(&alert_message(bay_number)).await {
            tracing::error!("Failed to announce siren for bay {}: {}", bay_number, e);
        }
    }

    async fn cancel_speech(&self) {
        if let Err(e) = self.inner.sink.cancel_all().await {
            tracing::error!("Failed to cancel siren speech: {}", e);
        }
    }
}
