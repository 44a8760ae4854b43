//! 生命体征恶化模拟
//!
//! 周期性地以低概率随机挑选一名候诊患者，把生命体征改写为恶化读数并触发告警。
//! 已在告警中的患者不会被再次触发，每个周期最多产生一次新告警。

use hms_core::{QueueItemId, Vitals};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::queue::QueueStore;
use crate::task::BackgroundTask;

/// 模拟器配置
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatorConfig {
    /// 触发周期
    pub interval: Duration,
    /// 每个周期触发恶化的概率
    pub probability: f64,
    /// 恶化读数，合并到患者当前生命体征上
    pub degraded: Vitals,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(15),
            probability: 0.1,
            degraded: Vitals {
                heart_rate: Some(135),
                oxygen_saturation: Some(88),
                ..Default::default()
            },
        }
    }
}

/// 恶化触发源：给定队列长度，决定本周期挑选哪个位置
pub trait DeteriorationSource: Send + fmt::Debug {
    fn pick(&mut self, queue_len: usize) -> Option<usize>;
}

/// 按固定概率随机触发
#[derive(Debug)]
pub struct RandomDeterioration {
    probability: f64,
    rng: StdRng,
}

impl RandomDeterioration {
    pub fn new(probability: f64) -> Self {
        Self {
            probability: probability.clamp(0.0, 1.0),
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seeded(probability: f64, seed: u64) -> Self {
        Self {
            probability: probability.clamp(0.0, 1.0),
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl DeteriorationSource for RandomDeterioration {
    fn pick(&mut self, queue_len: usize) -> Option<usize> {
        if queue_len == 0 || !self.rng.gen_bool(self.probability) {
            return None;
        }
        Some(self.rng.gen_range(0..queue_len))
    }
}

/// 按预设脚本触发，脚本耗尽后不再触发
#[derive(Debug, Default)]
pub struct ScriptedDeterioration {
    script: VecDeque<Option<usize>>,
}

impl ScriptedDeterioration {
    pub fn new(script: impl IntoIterator<Item = Option<usize>>) -> Self {
        Self {
            script: script.into_iter().collect(),
        }
    }
}

impl DeteriorationSource for ScriptedDeterioration {
    fn pick(&mut self, queue_len: usize) -> Option<usize> {
        self.script
            .pop_front()
            .flatten()
            .filter(|&index| index < queue_len)
    }
}

/// 周期任务实际使用的部分，不持有任务句柄
struct SimulatorCore {
    queue: QueueStore,
    config: SimulatorConfig,
    source: Mutex<Box<dyn DeteriorationSource>>,
}

impl SimulatorCore {
    async fn tick(&self) -> Option<QueueItemId> {
        let mut queue = self.queue.write().await;
        let index = self.source.lock().await.pick(queue.len())?;
        let item = queue.items().get(index)?;

        if item.is_alarming {
            tracing::debug!("ER patient {} already alarming, tick skipped", item.id);
            return None;
        }

        let id = item.id;
        let bay = item.bay_number;
        queue.set_alarm(id, true, Some(self.config.degraded.clone()));
        drop(queue);
        self.queue.notify_changed();

        tracing::warn!("Simulated vitals deterioration for ER patient {} in bay {}", id, bay);
        Some(id)
    }
}

/// 生命体征恶化模拟器
///
/// 最后一个句柄被丢弃时周期任务随之取消。
#[derive(Clone)]
pub struct VitalsSimulator {
    core: Arc<SimulatorCore>,
    task: Arc<Mutex<Option<BackgroundTask>>>,
}

impl fmt::Debug for VitalsSimulator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VitalsSimulator")
            .field("config", &self.core.config)
            .finish()
    }
}

impl VitalsSimulator {
    /// 使用随机触发源创建模拟器
    pub fn new(queue: QueueStore, config: SimulatorConfig) -> Self {
        let source = RandomDeterioration::new(config.probability);
        Self::with_source(queue, config, Box::new(source))
    }

    pub fn with_source(
        queue: QueueStore,
        config: SimulatorConfig,
        source: Box<dyn DeteriorationSource>,
    ) -> Self {
        Self {
            core: Arc::new(SimulatorCore {
                queue,
                config,
                source: Mutex::new(source),
            }),
            task: Arc::new(Mutex::new(None)),
        }
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.core.config
    }

    /// 执行一个周期，返回新进入告警的队列项
    pub async fn tick(&self) -> Option<QueueItemId> {
        self.core.tick().await
    }

    /// 直接让指定患者恶化；已在告警中或不在队列时不做任何修改
    pub async fn degrade(&self, id: QueueItemId) -> bool {
        let degraded = self
            .core
            .queue
            .set_alarm(id, true, Some(self.core.config.degraded.clone()))
            .await;
        if degraded {
            tracing::warn!("Vitals deterioration triggered for ER patient {}", id);
        }
        degraded
    }

    /// 启动周期模拟，重复调用无副作用
    pub async fn start(&self) {
        let mut task = self.task.lock().await;
        if task.is_some() {
            tracing::debug!("Vitals simulator already running");
            return;
        }

        let core = self.core.clone();
        *task = Some(BackgroundTask::spawn_periodic(
            "vitals-simulator",
            self.core.config.interval,
            None,
            move || {
                let core = core.clone();
                async move {
                    core.tick().await;
                }
            },
        ));

        tracing::info!(
            "Vitals simulator started (interval {:?}, probability {})",
            self.core.config.interval,
            self.core.config.probability
        );
    }

    /// 停止周期模拟，可重复调用
    pub async fn stop(&self) {
        let task = self.task.lock().await.take();
        if let Some(task) = task {
            task.stop().await;
            tracing::info!("Vitals simulator stopped");
        }
    }

    pub async fn is_running(&self) -> bool {
        self.task.lock().await.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hms_core::{QueueItem, TriagePriority, TriageResult};

    fn store() -> QueueStore {
        let vitals = Vitals {
            heart_rate: Some(90),
            blood_pressure: Some("125/80".to_string()),
            oxygen_saturation: Some(97),
            temperature: Some(37.2),
            respiratory_rate: None,
        };
        QueueStore::from_items(vec![
            QueueItem::new(1, 1, "a", vitals.clone(), TriageResult::new(TriagePriority::Critical, "")),
            QueueItem::new(2, 2, "b", vitals, TriageResult::new(TriagePriority::Urgent, "")),
        ])
    }

    #[tokio::test]
    async fn test_tick_degrades_picked_item() {
        let queue = store();
        let simulator = VitalsSimulator::with_source(
            queue.clone(),
            SimulatorConfig::default(),
            Box::new(ScriptedDeterioration::new([Some(1)])),
        );

        assert_eq!(simulator.tick().await, Some(2));

        let item = queue.get(2).await.unwrap();
        assert!(item.is_alarming);
        assert_eq!(item.vitals.heart_rate, Some(135));
        assert_eq!(item.vitals.oxygen_saturation, Some(88));
        assert_eq!(item.vitals.blood_pressure.as_deref(), Some("125/80"));
        assert_eq!(item.vitals.temperature, Some(37.2));
        assert!(!queue.get(1).await.unwrap().is_alarming);
    }

    #[tokio::test]
    async fn test_tick_skips_already_alarming_item() {
        let queue = store();
        let simulator = VitalsSimulator::with_source(
            queue.clone(),
            SimulatorConfig::default(),
            Box::new(ScriptedDeterioration::new([Some(0), Some(0)])),
        );

        assert_eq!(simulator.tick().await, Some(1));
        let after_first = queue.snapshot().await;
        let revision = queue.revision();

        assert_eq!(simulator.tick().await, None);
        assert_eq!(queue.snapshot().await, after_first);
        assert_eq!(queue.revision(), revision);
    }

    #[tokio::test]
    async fn test_degrade_is_idempotent() {
        let queue = store();
        let simulator = VitalsSimulator::new(queue.clone(), SimulatorConfig::default());

        assert!(simulator.degrade(1).await);
        queue
            .update_vitals(1, &Vitals {
                heart_rate: Some(150),
                ..Default::default()
            })
            .await;
        let before = queue.get(1).await.unwrap();
        let revision = queue.revision();

        assert!(!simulator.degrade(1).await);
        assert_eq!(queue.get(1).await.unwrap(), before);
        assert_eq!(queue.revision(), revision);
        assert!(!simulator.degrade(99).await);
    }

    #[tokio::test]
    async fn test_empty_queue_never_picks() {
        let queue = QueueStore::new();
        let simulator = VitalsSimulator::with_source(
            queue,
            SimulatorConfig::default(),
            Box::new(RandomDeterioration::seeded(1.0, 7)),
        );
        assert_eq!(simulator.tick().await, None);
    }

    #[test]
    fn test_random_source_respects_probability() {
        let mut never = RandomDeterioration::seeded(0.0, 1);
        assert!((0..100).all(|_| never.pick(3).is_none()));

        let mut always = RandomDeterioration::seeded(1.0, 1);
        assert!((0..100).all(|_| matches!(always.pick(3), Some(index) if index < 3)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_periodic_simulation_and_idempotent_stop() {
        let queue = store();
        let config = SimulatorConfig {
            interval: Duration::from_secs(15),
            ..Default::default()
        };
        let simulator = VitalsSimulator::with_source(
            queue.clone(),
            config,
            Box::new(ScriptedDeterioration::new([None, Some(0)])),
        );

        simulator.start().await;
        simulator.start().await;
        assert!(simulator.is_running().await);

        tokio::time::sleep(Duration::from_secs(16)).await;
        assert!(queue.list_alarming().await.is_empty());

        tokio::time::sleep(Duration::from_secs(15)).await;
        assert_eq!(queue.list_alarming().await.len(), 1);

        simulator.stop().await;
        simulator.stop().await;
        assert!(!simulator.is_running().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_simulator_cancels_ticks() {
        let queue = store();
        let simulator = VitalsSimulator::with_source(
            queue.clone(),
            SimulatorConfig::default(),
            Box::new(ScriptedDeterioration::new([Some(0), Some(1)])),
        );

        simulator.start().await;
        tokio::time::sleep(Duration::from_secs(5)).await;
        drop(simulator);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(queue.list_alarming().await.is_empty());
    }
}
