//! 急诊分诊台
//!
//! 组合候诊队列、床位池、入院协调器、恶化模拟器和告警通知器，
//! 对外提供医护人员操作接口。

use hms_core::utils::next_queue_item_id;
use hms_core::{QueueItem, QueueItemId, TriagePriority, TriageResult, Vitals};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::admission::{Admission, AdmissionCoordinator};
use crate::beds::BedPool;
use crate::notifier::{AlarmNotifier, AudioSink};
use crate::queue::QueueStore;
use crate::simulator::{DeteriorationSource, SimulatorConfig, VitalsSimulator};

/// 分诊台配置
#[derive(Debug, Clone, PartialEq)]
pub struct DeskConfig {
    /// 是否运行生命体征恶化模拟
    pub simulate_deterioration: bool,
    pub simulator: SimulatorConfig,
    /// 警报重复播报间隔
    pub siren_repeat_interval: Duration,
}

impl Default for DeskConfig {
    fn default() -> Self {
        Self {
            simulate_deterioration: true,
            simulator: SimulatorConfig::default(),
            siren_repeat_interval: Duration::from_secs(6),
        }
    }
}

/// 分诊台概览
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeskOverview {
    pub queue_length: usize,
    pub waiting_by_priority: HashMap<TriagePriority, usize>,
    pub alarming: usize,
    pub available_beds: usize,
    pub siren_active: bool,
}

/// 急诊分诊台
#[derive(Debug, Clone)]
pub struct TriageDesk {
    config: DeskConfig,
    queue: QueueStore,
    beds: BedPool,
    coordinator: AdmissionCoordinator,
    simulator: VitalsSimulator,
    notifier: AlarmNotifier,
}

impl TriageDesk {
    /// 使用随机恶化模拟创建分诊台
    pub fn new(
        queue: QueueStore,
        beds: BedPool,
        sink: Arc<dyn AudioSink>,
        config: DeskConfig,
    ) -> Self {
        let simulator = VitalsSimulator::new(queue.clone(), config.simulator.clone());
        Self::assemble(queue, beds, sink, config, simulator)
    }

    /// 使用指定的恶化触发源创建分诊台
    pub fn with_source(
        queue: QueueStore,
        beds: BedPool,
        sink: Arc<dyn AudioSink>,
        config: DeskConfig,
        source: Box<dyn DeteriorationSource>,
    ) -> Self {
        let simulator =
            VitalsSimulator::with_source(queue.clone(), config.simulator.clone(), source);
        Self::assemble(queue, beds, sink, config, simulator)
    }

    fn assemble(
        queue: QueueStore,
        beds: BedPool,
        sink: Arc<dyn AudioSink>,
        config: DeskConfig,
        simulator: VitalsSimulator,
    ) -> Self {
        let coordinator = AdmissionCoordinator::new(queue.clone(), beds.clone());
        let notifier = AlarmNotifier::new(queue.clone(), sink, config.siren_repeat_interval);
        Self {
            config,
            queue,
            beds,
            coordinator,
            simulator,
            notifier,
        }
    }

    /// 启动后台任务
    pub async fn start(&self) {
        self.notifier.start().await;
        if self.config.simulate_deterioration {
            self.simulator.start().await;
        }
        tracing::info!("Triage desk started");
    }

    /// 停止所有后台任务，可重复调用
    pub async fn stop(&self) {
        self.simulator.stop().await;
        self.notifier.stop().await;
        tracing::info!("Triage desk stopped");
    }

    /// 加入候诊队列
    pub async fn add_to_queue(&self, item: QueueItem) {
        self.queue.enqueue(item).await;
        self.notifier.sync().await;
    }

    /// 分诊登记：生成ID后加入队列
    pub async fn intake(
        &self,
        bay_number: u32,
        complaint: impl Into<String>,
        vitals: Vitals,
        result: TriageResult,
    ) -> QueueItem {
        let item = QueueItem::new(next_queue_item_id(), bay_number, complaint, vitals, result);
        self.add_to_queue(item.clone()).await;
        item
    }

    /// 入院，返回是否成功
    pub async fn admit_patient(&self, id: QueueItemId) -> bool {
        self.admit(id).await.is_some()
    }

    /// 入院并返回分配的床位
    pub async fn admit(&self, id: QueueItemId) -> Option<Admission> {
        let admission = self.coordinator.try_admit(id).await;
        if admission.is_some() {
            self.notifier.sync().await;
        }
        admission
    }

    /// 更新生命体征，返回队列项是否存在
    pub async fn update_vitals(&self, id: QueueItemId, vitals: &Vitals) -> bool {
        self.queue.update_vitals(id, vitals).await
    }

    /// 消除告警并恢复告警前的生命体征，返回是否确有告警被清除
    pub async fn silence_alarm(&self, id: QueueItemId) -> bool {
        self.notifier.silence(id, None).await
    }

    pub async fn overview(&self) -> DeskOverview {
        let items = self.queue.snapshot().await;
        let mut waiting_by_priority = HashMap::new();
        for item in &items {
            *waiting_by_priority.entry(item.priority()).or_insert(0) += 1;
        }

        DeskOverview {
            queue_length: items.len(),
            waiting_by_priority,
            alarming: items.iter().filter(|item| item.is_alarming).count(),
            available_beds: self.beds.available_count().await,
            siren_active: self.notifier.is_active().await,
        }
    }

    pub fn config(&self) -> &DeskConfig {
        &self.config
    }

    pub fn queue(&self) -> &QueueStore {
        &self.queue
    }

    pub fn beds(&self) -> &BedPool {
        &self.beds
    }

    pub fn simulator(&self) -> &VitalsSimulator {
        &self.simulator
    }

    pub fn notifier(&self) -> &AlarmNotifier {
        &self.notifier
    }
}
