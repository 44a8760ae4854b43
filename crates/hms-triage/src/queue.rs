//! 急诊候诊队列
//!
//! 按分诊优先级排序的候诊患者集合。每次插入后整体稳定排序，同优先级保持插入顺序。
//! 对未知ID的操作均为空操作：队列成员是瞬态的，删除与更新之间的竞争是预期且无害的。

use hms_core::{QueueItem, QueueItemId, Vitals};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{watch, RwLock, RwLockWriteGuard};

use crate::priority::{compare_items, is_priority_ordered};

/// 队列状态（同步部分）
#[derive(Debug, Default)]
pub struct ErQueue {
    items: Vec<QueueItem>,
    /// 告警触发时记录的基线生命体征，按队列项ID保存
    baselines: HashMap<QueueItemId, Vitals>,
}

impl ErQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// 由外部批量数据构建，按优先级稳定排序
    pub fn from_items(items: Vec<QueueItem>) -> Self {
        let mut queue = Self {
            items,
            baselines: HashMap::new(),
        };
        queue.items.sort_by(compare_items);
        queue
    }

    /// 插入后整体稳定排序
    pub fn enqueue(&mut self, item: QueueItem) {
        self.items.push(item);
        self.items.sort_by(compare_items);
        self.check_invariants();
    }

    /// 删除队列项，同时丢弃其基线记录
    pub fn remove(&mut self, id: QueueItemId) -> Option<QueueItem> {
        let position = self.items.iter().position(|item| item.id == id)?;
        self.baselines.remove(&id);
        let removed = self.items.remove(position);
        self.check_invariants();
        Some(removed)
    }

    /// 浅合并生命体征
    pub fn update_vitals(&mut self, id: QueueItemId, update: &Vitals) -> bool {
        match self.items.iter_mut().find(|item| item.id == id) {
            Some(item) => {
                item.vitals.merge(update);
                true
            }
            None => false,
        }
    }

    /// 设置或清除告警
    ///
    /// 触发告警时记录当前生命体征作为基线，并合并 `vitals_override`（告警读数）。
    /// 清除告警时恢复为 `vitals_override`，未提供则恢复触发时记录的基线；两者皆无时保持不变。
    /// 状态未变化（已告警再触发、未告警再清除）时不做任何修改，返回 `false`。
    pub fn set_alarm(
        &mut self,
        id: QueueItemId,
        alarming: bool,
        vitals_override: Option<Vitals>,
    ) -> bool {
        let Some(item) = self.items.iter_mut().find(|item| item.id == id) else {
            return false;
        };

        if item.is_alarming == alarming {
            return false;
        }

        if alarming {
            self.baselines.insert(id, item.vitals.clone());
            if let Some(degraded) = vitals_override {
                item.vitals.merge(&degraded);
            }
        } else {
            let captured = self.baselines.remove(&id);
            if let Some(baseline) = vitals_override.or(captured) {
                item.vitals = baseline;
            }
        }

        item.is_alarming = alarming;
        true
    }

    /// 按队列顺序返回所有告警中的队列项
    pub fn list_alarming(&self) -> Vec<QueueItem> {
        self.items.iter().filter(|item| item.is_alarming).cloned().collect()
    }

    pub fn get(&self, id: QueueItemId) -> Option<&QueueItem> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn contains(&self, id: QueueItemId) -> bool {
        self.get(id).is_some()
    }

    /// 排队位置（从1开始）
    pub fn position(&self, id: QueueItemId) -> Option<usize> {
        self.items.iter().position(|item| item.id == id).map(|index| index + 1)
    }

    pub fn baseline(&self, id: QueueItemId) -> Option<&Vitals> {
        self.baselines.get(&id)
    }

    pub fn items(&self) -> &[QueueItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn check_invariants(&self) {
        debug_assert!(
            is_priority_ordered(&self.items),
            "ER queue lost priority order"
        );
    }
}

/// 候诊队列共享句柄
///
/// 每次实际发生变化后递增修订号，告警通知器据此重新评估。
#[derive(Debug, Clone)]
pub struct QueueStore {
    inner: Arc<RwLock<ErQueue>>,
    revisions: Arc<watch::Sender<u64>>,
}

impl QueueStore {
    pub fn new() -> Self {
        Self::from_items(Vec::new())
    }

    pub fn from_items(items: Vec<QueueItem>) -> Self {
        let (revisions, _) = watch::channel(0);
        Self {
            inner: Arc::new(RwLock::new(ErQueue::from_items(items))),
            revisions: Arc::new(revisions),
        }
    }

    /// 订阅队列变化
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revisions.subscribe()
    }

    /// 当前修订号
    pub fn revision(&self) -> u64 {
        *self.revisions.borrow()
    }

    pub async fn enqueue(&self, item: QueueItem) {
        let id = item.id;
        let priority = item.priority();
        let position = {
            let mut queue = self.inner.write().await;
            queue.enqueue(item);
            queue.position(id)
        };
        self.notify_changed();
        tracing::info!(
            "Queued ER patient {} with priority {:?} at position {:?}",
            id,
            priority,
            position
        );
    }

    pub async fn remove(&self, id: QueueItemId) -> Option<QueueItem> {
        let removed = self.inner.write().await.remove(id);
        if removed.is_some() {
            self.notify_changed();
            tracing::info!("Removed ER patient {} from queue", id);
        } else {
            tracing::debug!("Queue item {} not present, nothing removed", id);
        }
        removed
    }

    pub async fn update_vitals(&self, id: QueueItemId, update: &Vitals) -> bool {
        let updated = self.inner.write().await.update_vitals(id, update);
        if updated {
            self.notify_changed();
            tracing::debug!("Updated vitals for ER patient {}", id);
        }
        updated
    }

    pub async fn set_alarm(
        &self,
        id: QueueItemId,
        alarming: bool,
        vitals_override: Option<Vitals>,
    ) -> bool {
        let changed = self.inner.write().await.set_alarm(id, alarming, vitals_override);
        if changed {
            self.notify_changed();
        }
        changed
    }

    pub async fn list_alarming(&self) -> Vec<QueueItem> {
        self.inner.read().await.list_alarming()
    }

    pub async fn snapshot(&self) -> Vec<QueueItem> {
        self.inner.read().await.items().to_vec()
    }

    pub async fn get(&self, id: QueueItemId) -> Option<QueueItem> {
        self.inner.read().await.get(id).cloned()
    }

    pub async fn position(&self, id: QueueItemId) -> Option<usize> {
        self.inner.read().await.position(id)
    }

    pub async fn baseline(&self, id: QueueItemId) -> Option<Vitals> {
        self.inner.read().await.baseline(id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }

    /// 获取写锁；持有者负责在修改后调用 [`QueueStore::notify_changed`]
    pub(crate) async fn write(&self) -> RwLockWriteGuard<'_, ErQueue> {
        self.inner.write().await
    }

    pub(crate) fn notify_changed(&self) {
        self.revisions.send_modify(|revision| *revision += 1);
    }
}

impl Default for QueueStore {
    fn default() -> Self {
        Self::new()
    }
}
