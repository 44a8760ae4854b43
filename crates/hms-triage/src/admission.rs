//! 入院协调器
//!
//! 同时持有候诊队列与床位池的写锁完成入院：要么床位被占用且队列项被移除，要么两者都不变。
//! 加锁顺序固定为先队列后床位。

use hms_core::utils::er_patient_identity;
use hms_core::{Bed, QueueItem, QueueItemId};
use serde::{Deserialize, Serialize};

use crate::beds::BedPool;
use crate::queue::QueueStore;

/// 一次成功的入院
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Admission {
    pub queue_item: QueueItem,
    pub bed: Bed,
    pub patient_identity: String,
}

/// 入院协调器
#[derive(Debug, Clone)]
pub struct AdmissionCoordinator {
    queue: QueueStore,
    beds: BedPool,
}

impl AdmissionCoordinator {
    pub fn new(queue: QueueStore, beds: BedPool) -> Self {
        Self { queue, beds }
    }

    /// 入院，返回是否成功
    pub async fn admit(&self, queue_item_id: QueueItemId) -> bool {
        self.try_admit(queue_item_id).await.is_some()
    }

    /// 入院并返回分配结果
    ///
    /// 队列项不存在或没有空闲床位时返回 `None`，队列与床位均保持原样。
    pub async fn try_admit(&self, queue_item_id: QueueItemId) -> Option<Admission> {
        let mut queue = self.queue.write().await;
        if !queue.contains(queue_item_id) {
            tracing::debug!("Queue item {} not found, admission skipped", queue_item_id);
            return None;
        }

        let mut beds = self.beds.write().await;
        let Some(reserved) = beds.allocate() else {
            tracing::warn!("No bed available for ER patient {}", queue_item_id);
            return None;
        };

        let patient_identity = er_patient_identity(queue_item_id);
        match beds.bind(&reserved.id, &patient_identity) {
            Ok(true) => {}
            Ok(false) => {
                tracing::error!("Reserved bed {} vanished before binding", reserved.id);
                beds.rollback(&reserved.id);
                return None;
            }
            Err(e) => {
                tracing::error!("Failed to bind bed {}: {}", reserved.id, e);
                beds.rollback(&reserved.id);
                return None;
            }
        }

        let Some(queue_item) = queue.remove(queue_item_id) else {
            beds.rollback(&reserved.id);
            return None;
        };

        let bed = beds.get(&reserved.id).cloned().unwrap_or(reserved);
        drop(beds);
        drop(queue);
        self.queue.notify_changed();

        tracing::info!(
            "Admitted ER patient {} (bay {}) to bed {} in {}",
            queue_item_id,
            queue_item.bay_number,
            bed.id,
            bed.ward
        );

        Some(Admission {
            queue_item,
            bed,
            patient_identity,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hms_core::{BedStatus, TriagePriority, TriageResult, Vitals};

    fn item(id: QueueItemId, priority: TriagePriority) -> QueueItem {
        QueueItem::new(
            id,
            id as u32,
            "chest pain",
            Vitals::default(),
            TriageResult::new(priority, "test"),
        )
    }

    fn queue_ids(items: &[QueueItem]) -> Vec<QueueItemId> {
        items.iter().map(|item| item.id).collect()
    }

    #[tokio::test]
    async fn test_admission_end_to_end() {
        let queue = QueueStore::from_items(vec![
            item(1, TriagePriority::Critical),
            item(2, TriagePriority::NonUrgent),
        ]);
        queue.enqueue(item(3, TriagePriority::Urgent)).await;
        assert_eq!(queue_ids(&queue.snapshot().await), vec![1, 3, 2]);

        let beds = BedPool::new(vec![
            Bed::available("bed-1", "General", 1),
            Bed::occupied("bed-2", "General", 2, "pat-9"),
        ]);
        let coordinator = AdmissionCoordinator::new(queue.clone(), beds.clone());

        assert!(coordinator.admit(1).await);
        assert_eq!(queue_ids(&queue.snapshot().await), vec![3, 2]);

        let admitted = beds.get("bed-1").await.unwrap();
        assert_eq!(admitted.status, BedStatus::Occupied);
        assert_eq!(admitted.patient_id.as_deref(), Some("ER-1"));

        let untouched = beds.get("bed-2").await.unwrap();
        assert_eq!(untouched.patient_id.as_deref(), Some("pat-9"));
    }

    #[tokio::test]
    async fn test_exhaustion_leaves_everything_unchanged() {
        let queue = QueueStore::from_items(vec![
            item(1, TriagePriority::Critical),
            item(2, TriagePriority::Urgent),
        ]);
        let beds = BedPool::new(vec![
            Bed::occupied("bed-1", "General", 1, "pat-1"),
            Bed::occupied("bed-2", "General", 2, "pat-2"),
            Bed::cleaning("bed-3", "General", 3),
        ]);
        let coordinator = AdmissionCoordinator::new(queue.clone(), beds.clone());

        let queue_before = queue.snapshot().await;
        let beds_before = beds.snapshot().await;
        let revision_before = queue.revision();

        assert!(!coordinator.admit(1).await);

        assert_eq!(queue.snapshot().await, queue_before);
        assert_eq!(beds.snapshot().await, beds_before);
        assert_eq!(queue.revision(), revision_before);
    }

    #[tokio::test]
    async fn test_unknown_item_allocates_nothing() {
        let queue = QueueStore::from_items(vec![item(1, TriagePriority::Urgent)]);
        let beds = BedPool::new(vec![Bed::available("bed-1", "General", 1)]);
        let coordinator = AdmissionCoordinator::new(queue.clone(), beds.clone());

        assert!(coordinator.try_admit(77).await.is_none());
        assert_eq!(beds.available_count().await, 1);
        assert_eq!(queue.len().await, 1);
    }

    #[tokio::test]
    async fn test_admission_drops_alarm_baseline() {
        let queue = QueueStore::from_items(vec![item(1, TriagePriority::Critical)]);
        queue.set_alarm(1, true, None).await;
        let beds = BedPool::new(vec![Bed::available("bed-1", "General", 1)]);
        let coordinator = AdmissionCoordinator::new(queue.clone(), beds);

        let admission = coordinator.try_admit(1).await.unwrap();
        assert!(admission.queue_item.is_alarming);
        assert_eq!(admission.patient_identity, "ER-1");
        assert!(queue.baseline(1).await.is_none());
        assert!(queue.list_alarming().await.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_admissions_one_more_than_beds() {
        const BEDS: u64 = 5;

        let items: Vec<QueueItem> = (1..=BEDS + 1)
            .map(|id| item(id, TriagePriority::Urgent))
            .collect();
        let queue = QueueStore::from_items(items);
        let beds = BedPool::new(
            (0..BEDS as u32)
                .map(|n| Bed::available(format!("bed-{}", n), "General", n))
                .collect(),
        );
        let coordinator = AdmissionCoordinator::new(queue.clone(), beds.clone());

        let handles: Vec<_> = (1..=BEDS + 1)
            .map(|id| {
                let coordinator = coordinator.clone();
                tokio::spawn(async move { coordinator.try_admit(id).await })
            })
            .collect();

        let mut admissions = Vec::new();
        for handle in handles {
            if let Some(admission) = handle.await.unwrap() {
                admissions.push(admission);
            }
        }

        assert_eq!(admissions.len() as u64, BEDS);
        assert_eq!(queue.len().await, 1);

        let mut bed_ids: Vec<_> = admissions.iter().map(|a| a.bed.id.clone()).collect();
        bed_ids.sort();
        bed_ids.dedup();
        assert_eq!(bed_ids.len() as u64, BEDS);

        let snapshot = beds.snapshot().await;
        assert!(snapshot.iter().all(|bed| bed.status == BedStatus::Occupied));
        assert!(snapshot.iter().all(|bed| bed.patient_id.is_some()));
    }
}
