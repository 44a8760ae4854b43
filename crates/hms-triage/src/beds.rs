//! 床位池
//!
//! 固定数量的床位及其状态。床位池是床位状态与占用者的唯一修改者，
//! 分配是单一临界区内的检查并设置，并发调用不会拿到同一张床。

use hms_core::{Bed, BedStatus, HmsError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{RwLock, RwLockWriteGuard};

/// 病区床位统计
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct WardCensus {
    pub ward: String,
    pub available: usize,
    pub occupied: usize,
    pub cleaning: usize,
}

/// 床位表（同步部分），按床位ID升序保存
#[derive(Debug, Default)]
pub struct BedBoard {
    beds: Vec<Bed>,
}

impl BedBoard {
    pub fn new(mut beds: Vec<Bed>) -> Self {
        beds.sort_by(|a, b| a.id.cmp(&b.id));
        let board = Self { beds };
        board.check_invariants();
        board
    }

    /// 按ID顺序找到第一张空闲床位并置为占用（尚未绑定患者）
    pub fn allocate(&mut self) -> Option<Bed> {
        let bed = self.beds.iter_mut().find(|bed| bed.is_available())?;
        bed.status = BedStatus::Occupied;
        bed.patient_id = None;
        Some(bed.clone())
    }

    /// 为已分配的床位绑定患者标识
    ///
    /// 未知床位返回 `Ok(false)`；床位未处于占用状态时拒绝绑定。
    pub fn bind(&mut self, bed_id: &str, patient_identity: &str) -> Result<bool> {
        let Some(bed) = self.find_mut(bed_id) else {
            return Ok(false);
        };

        if bed.status != BedStatus::Occupied {
            return Err(HmsError::InvalidStateTransition {
                from: format!("{:?}", bed.status),
                event: "bind".to_string(),
            });
        }

        bed.patient_id = Some(patient_identity.to_string());
        self.check_invariants();
        Ok(true)
    }

    /// 出院：占用 → 清洁中，并清除患者标识
    pub fn release(&mut self, bed_id: &str) -> Result<bool> {
        let Some(bed) = self.find_mut(bed_id) else {
            return Ok(false);
        };

        if bed.status != BedStatus::Occupied {
            return Err(HmsError::InvalidStateTransition {
                from: format!("{:?}", bed.status),
                event: "release".to_string(),
            });
        }

        bed.status = BedStatus::Cleaning;
        bed.patient_id = None;
        self.check_invariants();
        Ok(true)
    }

    /// 清洁完成：清洁中 → 空闲，这是床位重新进入分配的唯一途径
    pub fn mark_available(&mut self, bed_id: &str) -> Result<bool> {
        let Some(bed) = self.find_mut(bed_id) else {
            return Ok(false);
        };

        if bed.status != BedStatus::Cleaning {
            return Err(HmsError::InvalidStateTransition {
                from: format!("{:?}", bed.status),
                event: "mark_available".to_string(),
            });
        }

        bed.status = BedStatus::Available;
        self.check_invariants();
        Ok(true)
    }

    /// 撤销一次尚未完成的分配，床位回到空闲
    pub(crate) fn rollback(&mut self, bed_id: &str) {
        if let Some(bed) = self.find_mut(bed_id) {
            bed.status = BedStatus::Available;
            bed.patient_id = None;
        }
        self.check_invariants();
    }

    pub fn get(&self, bed_id: &str) -> Option<&Bed> {
        self.beds.iter().find(|bed| bed.id == bed_id)
    }

    pub fn find_by_patient(&self, patient_identity: &str) -> Option<&Bed> {
        self.beds
            .iter()
            .find(|bed| bed.patient_id.as_deref() == Some(patient_identity))
    }

    pub fn beds(&self) -> &[Bed] {
        &self.beds
    }

    pub fn available_count(&self) -> usize {
        self.beds.iter().filter(|bed| bed.is_available()).count()
    }

    /// 按病区统计床位状态
    pub fn census(&self) -> Vec<WardCensus> {
        let mut wards: BTreeMap<&str, WardCensus> = BTreeMap::new();
        for bed in &self.beds {
            let entry = wards.entry(bed.ward.as_str()).or_insert_with(|| WardCensus {
                ward: bed.ward.clone(),
                ..Default::default()
            });
            match bed.status {
                BedStatus::Available => entry.available += 1,
                BedStatus::Occupied => entry.occupied += 1,
                BedStatus::Cleaning => entry.cleaning += 1,
            }
        }
        wards.into_values().collect()
    }

    fn find_mut(&mut self, bed_id: &str) -> Option<&mut Bed> {
        self.beds.iter_mut().find(|bed| bed.id == bed_id)
    }

    fn check_invariants(&self) {
        debug_assert!(
            self.beds.iter().all(Bed::is_consistent),
            "bed carries a patient while not occupied"
        );
    }
}

/// 床位池共享句柄
#[derive(Debug, Clone, Default)]
pub struct BedPool {
    inner: Arc<RwLock<BedBoard>>,
}

impl BedPool {
    pub fn new(beds: Vec<Bed>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(BedBoard::new(beds))),
        }
    }

    /// 分配空闲床位；床位耗尽是正常结果而不是错误
    pub async fn allocate(&self) -> Option<Bed> {
        let bed = self.inner.write().await.allocate();
        match &bed {
            Some(bed) => tracing::info!("Reserved bed {} in {}", bed.id, bed.ward),
            None => tracing::warn!("No available bed to allocate"),
        }
        bed
    }

    pub async fn bind(&self, bed_id: &str, patient_identity: &str) -> Result<bool> {
        let bound = self.inner.write().await.bind(bed_id, patient_identity)?;
        if bound {
            tracing::info!("Bed {} assigned to {}", bed_id, patient_identity);
        }
        Ok(bound)
    }

    pub async fn release(&self, bed_id: &str) -> Result<bool> {
        let released = self.inner.write().await.release(bed_id)?;
        if released {
            tracing::info!("Bed {} released for cleaning", bed_id);
        }
        Ok(released)
    }

    pub async fn mark_available(&self, bed_id: &str) -> Result<bool> {
        let marked = self.inner.write().await.mark_available(bed_id)?;
        if marked {
            tracing::info!("Bed {} cleaned and available", bed_id);
        }
        Ok(marked)
    }

    pub async fn get(&self, bed_id: &str) -> Option<Bed> {
        self.inner.read().await.get(bed_id).cloned()
    }

    pub async fn find_by_patient(&self, patient_identity: &str) -> Option<Bed> {
        self.inner.read().await.find_by_patient(patient_identity).cloned()
    }

    pub async fn snapshot(&self) -> Vec<Bed> {
        self.inner.read().await.beds().to_vec()
    }

    pub async fn available_count(&self) -> usize {
        self.inner.read().await.available_count()
    }

    pub async fn ward_census(&self) -> Vec<WardCensus> {
        self.inner.read().await.census()
    }

    pub(crate) async fn write(&self) -> RwLockWriteGuard<'_, BedBoard> {
        self.inner.write().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hms_core::fixtures::reference_beds;

    #[test]
    fn test_allocate_scans_in_id_order() {
        let mut board = BedBoard::new(vec![
            Bed::available("bed-303", "General", 303),
            Bed::occupied("bed-101", "Cardiology", 101, "pat-001"),
            Bed::available("bed-102", "Cardiology", 102),
        ]);

        let first = board.allocate().unwrap();
        assert_eq!(first.id, "bed-102");
        assert_eq!(first.status, BedStatus::Occupied);
        assert!(first.patient_id.is_none());

        let second = board.allocate().unwrap();
        assert_eq!(second.id, "bed-303");

        assert!(board.allocate().is_none());
    }

    #[test]
    fn test_cleaning_beds_are_not_allocated() {
        let mut board = BedBoard::new(vec![Bed::cleaning("bed-1", "General", 1)]);
        assert!(board.allocate().is_none());

        assert!(board.mark_available("bed-1").unwrap());
        assert_eq!(board.allocate().unwrap().id, "bed-1");
    }

    #[test]
    fn test_bind_and_release() {
        let mut board = BedBoard::new(vec![Bed::available("bed-1", "General", 1)]);
        let bed = board.allocate().unwrap();

        assert!(board.bind(&bed.id, "ER-7").unwrap());
        assert_eq!(board.find_by_patient("ER-7").unwrap().id, "bed-1");

        assert!(board.release("bed-1").unwrap());
        let released = board.get("bed-1").unwrap();
        assert_eq!(released.status, BedStatus::Cleaning);
        assert!(released.patient_id.is_none());
    }

    #[test]
    fn test_invalid_transitions_are_refused() {
        let mut board = BedBoard::new(vec![
            Bed::available("bed-1", "General", 1),
            Bed::occupied("bed-2", "General", 2, "pat-1"),
        ]);

        assert!(matches!(
            board.bind("bed-1", "ER-1"),
            Err(HmsError::InvalidStateTransition { .. })
        ));
        assert!(board.release("bed-1").is_err());
        assert!(board.mark_available("bed-2").is_err());
    }

    #[test]
    fn test_unknown_bed_is_noop() {
        let mut board = BedBoard::new(vec![Bed::available("bed-1", "General", 1)]);
        assert!(!board.bind("bed-9", "ER-1").unwrap());
        assert!(!board.release("bed-9").unwrap());
        assert!(!board.mark_available("bed-9").unwrap());
    }

    #[test]
    fn test_census() {
        let board = BedBoard::new(reference_beds());
        let census = board.census();

        let general = census.iter().find(|ward| ward.ward == "General").unwrap();
        assert_eq!(general.available, 2);
        assert_eq!(general.occupied, 2);
        assert_eq!(general.cleaning, 0);

        let pediatrics = census.iter().find(|ward| ward.ward == "Pediatrics").unwrap();
        assert_eq!(pediatrics.cleaning, 1);
        assert_eq!(board.available_count(), 5);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_allocation_never_double_books() {
        let beds: Vec<Bed> = (0..8)
            .map(|n| Bed::available(format!("bed-{:02}", n), "General", n))
            .collect();
        let pool = BedPool::new(beds);

        let handles: Vec<_> = (0..20)
            .map(|_| {
                let pool = pool.clone();
                tokio::spawn(async move { pool.allocate().await })
            })
            .collect();

        let mut allocated = Vec::new();
        for handle in handles {
            if let Some(bed) = handle.await.unwrap() {
                allocated.push(bed.id);
            }
        }

        let successes = allocated.len();
        allocated.sort();
        allocated.dedup();
        assert_eq!(successes, 8);
        assert_eq!(allocated.len(), 8);
        assert_eq!(pool.available_count().await, 0);
    }
}
