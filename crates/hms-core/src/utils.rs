//! 通用工具函数

use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::models::QueueItemId;

/// 急诊入院患者标识前缀
pub const ER_IDENTITY_PREFIX: &str = "ER";

static LAST_QUEUE_ITEM_ID: AtomicU64 = AtomicU64::new(0);

/// 生成分诊队列项ID
///
/// 以毫秒时间戳为基础，在进程内严格单调递增。
pub fn next_queue_item_id() -> QueueItemId {
    let now = Utc::now().timestamp_millis().max(0) as u64;
    let previous = LAST_QUEUE_ITEM_ID
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
            Some(now.max(last + 1))
        })
        .unwrap_or_else(|last| last);
    now.max(previous + 1)
}

/// 由队列项ID推导入院患者标识
pub fn er_patient_identity(queue_item_id: QueueItemId) -> String {
    format!("{}-{}", ER_IDENTITY_PREFIX, queue_item_id)
}

/// 构造语音告警文本
pub fn alert_message(bay_number: u32) -> String {
    format!(
        "Alert! Critical vitals in ER Bay {}. Attention needed in ER Bay {}.",
        bay_number, bay_number
    )
}
