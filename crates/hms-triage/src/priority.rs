//! 分诊优先级模型
//!
//! 队列排序唯一使用的比较规则：`Critical < Urgent < NonUrgent`。

use hms_core::{QueueItem, TriagePriority};
use std::cmp::Ordering;

/// 比较两个优先级，沿用 `TriagePriority` 的声明顺序
pub fn compare(a: TriagePriority, b: TriagePriority) -> Ordering {
    a.cmp(&b)
}

/// 队列项排序键比较
pub fn compare_items(a: &QueueItem, b: &QueueItem) -> Ordering {
    compare(a.priority(), b.priority())
}

/// 检查队列是否满足优先级非递减顺序
pub fn is_priority_ordered(items: &[QueueItem]) -> bool {
    items
        .windows(2)
        .all(|pair| compare_items(&pair[0], &pair[1]) != Ordering::Greater)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_order() {
        use TriagePriority::*;

        assert_eq!(compare(Critical, Urgent), Ordering::Less);
        assert_eq!(compare(Urgent, NonUrgent), Ordering::Less);
        assert_eq!(compare(Critical, NonUrgent), Ordering::Less);
        assert_eq!(compare(NonUrgent, Critical), Ordering::Greater);
        for p in TriagePriority::ALL {
            assert_eq!(compare(p, p), Ordering::Equal);
        }
    }

    #[test]
    fn test_items_compare_by_priority_only() {
        use hms_core::{TriageResult, Vitals};

        let item = |id: u64, priority: TriagePriority| {
            QueueItem::new(id, id as u32, "", Vitals::default(), TriageResult::new(priority, ""))
        };
        let urgent = item(1, TriagePriority::Urgent);
        let critical = item(2, TriagePriority::Critical);
        let other_urgent = item(3, TriagePriority::Urgent);

        assert_eq!(compare_items(&critical, &urgent), Ordering::Less);
        assert_eq!(compare_items(&urgent, &other_urgent), Ordering::Equal);
        assert!(is_priority_ordered(&[critical.clone(), urgent.clone(), other_urgent]));
        assert!(!is_priority_ordered(&[urgent, critical]));
    }
}
