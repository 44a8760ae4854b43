//! 演示用初始数据
//!
//! 三名急诊候诊患者以及医院床位目录。

use crate::models::{Bed, QueueItem, TriagePriority, TriageResult, Vitals};
use crate::utils::next_queue_item_id;

/// 初始急诊候诊队列（分诊区 1-3）
pub fn reference_er_queue() -> Vec<QueueItem> {
    vec![
        QueueItem::new(
            next_queue_item_id(),
            1,
            "Difficulty breathing and chest tightness.",
            Vitals {
                heart_rate: Some(115),
                blood_pressure: Some("150/90".to_string()),
                oxygen_saturation: Some(91),
                temperature: Some(37.1),
                respiratory_rate: None,
            },
            TriageResult::new(
                TriagePriority::Critical,
                "Symptoms are indicative of a potential cardiac or respiratory emergency. \
                 Low oxygen saturation and tachycardia require immediate attention.",
            ),
        ),
        QueueItem::new(
            next_queue_item_id(),
            2,
            "High fever (103°F) and persistent cough for two days.",
            Vitals {
                heart_rate: Some(105),
                blood_pressure: Some("130/85".to_string()),
                oxygen_saturation: Some(96),
                temperature: Some(39.4),
                respiratory_rate: Some(22),
            },
            TriageResult::new(
                TriagePriority::Urgent,
                "High fever and respiratory symptoms suggest a significant infection, \
                 such as pneumonia, requiring prompt evaluation.",
            ),
        ),
        QueueItem::new(
            next_queue_item_id(),
            3,
            "Twisted ankle during a run, mild swelling and pain.",
            Vitals {
                heart_rate: Some(80),
                blood_pressure: Some("120/80".to_string()),
                oxygen_saturation: Some(99),
                temperature: Some(37.0),
                respiratory_rate: None,
            },
            TriageResult::new(
                TriagePriority::NonUrgent,
                "Localized injury with stable vitals. \
                 Patient can be seen after more critical cases are addressed.",
            ),
        ),
    ]
}

/// 医院床位目录
pub fn reference_beds() -> Vec<Bed> {
    vec![
        Bed::occupied("bed-101", "Cardiology", 101, "pat-001"),
        Bed::available("bed-102", "Cardiology", 102),
        Bed::cleaning("bed-103", "Cardiology", 103),
        Bed::occupied("bed-201", "Neurology", 201, "pat-002"),
        Bed::available("bed-202", "Neurology", 202),
        Bed::occupied("bed-301", "General", 301, "pat-003"),
        Bed::available("bed-302", "General", 302),
        Bed::available("bed-303", "General", 303),
        Bed::occupied("bed-401", "Pediatrics", 401, "pat-004"),
        Bed::cleaning("bed-402", "Pediatrics", 402),
        Bed::available("bed-403", "Pediatrics", 403),
        Bed::occupied("bed-501", "General", 501, "pat-005"),
    ]
}
