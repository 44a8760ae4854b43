//! 核心数据模型定义

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 分诊队列项标识
pub type QueueItemId = u64;

/// 床位标识 (例如 "bed-101")
pub type BedId = String;

/// 分诊优先级
///
/// 变体声明顺序即服务顺序：`Critical < Urgent < NonUrgent`，数值越小越先处理。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TriagePriority {
    Critical,  // 危急
    Urgent,    // 紧急
    NonUrgent, // 非紧急
}

impl TriagePriority {
    /// 所有优先级，按服务顺序排列
    pub const ALL: [TriagePriority; 3] = [
        TriagePriority::Critical,
        TriagePriority::Urgent,
        TriagePriority::NonUrgent,
    ];
}

/// 分诊结果
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TriageResult {
    pub priority: TriagePriority,
    pub rationale: String,
}

impl TriageResult {
    pub fn new(priority: TriagePriority, rationale: impl Into<String>) -> Self {
        Self {
            priority,
            rationale: rationale.into(),
        }
    }
}

/// 生命体征快照，各字段均可缺省
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Vitals {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heart_rate: Option<u32>,
    /// "收缩压/舒张压"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blood_pressure: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oxygen_saturation: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub respiratory_rate: Option<u32>,
}

impl Vitals {
    /// 浅合并：`update` 中给出的字段覆盖当前值，缺省字段保持不变
    pub fn merge(&mut self, update: &Vitals) {
        if let Some(heart_rate) = update.heart_rate {
            self.heart_rate = Some(heart_rate);
        }
        if let Some(blood_pressure) = &update.blood_pressure {
            self.blood_pressure = Some(blood_pressure.clone());
        }
        if let Some(oxygen_saturation) = update.oxygen_saturation {
            self.oxygen_saturation = Some(oxygen_saturation);
        }
        if let Some(temperature) = update.temperature {
            self.temperature = Some(temperature);
        }
        if let Some(respiratory_rate) = update.respiratory_rate {
            self.respiratory_rate = Some(respiratory_rate);
        }
    }

    /// 返回合并后的新快照
    pub fn merged(&self, update: &Vitals) -> Vitals {
        let mut merged = self.clone();
        merged.merge(update);
        merged
    }

    pub fn is_empty(&self) -> bool {
        self == &Vitals::default()
    }
}

/// 急诊候诊队列项
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueueItem {
    pub id: QueueItemId,
    pub bay_number: u32,           // 分诊区床位号
    pub complaint: String,         // 主诉
    pub vitals: Vitals,
    pub result: TriageResult,
    #[serde(default)]
    pub is_alarming: bool,
    pub arrived_at: DateTime<Utc>,
}

impl QueueItem {
    pub fn new(
        id: QueueItemId,
        bay_number: u32,
        complaint: impl Into<String>,
        vitals: Vitals,
        result: TriageResult,
    ) -> Self {
        Self {
            id,
            bay_number,
            complaint: complaint.into(),
            vitals,
            result,
            is_alarming: false,
            arrived_at: Utc::now(),
        }
    }

    pub fn priority(&self) -> TriagePriority {
        self.result.priority
    }
}

/// 床位状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum BedStatus {
    Available, // 空闲
    Occupied,  // 占用
    Cleaning,  // 清洁中
}

/// 床位
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Bed {
    pub id: BedId,
    pub ward: String,
    pub bed_number: u32,
    pub status: BedStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_id: Option<String>,
}

impl Bed {
    /// 创建空闲床位
    pub fn available(id: impl Into<BedId>, ward: impl Into<String>, bed_number: u32) -> Self {
        Self {
            id: id.into(),
            ward: ward.into(),
            bed_number,
            status: BedStatus::Available,
            patient_id: None,
        }
    }

    /// 创建已被占用的床位
    pub fn occupied(
        id: impl Into<BedId>,
        ward: impl Into<String>,
        bed_number: u32,
        patient_id: impl Into<String>,
    ) -> Self {
        Self {
            status: BedStatus::Occupied,
            patient_id: Some(patient_id.into()),
            ..Self::available(id, ward, bed_number)
        }
    }

    /// 创建清洁中的床位
    pub fn cleaning(id: impl Into<BedId>, ward: impl Into<String>, bed_number: u32) -> Self {
        Self {
            status: BedStatus::Cleaning,
            ..Self::available(id, ward, bed_number)
        }
    }

    pub fn is_available(&self) -> bool {
        self.status == BedStatus::Available
    }

    /// 只有占用中的床位可以携带患者标识
    pub fn is_consistent(&self) -> bool {
        self.patient_id.is_none() || self.status == BedStatus::Occupied
    }
}
