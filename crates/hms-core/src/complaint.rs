//! 投诉分类接口
//!
//! 自由文本投诉由外部 AI 服务分类，这里只定义调用契约。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// 投诉类别
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ComplaintCategory {
    Billing,
    StaffBehavior,
    TreatmentQuality,
    WaitTime,
    Facilities,
    Other,
}

/// 投诉紧急程度
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ComplaintUrgency {
    Low,
    Medium,
    High,
    Critical,
}

/// 分类结果
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComplaintTriage {
    pub category: ComplaintCategory,
    pub urgency: ComplaintUrgency,
    pub summary: String,
}

/// 投诉分类服务
#[async_trait]
pub trait ComplaintClassifier: Send + Sync {
    async fn classify(&self, text: &str) -> Result<ComplaintTriage>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct KeywordClassifier;

    #[async_trait]
    impl ComplaintClassifier for KeywordClassifier {
        async fn classify(&self, text: &str) -> Result<ComplaintTriage> {
            let category = if text.contains("bill") {
                ComplaintCategory::Billing
            } else {
                ComplaintCategory::Other
            };
            Ok(ComplaintTriage {
                category,
                urgency: ComplaintUrgency::Low,
                summary: text.chars().take(20).collect(),
            })
        }
    }

    #[tokio::test]
    async fn test_classifier_contract() {
        let classifier: Box<dyn ComplaintClassifier> = Box::new(KeywordClassifier);
        let triage = classifier.classify("I was billed twice").await.unwrap();
        assert_eq!(triage.category, ComplaintCategory::Billing);
        assert_eq!(triage.urgency, ComplaintUrgency::Low);
    }
}
