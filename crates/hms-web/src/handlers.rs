//! HTTP处理器

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use hms_core::{HmsError, QueueItemId, TriagePriority, TriageResult, Vitals};
use hms_triage::TriageDesk;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::ApiResult;

pub type AppState = Arc<TriageDesk>;

/// 分诊登记请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntakeRequest {
    pub bay_number: u32,
    pub complaint: String,
    #[serde(default)]
    pub vitals: Vitals,
    pub priority: TriagePriority,
    #[serde(default)]
    pub rationale: String,
}

/// 健康检查处理器
pub async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// 候诊队列，按服务顺序排列
pub async fn list_queue(State(desk): State<AppState>) -> impl IntoResponse {
    Json(desk.queue().snapshot().await)
}

/// 分诊登记
pub async fn intake(
    State(desk): State<AppState>,
    Json(request): Json<IntakeRequest>,
) -> ApiResult<impl IntoResponse> {
    if request.bay_number == 0 {
        return Err(HmsError::Validation("bay_number must be positive".to_string()).into());
    }
    if request.complaint.trim().is_empty() {
        return Err(HmsError::Validation("complaint must not be empty".to_string()).into());
    }

    let item = desk
        .intake(
            request.bay_number,
            request.complaint,
            request.vitals,
            TriageResult::new(request.priority, request.rationale),
        )
        .await;
    info!("Intake of ER patient {} in bay {}", item.id, item.bay_number);

    Ok((StatusCode::CREATED, Json(item)))
}

/// 入院：成功返回分配的床位，无空闲床位时返回409
pub async fn admit(State(desk): State<AppState>, Path(id): Path<QueueItemId>) -> impl IntoResponse {
    match desk.admit(id).await {
        Some(admission) => (
            StatusCode::OK,
            Json(json!({
                "admitted": true,
                "bed": admission.bed,
                "patient_identity": admission.patient_identity,
            })),
        ),
        None => {
            warn!("Admission of ER patient {} refused", id);
            (StatusCode::CONFLICT, Json(json!({ "admitted": false })))
        }
    }
}

/// 部分更新生命体征
pub async fn update_vitals(
    State(desk): State<AppState>,
    Path(id): Path<QueueItemId>,
    Json(vitals): Json<Vitals>,
) -> ApiResult<impl IntoResponse> {
    if !desk.update_vitals(id, &vitals).await {
        return Err(HmsError::NotFound(format!("queue item {}", id)).into());
    }

    let item = desk
        .queue()
        .get(id)
        .await
        .ok_or_else(|| HmsError::NotFound(format!("queue item {}", id)))?;
    Ok(Json(item))
}

/// 消除告警
pub async fn silence(State(desk): State<AppState>, Path(id): Path<QueueItemId>) -> impl IntoResponse {
    let silenced = desk.silence_alarm(id).await;
    Json(json!({ "silenced": silenced }))
}

/// 床位列表
pub async fn list_beds(State(desk): State<AppState>) -> impl IntoResponse {
    Json(desk.beds().snapshot().await)
}

/// 病区床位统计
pub async fn bed_census(State(desk): State<AppState>) -> impl IntoResponse {
    Json(desk.beds().ward_census().await)
}

/// 清洁完成，床位恢复可用
pub async fn mark_bed_available(
    State(desk): State<AppState>,
    Path(bed_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    if !desk.beds().mark_available(&bed_id).await? {
        return Err(HmsError::NotFound(format!("bed {}", bed_id)).into());
    }

    let bed = desk
        .beds()
        .get(&bed_id)
        .await
        .ok_or_else(|| HmsError::NotFound(format!("bed {}", bed_id)))?;
    Ok(Json(bed))
}

/// 分诊台概览
pub async fn overview(State(desk): State<AppState>) -> impl IntoResponse {
    Json(desk.overview().await)
}

/// 告警事件记录
pub async fn alarm_history(State(desk): State<AppState>) -> impl IntoResponse {
    Json(desk.notifier().history().await)
}
