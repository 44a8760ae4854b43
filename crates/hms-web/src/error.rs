//! HTTP错误响应

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use hms_core::HmsError;
use serde_json::json;

/// 接口错误，包装统一错误类型并映射为HTTP状态码
#[derive(Debug)]
pub struct ApiError(pub HmsError);

pub type ApiResult<T> = std::result::Result<T, ApiError>;

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            HmsError::NotFound(_) => StatusCode::NOT_FOUND,
            HmsError::Validation(_) => StatusCode::BAD_REQUEST,
            HmsError::InvalidStateTransition { .. } => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<HmsError> for ApiError {
    fn from(err: HmsError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self.0);
        } else {
            tracing::debug!("Request rejected ({}): {}", status, self.0);
        }

        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError(HmsError::NotFound("bed-999".into())).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError(HmsError::Validation("empty complaint".into())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError(HmsError::InvalidStateTransition {
                from: "Available".into(),
                event: "mark_available".into(),
            })
            .status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError(HmsError::Internal("boom".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
