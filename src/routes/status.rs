use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::utils::{ApiResponse, success_to_api_response};

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
}

/// 探活接口，无需认证
pub async fn status() -> Json<ApiResponse<StatusResponse>> {
    success_to_api_response(StatusResponse {
        status: "online".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
    })
}
