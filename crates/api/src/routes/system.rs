//! # 系统路由控制器

use axum::Json;
use axum::extract::State;
use chrono::Utc;

use crate::server::AppState;
use crate::types::{ApiResponse, HealthResponse};

/// 健康检查
///
/// 返回服务状态与服务器时钟。
#[utoipa::path(
    get,
    path = "/api/v1/health",
    tag = "系统 (System)",
    responses(
        (status = 200, description = "服务正常", body = ApiResponse<HealthResponse>)
    )
)]
pub async fn health(State(_state): State<AppState>) -> Json<ApiResponse<HealthResponse>> {
    Json(ApiResponse::ok(HealthResponse {
        status: "ok".to_string(),
        server_time: Utc::now().timestamp_millis(),
    }))
}
