//! # 管理通道路由控制器
//!
//! 手动提交最终 K 线，复用与自动提交完全相同的幂等写入路径。
//! 主要服务于数据修补与测试场景。

use axum::Json;
use axum::extract::State;

use crate::error::ApiError;
use crate::server::AppState;
use crate::types::{ApiResponse, CommitRequest, CommitResponse};
use souba_core::common::SeriesIdentity;
use souba_core::market::port::MarketService;

/// 手动提交一根最终 K 线
///
/// 提交前同步校验 OHLC 不变量与槽位对齐；重复提交同一键返回
/// `inserted=false`，视为成功（幂等空操作）。
#[utoipa::path(
    post,
    path = "/api/v1/admin/commit",
    tag = "管理 (Admin)",
    request_body = CommitRequest,
    responses(
        (status = 200, description = "提交完成", body = ApiResponse<CommitResponse>),
        (status = 400, description = "K 线非法 (OHLC 不变量或槽位对齐被破坏)")
    )
)]
pub async fn commit_candle(
    State(state): State<AppState>,
    Json(request): Json<CommitRequest>,
) -> Result<Json<ApiResponse<CommitResponse>>, ApiError> {
    let series = SeriesIdentity::new(&request.symbol, request.timeframe_minutes, &request.version);
    let outcome = state.market.commit(&series, request.candle.into()).await?;

    Ok(Json(ApiResponse::ok(CommitResponse {
        inserted: outcome.inserted,
    })))
}
