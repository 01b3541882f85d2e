//! # 行情路由控制器
//!
//! 实现 `/api/v1/market` 路径下的 REST 接口：区间查询（含形成中的
//! 部分 K 线）与最新 K 线查询。

use axum::Json;
use axum::extract::{Path, Query, State};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::server::AppState;
use crate::types::{ApiResponse, CandleDto, MarketViewResponse};
use souba_core::common::SeriesIdentity;
use souba_core::market::port::MarketService;

fn default_timeframe() -> u32 {
    1
}

fn default_version() -> String {
    "v1".to_string()
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CandlesQuery {
    /// K 线周期 (分钟)
    #[serde(default = "default_timeframe")]
    pub tf: u32,
    /// 数据流版本
    #[serde(default = "default_version")]
    pub version: String,
    /// 区间起点 (UTC 毫秒，含)
    pub start: i64,
    /// 区间终点 (UTC 毫秒，不含)
    pub end: i64,
    /// 是否附带形成中的部分 K 线
    #[serde(default)]
    pub include_partial: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SeriesQuery {
    /// K 线周期 (分钟)
    #[serde(default = "default_timeframe")]
    pub tf: u32,
    /// 数据流版本
    #[serde(default = "default_version")]
    pub version: String,
}

/// 区间查询历史 K 线
///
/// 返回 `start_time ∈ [start, end)` 的已收盘 K 线（升序），可选附带
/// 当前槽位形成中的部分 K 线，以及用于倒计时对齐的服务器时钟。
/// 首次查询某个序列会自动开始监控该序列。
#[utoipa::path(
    get,
    path = "/api/v1/market/candles/{symbol}",
    tag = "行情 (Market)",
    params(
        ("symbol" = String, Path, description = "标的代码"),
        ("tf" = u32, Query, description = "K 线周期 (分钟)，默认 1"),
        ("version" = String, Query, description = "数据流版本，默认 v1"),
        ("start" = i64, Query, description = "区间起点 (UTC 毫秒，含)"),
        ("end" = i64, Query, description = "区间终点 (UTC 毫秒，不含)"),
        ("include_partial" = bool, Query, description = "是否附带部分 K 线，默认 false")
    ),
    responses(
        (status = 200, description = "成功获取区间视图", body = ApiResponse<MarketViewResponse>),
        (status = 400, description = "参数非法 (end <= start 或周期为 0)")
    )
)]
pub async fn get_candles(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
    Query(query): Query<CandlesQuery>,
) -> Result<Json<ApiResponse<MarketViewResponse>>, ApiError> {
    let series = SeriesIdentity::new(&symbol, query.tf, &query.version);
    let view = state
        .market
        .get_view(&series, query.start, query.end, query.include_partial)
        .await?;

    Ok(Json(ApiResponse::ok(view.into())))
}

/// 查询最近一根已收盘 K 线
///
/// 序列尚无任何持久化历史时返回 404。
#[utoipa::path(
    get,
    path = "/api/v1/market/latest/{symbol}",
    tag = "行情 (Market)",
    params(
        ("symbol" = String, Path, description = "标的代码"),
        ("tf" = u32, Query, description = "K 线周期 (分钟)，默认 1"),
        ("version" = String, Query, description = "数据流版本，默认 v1")
    ),
    responses(
        (status = 200, description = "成功", body = ApiResponse<CandleDto>),
        (status = 400, description = "参数非法"),
        (status = 404, description = "序列尚无持久化历史")
    )
)]
pub async fn get_latest(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
    Query(query): Query<SeriesQuery>,
) -> Result<Json<ApiResponse<CandleDto>>, ApiError> {
    let series = SeriesIdentity::new(&symbol, query.tf, &query.version);
    let latest = state
        .market
        .latest(&series)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("no candles persisted for {series}")))?;

    Ok(Json(ApiResponse::ok(latest.into())))
}
