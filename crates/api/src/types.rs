//! # DTO (Data Transfer Object) 层
//!
//! 将内部领域模型转化为面向前端 JSON 输出的轻量结构体。
//! 所有 DTO 必须派生 `utoipa::ToSchema` 以自动进入 Swagger 文档。

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use souba_core::market::entity::{Candle, CandleEvent, MarketView, PartialCandle};

// ============================================================
//  行情 DTO
// ============================================================

/// 已收盘 K 线 DTO
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CandleDto {
    /// 槽位起始时间 (UTC 毫秒)
    #[schema(example = 1700000040000_i64)]
    pub start_time: i64,
    /// 开盘价
    #[schema(example = 50000.0)]
    pub open: f64,
    /// 最高价
    #[schema(example = 50120.5)]
    pub high: f64,
    /// 最低价
    #[schema(example = 49880.25)]
    pub low: f64,
    /// 收盘价
    #[schema(example = 50075.0)]
    pub close: f64,
    /// 成交量
    #[schema(example = 123_i64)]
    pub volume: i64,
}

/// 形成中的部分 K 线 DTO，永不落库
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PartialCandleDto {
    /// 槽位起始时间 (UTC 毫秒)
    #[schema(example = 1700000100000_i64)]
    pub start_time: i64,
    /// 开盘价 (锚定上一收盘)
    #[schema(example = 50075.0)]
    pub open: f64,
    /// 最高价
    #[schema(example = 50090.0)]
    pub high: f64,
    /// 最低价
    #[schema(example = 50060.0)]
    pub low: f64,
    /// 向目标收敛中的收盘价
    #[schema(example = 50082.5)]
    pub close: f64,
    /// 成交量
    #[schema(example = 110_i64)]
    pub volume: i64,
    /// 槽位已流逝比例 [0, 1]
    #[schema(example = 0.5)]
    pub elapsed_fraction: f64,
}

/// 区间查询响应：持久化历史 + 可选部分 K 线 + 服务器时钟
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MarketViewResponse {
    /// 已收盘 K 线，按起始时间升序
    pub candles: Vec<CandleDto>,
    /// 形成中的部分 K 线 (请求方未要求或当前槽位不在区间内时为 null)
    pub partial: Option<PartialCandleDto>,
    /// 服务器时钟 (UTC 毫秒)，客户端据此对齐倒计时
    #[schema(example = 1700000130000_i64)]
    pub server_time: i64,
}

// ============================================================
//  管理通道 DTO
// ============================================================

/// 手动提交请求体
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CommitRequest {
    /// 标的代码
    #[schema(example = "BTCUSD")]
    pub symbol: String,
    /// K 线周期 (分钟)
    #[schema(example = 1_u32)]
    pub timeframe_minutes: u32,
    /// 数据流版本
    #[schema(example = "v1")]
    pub version: String,
    /// 待提交的最终 K 线
    pub candle: CandleDto,
}

/// 手动提交响应体
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CommitResponse {
    /// true 表示首次插入；false 表示该键已存在，幂等空操作
    #[schema(example = true)]
    pub inserted: bool,
}

// ============================================================
//  系统 DTO
// ============================================================

/// 健康检查响应体
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// 固定为 "ok"
    #[schema(example = "ok")]
    pub status: String,
    /// 服务器时钟 (UTC 毫秒)
    #[schema(example = 1700000130000_i64)]
    pub server_time: i64,
}

/// WebSocket 推送的收盘事件帧
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StreamEvent {
    /// 事件类型，固定为 "candle_completed"
    #[schema(example = "candle_completed")]
    pub event: String,
    /// 标的代码
    #[schema(example = "BTCUSD")]
    pub symbol: String,
    /// K 线周期 (分钟)
    #[schema(example = 1_u32)]
    pub timeframe_minutes: u32,
    /// 数据流版本
    #[schema(example = "v1")]
    pub version: String,
    /// 刚收盘的最终 K 线
    pub candle: CandleDto,
}

// ============================================================
//  通用响应 DTO
// ============================================================

/// 统一 API 响应包装器
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T: Serialize + ToSchema> {
    /// 是否成功
    pub success: bool,
    /// 数据载荷 (成功时)
    pub data: Option<T>,
    /// 错误信息 (失败时)
    pub error: Option<String>,
}

impl<T: Serialize + ToSchema> ApiResponse<T> {
    /// 构建成功响应
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

/// 构建失败响应 (不含泛型载荷)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiErrorResponse {
    /// 固定为 false
    pub success: bool,
    /// 错误描述信息
    pub error: String,
}

impl ApiErrorResponse {
    /// 从错误信息构建
    pub fn from_msg(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            error: msg.into(),
        }
    }
}

// ============================================================
//  领域模型 → DTO 惯用转换 (impl From<T>)
// ============================================================

impl From<Candle> for CandleDto {
    fn from(c: Candle) -> Self {
        Self {
            start_time: c.start_time,
            open: c.open,
            high: c.high,
            low: c.low,
            close: c.close,
            volume: c.volume,
        }
    }
}

impl From<CandleDto> for Candle {
    fn from(c: CandleDto) -> Self {
        Self {
            start_time: c.start_time,
            open: c.open,
            high: c.high,
            low: c.low,
            close: c.close,
            volume: c.volume,
        }
    }
}

impl From<PartialCandle> for PartialCandleDto {
    fn from(p: PartialCandle) -> Self {
        Self {
            start_time: p.start_time,
            open: p.open,
            high: p.high,
            low: p.low,
            close: p.close,
            volume: p.volume,
            elapsed_fraction: p.elapsed_fraction,
        }
    }
}

impl From<MarketView> for MarketViewResponse {
    fn from(v: MarketView) -> Self {
        Self {
            candles: v.candles.into_iter().map(Into::into).collect(),
            partial: v.partial.map(Into::into),
            server_time: v.server_time,
        }
    }
}

impl From<CandleEvent> for StreamEvent {
    fn from(e: CandleEvent) -> Self {
        Self {
            event: "candle_completed".to_string(),
            symbol: e.series.symbol,
            timeframe_minutes: e.series.timeframe_minutes,
            version: e.series.version,
            candle: e.candle.into(),
        }
    }
}
