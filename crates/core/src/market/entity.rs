use crate::common::SeriesIdentity;
use crate::market::error::MarketError;
use serde::{Deserialize, Serialize};

/// # Summary
/// 单根已收盘 K 线数据实体，记录特定槽位内的行情波动。
/// 一旦提交入库即不可变，任何后续写入都是幂等空操作。
///
/// # Invariants
/// - `high >= max(open, close)`，`low <= min(open, close)`，`high >= low`。
/// - `start_time` 为槽位起始的 UTC 毫秒时间戳，与槽位索引一一对应。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    // 槽位起始时间 (UTC 毫秒)
    pub start_time: i64,
    // 开盘价
    pub open: f64,
    // 最高价
    pub high: f64,
    // 最低价
    pub low: f64,
    // 收盘价
    pub close: f64,
    // 成交量
    pub volume: i64,
}

impl Candle {
    /// # Summary
    /// 校验 OHLC 不变量。
    ///
    /// # Logic
    /// 1. 四个价格必须均为有限数。
    /// 2. `high` 不得低于开收盘的较大者，`low` 不得高于较小者。
    ///
    /// # Returns
    /// 违反不变量时返回 `MarketError::Validation`，校验通过返回 Ok。
    pub fn validate(&self) -> Result<(), MarketError> {
        let prices = [self.open, self.high, self.low, self.close];
        if prices.iter().any(|p| !p.is_finite()) {
            return Err(MarketError::Validation("candle price is not finite".into()));
        }
        if self.high < self.open.max(self.close) {
            return Err(MarketError::Validation(format!(
                "high {} below max(open, close) {}",
                self.high,
                self.open.max(self.close)
            )));
        }
        if self.low > self.open.min(self.close) {
            return Err(MarketError::Validation(format!(
                "low {} above min(open, close) {}",
                self.low,
                self.open.min(self.close)
            )));
        }
        if self.high < self.low {
            return Err(MarketError::Validation(format!(
                "high {} below low {}",
                self.high, self.low
            )));
        }
        Ok(())
    }
}

/// # Summary
/// 正在形成中的部分 K 线。纯请求期瞬态视图，随每次查询重算，
/// 永不落库。
///
/// # Invariants
/// - `elapsed_fraction` 已被钳制在 `[0, 1]`，时钟偏斜只会让视图略早
///   或略晚，绝不产生损坏数据。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartialCandle {
    // 槽位起始时间 (UTC 毫秒)
    pub start_time: i64,
    // 开盘价 (等于上一根收盘价)
    pub open: f64,
    // 当前最高价
    pub high: f64,
    // 当前最低价
    pub low: f64,
    // 插值后的当前收盘价
    pub close: f64,
    // 按进度折算的成交量
    pub volume: i64,
    // 槽位内已经过的时间占比 [0, 1]
    pub elapsed_fraction: f64,
}

/// # Summary
/// 查询服务的统一出参：已持久化历史 + 可选部分 K 线 + 服务器时钟。
///
/// # Invariants
/// - `candles` 按 `start_time` 升序排列，且全部来自存储层。
/// - `server_time` 必须随每次响应返回，供客户端计算本地时钟偏移。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketView {
    // 已收盘的历史 K 线（升序）
    pub candles: Vec<Candle>,
    // 当前槽位的部分 K 线（若请求且槽位落在区间内）
    pub partial: Option<PartialCandle>,
    // 服务器当前时间 (UTC 毫秒)
    pub server_time: i64,
}

/// # Summary
/// K 线收盘广播事件，提交成功 (`inserted=true`) 后推送给所有订阅者。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandleEvent {
    // 所属序列身份
    pub series: SeriesIdentity,
    // 刚收盘的最终 K 线
    pub candle: Candle,
}
