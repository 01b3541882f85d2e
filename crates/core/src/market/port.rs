use crate::common::SeriesIdentity;
use crate::market::entity::{Candle, MarketView};
use crate::market::error::MarketError;
use crate::notify::port::CandleEventStream;
use crate::store::port::CommitOutcome;
use async_trait::async_trait;

/// # Summary
/// 市场查询服务契约，API 层依赖的唯一入口。
///
/// # Invariants
/// - 已收盘槽位永远以存储为权威来源，绝不通过生成器重算
///   （即使确定性保证两者数值一致，也要避免掩盖未来的算法漂移）。
/// - 每次响应都携带服务器时钟。
#[async_trait]
pub trait MarketService: Send + Sync {
    /// # Summary
    /// 获取指定序列在时间区间内的完整视图。
    ///
    /// # Logic
    /// 1. 校验参数（end > start、timeframe > 0），失败同步拒绝。
    /// 2. 确保该序列已被边界检测器监控（首次查询时自动挂载）。
    /// 3. 从存储读取 `start_time ∈ [start, end)` 的历史 K 线。
    /// 4. 若 `include_partial` 且当前槽位与区间相交，基于最新持久化
    ///    收盘价（或初始价）插值部分 K 线。
    ///
    /// # Arguments
    /// * `series`: 序列身份。
    /// * `start_ms` / `end_ms`: 查询区间 (UTC 毫秒，左闭右开)。
    /// * `include_partial`: 是否附带形成中的部分 K 线。
    ///
    /// # Returns
    /// 成功返回 `MarketView`，失败返回 `MarketError`。
    async fn get_view(
        &self,
        series: &SeriesIdentity,
        start_ms: i64,
        end_ms: i64,
        include_partial: bool,
    ) -> Result<MarketView, MarketError>;

    /// # Summary
    /// 查询该序列最近一根已持久化的 K 线。
    ///
    /// # Returns
    /// 有则返回 `Some(Candle)`，序列尚无历史返回 `None`。
    async fn latest(&self, series: &SeriesIdentity) -> Result<Option<Candle>, MarketError>;

    /// # Summary
    /// 手动提交一根最终 K 线（管理/测试通道）。
    ///
    /// # Logic
    /// 1. 同步校验 OHLC 不变量，非法 K 线绝不触达存储。
    /// 2. 走与自动提交完全相同的幂等写入路径。
    /// 3. 首次插入成功时向订阅者广播收盘事件。
    ///
    /// # Returns
    /// 返回 `CommitOutcome`；重复提交返回 `inserted=false`，视为成功。
    async fn commit(
        &self,
        series: &SeriesIdentity,
        candle: Candle,
    ) -> Result<CommitOutcome, MarketError>;

    /// # Summary
    /// 订阅全量收盘事件流。
    ///
    /// # Logic
    /// 挂载到内部广播器；尽力而为、至多一次，迟到订阅者收不到
    /// 历史事件，必须通过查询服务补齐。
    fn subscribe(&self) -> CandleEventStream;
}
