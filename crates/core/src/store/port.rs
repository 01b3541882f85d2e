use super::error::StoreError;
use crate::common::SeriesIdentity;
use crate::market::entity::Candle;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// # Summary
/// 幂等提交的结果。
///
/// # Invariants
/// - 对同一 (序列, start_time) 键的并发提交，恰有一个调用者观察到
///   `inserted=true`，其余为 `false`；两者都是成功。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitOutcome {
    // 本次调用是否真正写入了新行
    pub inserted: bool,
}

/// # Summary
/// K 线持久化存储接口：幂等键控写入、区间查询、最新查询。
///
/// # Invariants
/// - 幂等性必须由存储层 (symbol, timeframe, version, start_time)
///   唯一约束保证，绝不允许应用层 read-then-write。
/// - 已提交的行不可变：重复写入是空操作。
/// - 这是整个系统唯一的同步原语，多进程水平扩展时无需分布式锁。
#[async_trait]
pub trait CandleStore: Send + Sync {
    /// # Summary
    /// 提交一根已收盘的最终 K 线。
    ///
    /// # Logic
    /// 1. 以唯一约束执行受限插入（冲突即忽略）。
    /// 2. 根据受影响行数判定 `inserted`。
    ///
    /// # Arguments
    /// * `series`: 序列身份。
    /// * `candle`: 最终 K 线。
    ///
    /// # Returns
    /// 成功返回 `CommitOutcome`，存储不可用返回 `StoreError`。
    async fn commit(
        &self,
        series: &SeriesIdentity,
        candle: &Candle,
    ) -> Result<CommitOutcome, StoreError>;

    /// # Summary
    /// 区间查询已持久化的 K 线。
    ///
    /// # Logic
    /// 按 `start_time ∈ [start, end)` 过滤，升序返回，行数受
    /// `limit` 约束以封顶无界区间请求。
    ///
    /// # Arguments
    /// * `series`: 序列身份。
    /// * `start_ms` / `end_ms`: 区间 (UTC 毫秒，左闭右开)。
    /// * `limit`: 返回行数上限。
    ///
    /// # Returns
    /// 升序 K 线列表。
    async fn query(
        &self,
        series: &SeriesIdentity,
        start_ms: i64,
        end_ms: i64,
        limit: u32,
    ) -> Result<Vec<Candle>, StoreError>;

    /// # Summary
    /// 查询该序列最近一根已持久化的 K 线。
    ///
    /// # Returns
    /// 有则返回 `Some(Candle)`，否则返回 `None`。
    async fn latest(&self, series: &SeriesIdentity) -> Result<Option<Candle>, StoreError>;
}
