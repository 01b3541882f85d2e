use async_trait::async_trait;
use souba_core::common::SeriesIdentity;
use souba_core::market::entity::Candle;
use souba_core::store::error::StoreError;
use souba_core::store::port::{CandleStore, CommitOutcome};
use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use tracing::debug;

/// CandleStore 的 SQLite 实现。
///
/// # Summary
/// 所有序列共用一个 `candles.db`，以
/// (symbol, timeframe_minutes, version, start_time) 主键实现
/// 键控幂等写入。
///
/// # Invariants
/// - 提交使用 `INSERT OR IGNORE`，绝不 read-then-write；并发提交
///   同一键时恰有一个写入者观察到 `inserted=true`，谁赢都不影响
///   数据完整性（所有写入者对同一键计算出相同数值）。
/// - 已存在的行永不被修改。
pub struct SqliteCandleStore {
    pool: SqlitePool,
}

impl SqliteCandleStore {
    /// 创建新的 SqliteCandleStore 实例。
    ///
    /// # Logic
    /// 1. 确保配置的数据根目录存在。
    /// 2. 以 `create_if_missing` 打开（或创建）`candles.db` 连接池。
    /// 3. 建表并创建按键降序的查找索引。
    ///
    /// # Returns
    /// * `Result<Self, StoreError>` - 存储实例或初始化错误。
    pub async fn new() -> Result<Self, StoreError> {
        let base_path = crate::config::get_root_dir();
        if !base_path.exists() {
            std::fs::create_dir_all(&base_path)
                .map_err(|e| StoreError::InitError(e.to_string()))?;
        }

        let options = SqliteConnectOptions::new()
            .filename(base_path.join("candles.db"))
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .connect_with(options)
            .await
            .map_err(|e| StoreError::InitError(e.to_string()))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS candles (
                symbol TEXT NOT NULL,
                timeframe_minutes INTEGER NOT NULL,
                version TEXT NOT NULL,
                start_time INTEGER NOT NULL,
                open REAL NOT NULL,
                high REAL NOT NULL,
                low REAL NOT NULL,
                close REAL NOT NULL,
                volume INTEGER NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                PRIMARY KEY (symbol, timeframe_minutes, version, start_time)
            );
            "#,
        )
        .execute(&pool)
        .await
        .map_err(|e| StoreError::InitError(e.to_string()))?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_candles_lookup
            ON candles(symbol, timeframe_minutes, version, start_time DESC);
            "#,
        )
        .execute(&pool)
        .await
        .map_err(|e| StoreError::InitError(e.to_string()))?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl CandleStore for SqliteCandleStore {
    /// # Summary
    /// 幂等提交一根最终 K 线。
    ///
    /// # Logic
    /// 1. 执行 `INSERT OR IGNORE`，冲突交由主键约束吞掉。
    /// 2. 受影响行数为 1 表示首次插入，为 0 表示重复提交（空操作）。
    ///
    /// # Returns
    /// * `Result<CommitOutcome, StoreError>`
    async fn commit(
        &self,
        series: &SeriesIdentity,
        candle: &Candle,
    ) -> Result<CommitOutcome, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO candles
                (symbol, timeframe_minutes, version, start_time, open, high, low, close, volume)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&series.symbol)
        .bind(i64::from(series.timeframe_minutes))
        .bind(&series.version)
        .bind(candle.start_time)
        .bind(candle.open)
        .bind(candle.high)
        .bind(candle.low)
        .bind(candle.close)
        .bind(candle.volume)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        let inserted = result.rows_affected() == 1;
        if !inserted {
            debug!("duplicate commit ignored: {} @ {}", series, candle.start_time);
        }
        Ok(CommitOutcome { inserted })
    }

    /// # Summary
    /// 区间查询已持久化的 K 线。
    ///
    /// # Logic
    /// 按 `start_time ∈ [start, end)` 过滤，升序返回，`LIMIT` 封顶。
    async fn query(
        &self,
        series: &SeriesIdentity,
        start_ms: i64,
        end_ms: i64,
        limit: u32,
    ) -> Result<Vec<Candle>, StoreError> {
        let records = sqlx::query_as::<_, (i64, f64, f64, f64, f64, i64)>(
            r#"
            SELECT start_time, open, high, low, close, volume
            FROM candles
            WHERE symbol = ? AND timeframe_minutes = ? AND version = ?
              AND start_time >= ? AND start_time < ?
            ORDER BY start_time ASC
            LIMIT ?
            "#,
        )
        .bind(&series.symbol)
        .bind(i64::from(series.timeframe_minutes))
        .bind(&series.version)
        .bind(start_ms)
        .bind(end_ms)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(records
            .into_iter()
            .map(|r| Candle {
                start_time: r.0,
                open: r.1,
                high: r.2,
                low: r.3,
                close: r.4,
                volume: r.5,
            })
            .collect())
    }

    /// # Summary
    /// 查询该序列最近一根已持久化的 K 线。
    async fn latest(&self, series: &SeriesIdentity) -> Result<Option<Candle>, StoreError> {
        let record = sqlx::query_as::<_, (i64, f64, f64, f64, f64, i64)>(
            r#"
            SELECT start_time, open, high, low, close, volume
            FROM candles
            WHERE symbol = ? AND timeframe_minutes = ? AND version = ?
            ORDER BY start_time DESC
            LIMIT 1
            "#,
        )
        .bind(&series.symbol)
        .bind(i64::from(series.timeframe_minutes))
        .bind(&series.version)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(record.map(|r| Candle {
            start_time: r.0,
            open: r.1,
            high: r.2,
            low: r.3,
            close: r.4,
            volume: r.5,
        }))
    }
}
