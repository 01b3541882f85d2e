use crate::monitor::SeriesMonitor;
use async_trait::async_trait;
use dashmap::DashMap;
use souba_core::common::time::TimeProvider;
use souba_core::common::SeriesIdentity;
use souba_core::config::MarketConfig;
use souba_core::market::entity::{Candle, CandleEvent, MarketView};
use souba_core::market::error::MarketError;
use souba_core::market::port::MarketService;
use souba_core::notify::port::{CandleEventStream, CandlePublisher};
use souba_core::store::port::{CandleStore, CommitOutcome};
use souba_gen::generator::CandleGenerator;
use souba_gen::interpolate::{elapsed_fraction, interpolate};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// # Summary
/// 市场域服务的具体实现：序列注册表 + 查询服务。
///
/// # Invariants
/// - 每个被监控序列在注册表中恰有一个检测器实例；检测器状态
///   私有于实例，绝不落在环境全局变量上。
/// - 已收盘槽位只读存储，绝不经生成器重算。
pub struct CandleMarket {
    store: Arc<dyn CandleStore>,
    publisher: Arc<dyn CandlePublisher>,
    time: Arc<dyn TimeProvider>,
    config: MarketConfig,
    // 活跃检测器注册表，Key 为序列键
    monitors: DashMap<String, Arc<SeriesMonitor>>,
}

impl CandleMarket {
    /// # Summary
    /// 初始化市场域服务。
    pub fn new(
        store: Arc<dyn CandleStore>,
        publisher: Arc<dyn CandlePublisher>,
        time: Arc<dyn TimeProvider>,
        config: MarketConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            store,
            publisher,
            time,
            config,
            monitors: DashMap::new(),
        })
    }

    /// # Summary
    /// 确保某序列已被边界检测器监控（幂等）。
    ///
    /// # Logic
    /// 1. 注册表命中则直接返回。
    /// 2. 未命中则按配置解析生成参数，创建检测器、立即执行一次
    ///    轮询（触发必要的历史回填），再启动后台循环。
    ///
    /// # Returns
    /// 该序列的检测器实例。
    pub async fn track(&self, series: &SeriesIdentity) -> Arc<SeriesMonitor> {
        if let Some(existing) = self.monitors.get(&series.key()) {
            return existing.clone();
        }

        let settings = self.config.settings_for(&series.symbol);
        let monitor = Arc::new(SeriesMonitor::new(
            series.clone(),
            settings,
            self.store.clone(),
            self.publisher.clone(),
            self.time.clone(),
            self.config.backfill_slots,
        ));

        let entry = self
            .monitors
            .entry(series.key())
            .or_insert_with(|| monitor.clone())
            .clone();

        // 只有真正放入注册表的实例才启动循环
        if Arc::ptr_eq(&entry, &monitor) {
            info!("tracking series {}", series);
            let _sealed = entry.poll_once().await;
            entry.spawn(Duration::from_millis(self.config.tick_interval_ms));
        }
        entry
    }

    /// 当前被监控的序列数量（仅供测试）。
    pub fn tracked_count(&self) -> usize {
        self.monitors.len()
    }

    /// # Summary
    /// 校验查询/提交参数。
    fn validate_series(series: &SeriesIdentity) -> Result<(), MarketError> {
        if series.timeframe_minutes == 0 {
            return Err(MarketError::Validation(
                "timeframe_minutes must be positive".into(),
            ));
        }
        if series.symbol.is_empty() {
            return Err(MarketError::Validation("symbol must not be empty".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl MarketService for CandleMarket {
    /// # Summary
    /// 获取序列视图：持久化历史 + 可选部分 K 线 + 服务器时钟。
    ///
    /// # Logic
    /// 1. 同步校验参数。
    /// 2. 自动挂载检测器（首次查询即开始监控该序列）。
    /// 3. 历史只从存储读取；存储不可用即请求失败，绝不用
    ///    生成器的重算结果顶替。
    /// 4. 当前槽位与区间相交时，用最新持久化收盘价（或初始价）
    ///    喂入插值器计算部分 K 线。
    async fn get_view(
        &self,
        series: &SeriesIdentity,
        start_ms: i64,
        end_ms: i64,
        include_partial: bool,
    ) -> Result<MarketView, MarketError> {
        Self::validate_series(series)?;
        if end_ms <= start_ms {
            return Err(MarketError::Validation(format!(
                "end {end_ms} must be greater than start {start_ms}"
            )));
        }

        let _monitor = self.track(series).await;

        let candles = self
            .store
            .query(series, start_ms, end_ms, self.config.query_limit_max)
            .await?;

        let now_ms = self.time.now_ms();
        let mut partial = None;
        if include_partial {
            let slot_duration = series.slot_duration_ms();
            let current_index = series.slot_index(now_ms);
            let slot_start = series.slot_start_ms(current_index);

            // 仅当形成中的槽位与 [start, end) 相交时附带部分 K 线
            if slot_start < end_ms && slot_start + slot_duration > start_ms {
                let settings = self.config.settings_for(&series.symbol);
                let prev_close = self
                    .store
                    .latest(series)
                    .await?
                    .map(|c| c.close)
                    .unwrap_or(settings.initial_price);

                let generator = CandleGenerator::new(settings);
                let target = generator.generate(series, current_index, prev_close);
                let fraction = elapsed_fraction(now_ms, slot_start, slot_duration);
                partial = Some(interpolate(
                    &target,
                    prev_close,
                    fraction,
                    settings.price_decimals,
                ));
            }
        }

        Ok(MarketView {
            candles,
            partial,
            server_time: now_ms,
        })
    }

    /// # Summary
    /// 查询最近一根持久化 K 线。
    async fn latest(&self, series: &SeriesIdentity) -> Result<Option<Candle>, MarketError> {
        Self::validate_series(series)?;
        Ok(self.store.latest(series).await?)
    }

    /// # Summary
    /// 手动提交一根最终 K 线（管理/测试通道）。
    ///
    /// # Logic
    /// 1. 同步校验 OHLC 不变量与槽位对齐，非法提交绝不触达存储。
    /// 2. 复用与自动提交相同的幂等写入；首次插入成功即广播。
    async fn commit(
        &self,
        series: &SeriesIdentity,
        candle: Candle,
    ) -> Result<CommitOutcome, MarketError> {
        Self::validate_series(series)?;
        candle.validate()?;
        if candle.start_time % series.slot_duration_ms() != 0 {
            return Err(MarketError::Validation(format!(
                "start_time {} is not aligned to a {}m slot",
                candle.start_time, series.timeframe_minutes
            )));
        }

        let outcome = self.store.commit(series, &candle).await?;
        if outcome.inserted {
            self.publisher.publish(CandleEvent {
                series: series.clone(),
                candle,
            });
        }
        Ok(outcome)
    }

    /// # Summary
    /// 订阅全量收盘事件流。
    fn subscribe(&self) -> CandleEventStream {
        self.publisher.subscribe()
    }
}
