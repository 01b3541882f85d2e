use souba_core::common::time::TimeProvider;
use souba_core::common::{SeriesIdentity, SeriesSettings};
use souba_core::market::entity::CandleEvent;
use souba_core::notify::port::CandlePublisher;
use souba_core::store::port::CandleStore;
use souba_gen::generator::CandleGenerator;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// 检测器内部状态。
///
/// # Invariants
/// - `next_index` 之前的所有槽位都已成功（或幂等空操作）提交。
/// - `prev_close` 是 `next_index - 1` 槽位的真实收盘价。
struct MonitorState {
    // 下一个待封存的槽位索引
    next_index: i64,
    // 上一槽位的真实收盘价
    prev_close: f64,
    // 是否已从存储恢复初始状态
    initialized: bool,
}

/// # Summary
/// 单序列的边界检测/自动提交器。墙钟跨过槽位边界时生成最终
/// K 线并提交；本类型（及手动管理通道）是最终 K 线的唯一写入者。
///
/// # Invariants
/// - 提交失败不推进状态：同一槽位下一拍重试，配合幂等写入
///   构成"至少一次投递进幂等汇"的正确性。
/// - 单检测器按索引非降序提交；跨提交排序无需存储层保证，
///   因为每次提交的键都不同。
/// - 状态按序列私有，绝不使用环境全局变量。
pub struct SeriesMonitor {
    series: SeriesIdentity,
    generator: CandleGenerator,
    store: Arc<dyn CandleStore>,
    publisher: Arc<dyn CandlePublisher>,
    time: Arc<dyn TimeProvider>,
    // 序列首次挂载且无任何历史时回填的槽位数
    backfill_slots: u32,
    state: Mutex<MonitorState>,
}

impl SeriesMonitor {
    /// # Summary
    /// 构造检测器实例（不启动循环）。
    pub fn new(
        series: SeriesIdentity,
        settings: SeriesSettings,
        store: Arc<dyn CandleStore>,
        publisher: Arc<dyn CandlePublisher>,
        time: Arc<dyn TimeProvider>,
        backfill_slots: u32,
    ) -> Self {
        Self {
            series,
            generator: CandleGenerator::new(settings),
            store,
            publisher,
            time,
            backfill_slots,
            state: Mutex::new(MonitorState {
                next_index: 0,
                prev_close: settings.initial_price,
                initialized: false,
            }),
        }
    }

    /// 监控的序列身份。
    pub fn series(&self) -> &SeriesIdentity {
        &self.series
    }

    /// # Summary
    /// 启动后台检测循环。
    ///
    /// # Logic
    /// 持有弱引用轮询：注册表释放检测器后循环自行退出。
    ///
    /// # Arguments
    /// * `tick_interval`: 轮询周期，必须 ≤ 1s。
    pub fn spawn(self: &Arc<Self>, tick_interval: Duration) {
        let weak: Weak<Self> = Arc::downgrade(self);
        let series = self.series.clone();
        tokio::spawn(async move {
            info!("boundary detector started for {}", series);
            let mut ticker = tokio::time::interval(tick_interval);
            loop {
                ticker.tick().await;
                let Some(monitor) = weak.upgrade() else {
                    break;
                };
                let _sealed = monitor.poll_once().await;
            }
            info!("boundary detector stopped for {}", series);
        });
    }

    /// # Summary
    /// 执行一次边界检测，封存所有已闭合且未提交的槽位。
    ///
    /// # Logic
    /// 1. `current = floor(server_now / slot_duration)`。
    /// 2. 首次运行时从存储恢复状态（或按配置回填历史）。
    /// 3. 对 `[next_index, current)` 中每个已闭合槽位：用真实上一
    ///    收盘价生成最终 K 线并提交；成功或幂等空操作才推进索引，
    ///    失败则保留状态等待下一拍重试。
    /// 4. 首次插入成功时广播收盘事件。
    ///
    /// # Returns
    /// 本次成功封存（含幂等空操作）的槽位数。
    pub async fn poll_once(&self) -> u32 {
        let now_ms = self.time.now_ms();
        let current_index = self.series.slot_index(now_ms);

        let mut state = self.state.lock().await;
        if !state.initialized && !self.initialize(&mut state, current_index).await {
            return 0;
        }

        let mut sealed = 0u32;
        while state.next_index < current_index {
            let index = state.next_index;
            let candle = self.generator.generate(&self.series, index, state.prev_close);

            match self.store.commit(&self.series, &candle).await {
                Ok(outcome) => {
                    if outcome.inserted {
                        debug!("sealed {} slot {} close={}", self.series, index, candle.close);
                        self.publisher.publish(CandleEvent {
                            series: self.series.clone(),
                            candle: candle.clone(),
                        });
                    } else {
                        // 另一实例已抢先提交同一键；数值确定性保证两边一致
                        debug!("slot {} of {} already sealed elsewhere", index, self.series);
                    }
                    state.prev_close = candle.close;
                    state.next_index = index + 1;
                    sealed += 1;
                }
                Err(e) => {
                    // 存储瞬态不可用：状态不动，下一拍从同一槽位重试
                    warn!("commit failed for {} slot {}: {}", self.series, index, e);
                    break;
                }
            }
        }
        sealed
    }

    /// # Summary
    /// 从存储恢复检测器状态。
    ///
    /// # Logic
    /// 1. 有历史：从最新持久化 K 线之后继续——停机期间错过的所有
    ///    槽位将由常规封存循环整体追补。
    /// 2. 无历史且配置了回填：把起点拨回 `backfill_slots` 个槽位，
    ///    让封存循环经由同一条幂等提交路径生成历史。
    /// 3. 无历史且不回填：从当前槽位开始。
    ///
    /// # Returns
    /// 恢复成功返回 true；存储不可用返回 false，下一拍重试。
    async fn initialize(&self, state: &mut MonitorState, current_index: i64) -> bool {
        match self.store.latest(&self.series).await {
            Ok(Some(latest)) => {
                state.prev_close = latest.close;
                state.next_index = self.series.slot_index(latest.start_time) + 1;
            }
            Ok(None) => {
                let backfill = i64::from(self.backfill_slots);
                state.prev_close = self.generator.settings().initial_price;
                state.next_index = (current_index - backfill).max(0);
            }
            Err(e) => {
                warn!("monitor init failed for {}: {}", self.series, e);
                return false;
            }
        }
        state.initialized = true;
        info!(
            "monitor for {} initialized, next slot {}",
            self.series, state.next_index
        );
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::publisher::BroadcastPublisher;
    use async_trait::async_trait;
    use dashmap::DashMap;
    use futures::StreamExt;
    use souba_core::common::time::FakeClockProvider;
    use souba_core::market::entity::Candle;
    use souba_core::store::error::StoreError;
    use souba_core::store::port::CommitOutcome;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// 内存存储桩，键 → K 线，可开关故障注入。
    struct MemStore {
        rows: DashMap<(String, i64), Candle>,
        failing: AtomicBool,
    }

    impl MemStore {
        fn new() -> Self {
            Self {
                rows: DashMap::new(),
                failing: AtomicBool::new(false),
            }
        }

        fn set_failing(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }

        fn check(&self) -> Result<(), StoreError> {
            if self.failing.load(Ordering::SeqCst) {
                Err(StoreError::Database("injected outage".into()))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl CandleStore for MemStore {
        async fn commit(
            &self,
            series: &SeriesIdentity,
            candle: &Candle,
        ) -> Result<CommitOutcome, StoreError> {
            self.check()?;
            let key = (series.key(), candle.start_time);
            let inserted = match self.rows.entry(key) {
                dashmap::mapref::entry::Entry::Occupied(_) => false,
                dashmap::mapref::entry::Entry::Vacant(v) => {
                    v.insert(candle.clone());
                    true
                }
            };
            Ok(CommitOutcome { inserted })
        }

        async fn query(
            &self,
            series: &SeriesIdentity,
            start_ms: i64,
            end_ms: i64,
            limit: u32,
        ) -> Result<Vec<Candle>, StoreError> {
            self.check()?;
            let mut rows: Vec<Candle> = self
                .rows
                .iter()
                .filter(|e| {
                    e.key().0 == series.key()
                        && e.key().1 >= start_ms
                        && e.key().1 < end_ms
                })
                .map(|e| e.value().clone())
                .collect();
            rows.sort_by_key(|c| c.start_time);
            rows.truncate(limit as usize);
            Ok(rows)
        }

        async fn latest(&self, series: &SeriesIdentity) -> Result<Option<Candle>, StoreError> {
            self.check()?;
            Ok(self
                .rows
                .iter()
                .filter(|e| e.key().0 == series.key())
                .max_by_key(|e| e.key().1)
                .map(|e| e.value().clone()))
        }
    }

    fn settings() -> SeriesSettings {
        SeriesSettings {
            initial_price: 50000.0,
            volatility: 0.02,
            price_decimals: 5,
        }
    }

    fn build(
        store: Arc<MemStore>,
        clock: Arc<FakeClockProvider>,
        backfill: u32,
    ) -> (Arc<SeriesMonitor>, Arc<BroadcastPublisher>) {
        let publisher = Arc::new(BroadcastPublisher::new(1024));
        let monitor = Arc::new(SeriesMonitor::new(
            SeriesIdentity::new("BTCUSD", 1, "v1"),
            settings(),
            store,
            publisher.clone(),
            clock,
            backfill,
        ));
        (monitor, publisher)
    }

    #[tokio::test]
    async fn test_no_seal_before_boundary() {
        let store = Arc::new(MemStore::new());
        let clock = Arc::new(FakeClockProvider::from_ms(600_000 + 30_000));
        let (monitor, _) = build(store.clone(), clock.clone(), 0);

        assert_eq!(monitor.poll_once().await, 0);
        // 槽位内时间流逝但未跨界
        clock.advance_ms(20_000);
        assert_eq!(monitor.poll_once().await, 0);
        assert!(store.rows.is_empty());
    }

    #[tokio::test]
    async fn test_seal_on_boundary_crossing() {
        let store = Arc::new(MemStore::new());
        let clock = Arc::new(FakeClockProvider::from_ms(600_000 + 30_000));
        let (monitor, _) = build(store.clone(), clock.clone(), 0);
        assert_eq!(monitor.poll_once().await, 0);

        // 跨过一个边界：槽位 10 闭合
        clock.advance_ms(60_000);
        assert_eq!(monitor.poll_once().await, 1);

        let series = SeriesIdentity::new("BTCUSD", 1, "v1");
        let sealed = store.latest(&series).await.unwrap().expect("sealed candle");
        assert_eq!(sealed.start_time, series.slot_start_ms(10));
        assert_eq!(sealed.open, 50000.0);

        // 同一拍不重复封存
        assert_eq!(monitor.poll_once().await, 0);
    }

    #[tokio::test]
    async fn test_catch_up_after_pause() {
        let store = Arc::new(MemStore::new());
        let clock = Arc::new(FakeClockProvider::from_ms(600_000));
        let (monitor, _) = build(store.clone(), clock.clone(), 0);
        assert_eq!(monitor.poll_once().await, 0);

        // 停摆 5 个槽位后恢复：一次性整体追补
        clock.advance_ms(5 * 60_000);
        assert_eq!(monitor.poll_once().await, 5);

        let series = SeriesIdentity::new("BTCUSD", 1, "v1");
        let rows = store.query(&series, 0, i64::MAX, 100).await.unwrap();
        assert_eq!(rows.len(), 5);
        // 收盘价链条连续
        for pair in rows.windows(2) {
            assert_eq!(pair[1].open, pair[0].close);
        }
    }

    #[tokio::test]
    async fn test_failed_commit_retries_same_slot() {
        let store = Arc::new(MemStore::new());
        let clock = Arc::new(FakeClockProvider::from_ms(600_000));
        let (monitor, _) = build(store.clone(), clock.clone(), 0);
        assert_eq!(monitor.poll_once().await, 0);

        clock.advance_ms(120_000);
        store.set_failing(true);
        // 存储不可用：不推进，不崩溃
        assert_eq!(monitor.poll_once().await, 0);
        assert!(store.rows.is_empty());

        // 存储恢复：同样的槽位按原序补齐
        store.set_failing(false);
        assert_eq!(monitor.poll_once().await, 2);
        let series = SeriesIdentity::new("BTCUSD", 1, "v1");
        assert_eq!(store.query(&series, 0, i64::MAX, 10).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_backfill_on_first_mount() {
        let store = Arc::new(MemStore::new());
        let clock = Arc::new(FakeClockProvider::from_ms(100 * 60_000 + 1_000));
        let (monitor, _) = build(store.clone(), clock.clone(), 20);

        // 首次轮询经由同一条提交路径回填 20 根历史
        assert_eq!(monitor.poll_once().await, 20);
        let series = SeriesIdentity::new("BTCUSD", 1, "v1");
        let rows = store.query(&series, 0, i64::MAX, 100).await.unwrap();
        assert_eq!(rows.len(), 20);
        assert_eq!(rows[0].start_time, series.slot_start_ms(80));
        assert_eq!(rows[0].open, 50000.0);
        assert_eq!(rows[19].start_time, series.slot_start_ms(99));
    }

    #[tokio::test]
    async fn test_resume_from_persisted_history() {
        let store = Arc::new(MemStore::new());
        let clock = Arc::new(FakeClockProvider::from_ms(600_000));
        {
            let (monitor, _) = build(store.clone(), clock.clone(), 0);
            assert_eq!(monitor.poll_once().await, 0);
            clock.advance_ms(3 * 60_000);
            assert_eq!(monitor.poll_once().await, 3);
        }

        // 新的检测器实例（如进程重启）从持久化状态续传
        clock.advance_ms(2 * 60_000);
        let (restarted, _) = build(store.clone(), clock.clone(), 0);
        assert_eq!(restarted.poll_once().await, 2);

        let series = SeriesIdentity::new("BTCUSD", 1, "v1");
        let rows = store.query(&series, 0, i64::MAX, 100).await.unwrap();
        assert_eq!(rows.len(), 5);
        for pair in rows.windows(2) {
            assert_eq!(pair[1].open, pair[0].close);
        }
    }

    #[tokio::test]
    async fn test_seal_publishes_completed_event() {
        let store = Arc::new(MemStore::new());
        let clock = Arc::new(FakeClockProvider::from_ms(600_000));
        let (monitor, publisher) = build(store.clone(), clock.clone(), 0);
        assert_eq!(monitor.poll_once().await, 0);

        let mut events = souba_core::notify::port::CandlePublisher::subscribe(&*publisher);
        clock.advance_ms(60_000);
        assert_eq!(monitor.poll_once().await, 1);

        let event = events.next().await.expect("completed event");
        assert_eq!(event.series.symbol, "BTCUSD");
        assert_eq!(event.candle.start_time, 600_000);
    }

    #[tokio::test]
    async fn test_duplicate_seal_not_republished() {
        let store = Arc::new(MemStore::new());
        let clock = Arc::new(FakeClockProvider::from_ms(600_000));
        let (a, publisher) = build(store.clone(), clock.clone(), 0);
        // 第二个检测器与 a 共享广播器，模拟水平扩展的另一实例
        let b = Arc::new(SeriesMonitor::new(
            SeriesIdentity::new("BTCUSD", 1, "v1"),
            settings(),
            store.clone(),
            publisher.clone(),
            clock.clone(),
            0,
        ));
        assert_eq!(a.poll_once().await, 0);
        assert_eq!(b.poll_once().await, 0);

        clock.advance_ms(60_000);
        assert_eq!(a.poll_once().await, 1);

        // 第二个检测器遇到幂等空操作：推进状态但不再广播
        let mut events = souba_core::notify::port::CandlePublisher::subscribe(&*publisher);
        assert_eq!(b.poll_once().await, 1);
        publisher.publish(CandleEvent {
            series: SeriesIdentity::new("SENTINEL", 1, "v1"),
            candle: store
                .latest(&SeriesIdentity::new("BTCUSD", 1, "v1"))
                .await
                .unwrap()
                .expect("candle"),
        });
        // 哨兵事件先于任何重复广播到达，证明 b 未重复发布
        let first = events.next().await.expect("event");
        assert_eq!(first.series.symbol, "SENTINEL");
    }
}
