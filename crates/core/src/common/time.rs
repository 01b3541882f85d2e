use chrono::{DateTime, Utc};
use std::sync::RwLock;

/// # Summary
/// 时间供给器接口，用于劫持和隔离物理系统时钟。
/// 部分 K 线插值与边界检测只能依据服务端权威时钟，
/// 任何客户端时钟都不得参与计算。
pub trait TimeProvider: Send + Sync {
    /// 获取当前挂载的时间
    fn now(&self) -> DateTime<Utc>;

    /// 获取当前挂载时间的 UTC 毫秒时间戳
    fn now_ms(&self) -> i64 {
        self.now().timestamp_millis()
    }
}

/// # Summary
/// 针对生产运行的真实时钟，直接返回操作系统当前时间。
pub struct RealTimeProvider;

impl TimeProvider for RealTimeProvider {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// # Summary
/// 测试专用虚拟时钟，允许用例主动拨快或回退时间，
/// 使边界检测与追补逻辑无需真实等待即可验证。
///
/// # Invariants
/// - 并发安全：内部利用 `RwLock` 提供多线程安全的修改和读取。
pub struct FakeClockProvider {
    current_time: RwLock<DateTime<Utc>>,
}

impl FakeClockProvider {
    /// 使用指定的初始时间创建虚拟时钟
    pub fn new(initial_time: DateTime<Utc>) -> Self {
        Self {
            current_time: RwLock::new(initial_time),
        }
    }

    /// 以 UTC 毫秒时间戳创建虚拟时钟
    pub fn from_ms(ms: i64) -> Self {
        let time = DateTime::<Utc>::from_timestamp_millis(ms).unwrap_or_default();
        Self::new(time)
    }

    /// 强制修改时钟的当前时间
    pub fn set_time(&self, new_time: DateTime<Utc>) {
        let mut time = self.current_time.write().unwrap_or_else(|e| e.into_inner());
        *time = new_time;
    }

    /// 将时钟拨快指定毫秒数
    pub fn advance_ms(&self, delta_ms: i64) {
        let mut time = self.current_time.write().unwrap_or_else(|e| e.into_inner());
        *time += chrono::Duration::milliseconds(delta_ms);
    }
}

impl TimeProvider for FakeClockProvider {
    fn now(&self) -> DateTime<Utc> {
        *self.current_time.read().unwrap_or_else(|e| e.into_inner())
    }
}
