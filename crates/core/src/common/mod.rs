use serde::{Deserialize, Serialize};

pub mod time;

/// # Summary
/// 序列身份实体，(symbol, timeframe_minutes, version) 三元组唯一确定
/// 一条确定性 K 线流。
///
/// # Invariants
/// - 修改 `version` 会开启一条完全独立的新流，绝不改写已有流。
/// - `timeframe_minutes` 必须大于 0，由调用方保证。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SeriesIdentity {
    // 标的代码 (例如: BTCUSD)
    pub symbol: String,
    // 周期长度，单位分钟
    pub timeframe_minutes: u32,
    // 历史版本号 (例如: "v1")
    pub version: String,
}

impl SeriesIdentity {
    /// 构造序列身份。
    pub fn new(symbol: impl Into<String>, timeframe_minutes: u32, version: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            timeframe_minutes,
            version: version.into(),
        }
    }

    /// # Summary
    /// 返回该序列的槽位时长（毫秒）。
    pub fn slot_duration_ms(&self) -> i64 {
        i64::from(self.timeframe_minutes) * 60_000
    }

    /// # Summary
    /// 计算某个 UTC 毫秒时间戳所属的槽位索引。
    ///
    /// # Logic
    /// `index = floor(time / slot_duration)`，以 Unix 纪元为锚点，
    /// 保证所有进程对同一时刻得出相同索引。
    pub fn slot_index(&self, time_ms: i64) -> i64 {
        time_ms.div_euclid(self.slot_duration_ms())
    }

    /// # Summary
    /// 计算槽位索引对应的起始时间（UTC 毫秒）。
    pub fn slot_start_ms(&self, index: i64) -> i64 {
        index * self.slot_duration_ms()
    }

    /// # Summary
    /// 生成注册表使用的唯一键。
    ///
    /// # Logic
    /// 按 `symbol|timeframe|version` 拼接，与种子前缀保持同一命名习惯。
    pub fn key(&self) -> String {
        format!("{}|{}|{}", self.symbol, self.timeframe_minutes, self.version)
    }
}

impl std::fmt::Display for SeriesIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}m/{}", self.symbol, self.timeframe_minutes, self.version)
    }
}

/// # Summary
/// 序列生成参数，决定价格走势的统计特征。
///
/// # Invariants
/// - `volatility <= 0` 是合法的退化配置，产出恒价 K 线。
/// - `price_decimals` 为最终一次性舍入的小数位数，下游不得二次舍入。
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SeriesSettings {
    // 序列首根 K 线的起始价格
    pub initial_price: f64,
    // 波动率系数 (例如 0.02 表示 2%)
    pub volatility: f64,
    // 价格舍入的小数位数
    pub price_decimals: u32,
}

impl Default for SeriesSettings {
    fn default() -> Self {
        Self {
            initial_price: 100.0,
            volatility: 0.02,
            price_decimals: 5,
        }
    }
}
