use crate::common::SeriesSettings;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 全局应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub market: MarketConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub data_dir: String,
}

/// # Summary
/// 市场子系统配置：边界检测节拍、历史回填深度、查询与广播上限，
/// 以及序列生成参数的默认值。
///
/// # Invariants
/// - `tick_interval_ms` 不得超过 1000（边界检测周期 ≤ 1s）。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketConfig {
    // 边界检测器的轮询周期 (毫秒)
    pub tick_interval_ms: u64,
    // 序列首次挂载且无历史时回填的槽位数量
    pub backfill_slots: u32,
    // 区间查询单次返回的最大行数
    pub query_limit_max: u32,
    // 收盘事件广播通道容量
    pub broadcast_capacity: usize,
    // 未配置标的的默认生成参数
    pub default_volatility: f64,
    pub default_price_decimals: u32,
    pub default_initial_price: f64,
    // 按标的覆盖的初始价格 (资产目录的外部协作缝)
    pub initial_prices: HashMap<String, f64>,
}

impl MarketConfig {
    /// # Summary
    /// 解析某个标的的序列生成参数。
    ///
    /// # Logic
    /// 初始价优先取 `initial_prices` 中的覆盖值，其余取默认值。
    pub fn settings_for(&self, symbol: &str) -> SeriesSettings {
        SeriesSettings {
            initial_price: self
                .initial_prices
                .get(symbol)
                .copied()
                .unwrap_or(self.default_initial_price),
            volatility: self.default_volatility,
            price_decimals: self.default_price_decimals,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            database: DatabaseConfig {
                data_dir: "data".to_string(),
            },
            market: MarketConfig::default(),
        }
    }
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1000,
            backfill_slots: 500,
            query_limit_max: 5000,
            broadcast_capacity: 128,
            default_volatility: 0.02,
            default_price_decimals: 5,
            default_initial_price: 100.0,
            initial_prices: HashMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.database.data_dir, "data");
        assert_eq!(config.market.tick_interval_ms, 1000);
        assert_eq!(config.market.backfill_slots, 500);
    }

    #[test]
    fn test_settings_override() {
        let mut config = MarketConfig::default();
        config.initial_prices.insert("BTCUSD".into(), 50000.0);
        assert_eq!(config.settings_for("BTCUSD").initial_price, 50000.0);
        assert_eq!(config.settings_for("EURUSD").initial_price, 100.0);
        assert_eq!(config.settings_for("BTCUSD").volatility, 0.02);
    }
}
