//! 部分 K 线插值器。
//!
//! 把当前槽位的目标 K 线按服务端时钟的已过比例折算成
//! "正在形成中"的视图：比例相同则所有客户端看到完全一致的
//! 部分 K 线，与各自的连接时刻无关。

use crate::generator::round_price;
use souba_core::market::entity::{Candle, PartialCandle};

/// # Summary
/// 计算槽位内已过时间比例。
///
/// # Logic
/// `clamp((server_now - slot_start) / slot_duration, 0, 1)`。
/// 只允许服务端权威时钟参与；时钟偏斜导致的越界一律钳制，
/// 绝不报错——后果只是部分 K 线看起来略早或略晚，不会损坏数据。
pub fn elapsed_fraction(server_now_ms: i64, slot_start_ms: i64, slot_duration_ms: i64) -> f64 {
    if slot_duration_ms <= 0 {
        return 0.0;
    }
    let elapsed = server_now_ms - slot_start_ms;
    ((elapsed as f64) / (slot_duration_ms as f64)).clamp(0.0, 1.0)
}

/// # Summary
/// 按已过比例把目标 K 线插值为部分 K 线。
///
/// # Logic
/// 1. `close = open + (target.close - open) * f`。
/// 2. 振幅包络随同一比例增长：high 在 max(open, close) 之上叠加
///    目标上影的 f 倍，low 在 min(open, close) 之下叠加目标下影
///    的 f 倍；f=0 时完全平坦，f=1 时达到完整目标振幅。
/// 3. 成交量按比例折算，价格最后一次性舍入。
///
/// # Invariants
/// - 收敛：`f = 1` 时 close/high/low 与目标逐位相等
///   （开盘价等于目标开盘价时恒成立，由调用方用真实上一收盘喂入）。
///
/// # Arguments
/// * `target`: 该槽位收盘时将成为的最终 K 线。
/// * `open`: 开盘价（上一槽位真实收盘价）。
/// * `fraction`: 已钳制的 `[0, 1]` 比例。
/// * `price_decimals`: 最终舍入位数。
pub fn interpolate(target: &Candle, open: f64, fraction: f64, price_decimals: u32) -> PartialCandle {
    let f = fraction.clamp(0.0, 1.0);

    let close = open + (target.close - open) * f;
    let upper_wick = target.high - target.open.max(target.close);
    let lower_wick = target.open.min(target.close) - target.low;
    let high = open.max(close) + upper_wick * f;
    let low = open.min(close) - lower_wick * f;
    let volume = ((target.volume as f64) * f) as i64;

    PartialCandle {
        start_time: target.start_time,
        open: round_price(open, price_decimals),
        high: round_price(high, price_decimals),
        low: round_price(low, price_decimals),
        close: round_price(close, price_decimals),
        volume,
        elapsed_fraction: f,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::CandleGenerator;
    use souba_core::common::{SeriesIdentity, SeriesSettings};

    fn target() -> Candle {
        let g = CandleGenerator::new(SeriesSettings {
            initial_price: 50000.0,
            volatility: 0.02,
            price_decimals: 5,
        });
        g.generate(&SeriesIdentity::new("BTCUSD", 1, "v1"), 3, 50000.0)
    }

    #[test]
    fn test_fraction_clamped() {
        assert_eq!(elapsed_fraction(0, 60_000, 60_000), 0.0);
        assert_eq!(elapsed_fraction(90_000, 60_000, 60_000), 0.5);
        assert_eq!(elapsed_fraction(500_000, 60_000, 60_000), 1.0);
        // 时钟偏斜：槽位尚未开始
        assert_eq!(elapsed_fraction(30_000, 60_000, 60_000), 0.0);
    }

    #[test]
    fn test_zero_fraction_is_flat() {
        let t = target();
        let p = interpolate(&t, t.open, 0.0, 5);
        assert_eq!(p.open, t.open);
        assert_eq!(p.close, t.open);
        assert_eq!(p.high, t.open);
        assert_eq!(p.low, t.open);
        assert_eq!(p.volume, 0);
    }

    #[test]
    fn test_full_fraction_converges_exactly() {
        let t = target();
        let p = interpolate(&t, t.open, 1.0, 5);
        assert_eq!(p.close, t.close);
        assert_eq!(p.high, t.high);
        assert_eq!(p.low, t.low);
        assert_eq!(p.volume, t.volume);
    }

    #[test]
    fn test_convergence_for_many_targets() {
        let g = CandleGenerator::new(SeriesSettings {
            initial_price: 100.0,
            volatility: 0.03,
            price_decimals: 2,
        });
        let series = SeriesIdentity::new("EURUSD", 5, "v1");
        let mut prev_close = 100.0;
        for index in 0..200 {
            let t = g.generate(&series, index, prev_close);
            let p = interpolate(&t, t.open, 1.0, 2);
            assert_eq!(p.close, t.close, "close diverged at #{index}");
            assert_eq!(p.high, t.high, "high diverged at #{index}");
            assert_eq!(p.low, t.low, "low diverged at #{index}");
            prev_close = t.close;
        }
    }

    #[test]
    fn test_midpoint_close_between_open_and_target() {
        let t = target();
        let p = interpolate(&t, t.open, 0.5, 5);
        let (lo, hi) = if t.open < t.close {
            (t.open, t.close)
        } else {
            (t.close, t.open)
        };
        assert!(p.close > lo && p.close < hi);
        assert!(p.high >= p.open.max(p.close));
        assert!(p.low <= p.open.min(p.close));
        assert_eq!(p.elapsed_fraction, 0.5);
    }

    #[test]
    fn test_range_grows_monotonically() {
        let t = target();
        let mut last_range = -1.0;
        for step in 0..=10 {
            let f = f64::from(step) / 10.0;
            let p = interpolate(&t, t.open, f, 5);
            let range = p.high - p.low;
            assert!(range >= last_range - 1e-9);
            last_range = range;
        }
    }
}
