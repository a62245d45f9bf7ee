//! 入场信号的止盈止损估算

use crate::engine::events::{Direction, TradeLevels};
use crate::klcommon::config::SignalConfig;
use crate::klcommon::Candle;

/// 止损放在回看窗口内的最低价（做多）或最高价（做空），
/// 止盈距离取 `止损距离 × reward_ratio` 与 `price × min_profit_pct%` 中较大者。
/// 窗口极值不在止损一侧时，止损距离退化为最小盈利距离 / reward_ratio。
pub fn compute_trade_levels(
    candles: &[Candle],
    direction: Direction,
    price: f64,
    config: &SignalConfig,
) -> Option<TradeLevels> {
    if candles.is_empty() || !price.is_finite() || price <= 0.0 {
        return None;
    }

    let window = &candles[candles.len().saturating_sub(config.lookback.max(1))..];
    let min_profit = price * config.min_profit_pct / 100.0;
    let fallback_risk = min_profit / config.reward_ratio;

    let risk = match direction {
        Direction::Up => {
            let low = window.iter().map(|c| c.low).fold(f64::INFINITY, f64::min);
            price - low
        }
        Direction::Down => {
            let high = window.iter().map(|c| c.high).fold(f64::NEG_INFINITY, f64::max);
            high - price
        }
    };
    let risk = if risk.is_finite() && risk > 0.0 { risk } else { fallback_risk };
    let reward = (risk * config.reward_ratio).max(min_profit);

    let levels = match direction {
        Direction::Up => TradeLevels { take_profit: price + reward, stop_loss: price - risk },
        Direction::Down => TradeLevels { take_profit: price - reward, stop_loss: price + risk },
    };

    Some(levels)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candle(i: i64, low: f64, high: f64) -> Candle {
        Candle {
            open_time: i * 900_000,
            open: (low + high) / 2.0,
            high,
            low,
            close: (low + high) / 2.0,
            volume: 10.0,
        }
    }

    #[test]
    fn test_long_levels_use_window_low() {
        let config = SignalConfig::default();
        let candles: Vec<Candle> = (0..20).map(|i| candle(i, 90.0 + i as f64 * 0.1, 110.0)).collect();
        // 回看10根，最低价 = 90 + 10*0.1 = 91
        let levels = compute_trade_levels(&candles, Direction::Up, 100.0, &config).unwrap();
        assert!((levels.stop_loss - 91.0).abs() < 1e-9);
        assert!((levels.take_profit - 118.0).abs() < 1e-9);
    }

    #[test]
    fn test_short_levels_use_window_high() {
        let config = SignalConfig::default();
        let candles: Vec<Candle> = (0..5).map(|i| candle(i, 95.0, 105.0)).collect();
        let levels = compute_trade_levels(&candles, Direction::Down, 100.0, &config).unwrap();
        assert!((levels.stop_loss - 105.0).abs() < 1e-9);
        assert!((levels.take_profit - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_min_profit_floor() {
        let config = SignalConfig { min_profit_pct: 5.0, ..SignalConfig::default() };
        let candles: Vec<Candle> = (0..5).map(|i| candle(i, 99.0, 101.0)).collect();
        // 风险1，按比例只有2，低于最小盈利 5
        let levels = compute_trade_levels(&candles, Direction::Up, 100.0, &config).unwrap();
        assert!((levels.take_profit - 105.0).abs() < 1e-9);
        assert!((levels.stop_loss - 99.0).abs() < 1e-9);
    }

    #[test]
    fn test_price_below_window_low_falls_back() {
        let config = SignalConfig::default();
        let candles: Vec<Candle> = (0..5).map(|i| candle(i, 120.0, 130.0)).collect();
        let levels = compute_trade_levels(&candles, Direction::Up, 100.0, &config).unwrap();
        // 最小盈利 1%，止损距离 0.5
        assert!((levels.take_profit - 101.0).abs() < 1e-9);
        assert!((levels.stop_loss - 99.5).abs() < 1e-9);
    }

    #[test]
    fn test_degenerate_inputs() {
        let config = SignalConfig::default();
        assert!(compute_trade_levels(&[], Direction::Up, 100.0, &config).is_none());
        let candles = vec![candle(0, 1.0, 2.0)];
        assert!(compute_trade_levels(&candles, Direction::Up, f64::NAN, &config).is_none());
        assert!(compute_trade_levels(&candles, Direction::Up, 0.0, &config).is_none());
    }
}
