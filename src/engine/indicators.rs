//! 指标计算：EMA序列、RSI、曲率标签

use crate::engine::events::Curvature;
use crate::klcommon::{AppError, Result};

/// 指数移动平均
///
/// 首个值取 `closes[0]`，之后 `ema[i] = close[i]*k + ema[i-1]*(1-k)`，`k = 2/(period+1)`。
/// 输出与输入等长。
pub fn compute_ema(closes: &[f64], period: usize) -> Result<Vec<f64>> {
    if period == 0 {
        return Err(AppError::ConfigError("EMA周期必须大于0".to_string()));
    }

    let Some((&first, rest)) = closes.split_first() else {
        return Err(AppError::InsufficientData { needed: 1, actual: 0 });
    };

    let k = 2.0 / (period as f64 + 1.0);
    let mut ema = Vec::with_capacity(closes.len());
    let mut prev = first;
    ema.push(prev);

    for &close in rest {
        prev = close * k + prev * (1.0 - k);
        ema.push(prev);
    }

    Ok(ema)
}

/// 相对强弱指数（最近 `period` 根的简单平均涨跌幅，不做指数平滑）
///
/// 平均跌幅为 0 时返回 100。
pub fn compute_rsi(closes: &[f64], period: usize) -> Result<f64> {
    if period == 0 {
        return Err(AppError::ConfigError("RSI周期必须大于0".to_string()));
    }

    if closes.len() < period + 1 {
        return Err(AppError::InsufficientData { needed: period + 1, actual: closes.len() });
    }

    let (gains, losses) = closes[closes.len() - period - 1..]
        .windows(2)
        .map(|w| w[1] - w[0])
        .fold((0.0, 0.0), |(gains, losses), delta| {
            if delta > 0.0 {
                (gains + delta, losses)
            } else {
                (gains, losses - delta)
            }
        });

    let avg_gain = gains / period as f64;
    let avg_loss = losses / period as f64;

    if avg_loss == 0.0 {
        return Ok(100.0);
    }

    Ok(100.0 - 100.0 / (1.0 + avg_gain / avg_loss))
}

/// 比较最后两段斜率，判断曲线是在加速上弯、加速下弯还是平缓
///
/// 少于3个点时返回 None。
pub fn compute_curvature(series: &[f64], threshold: f64) -> Option<Curvature> {
    let [.., a, b, c] = series else {
        return None;
    };

    let slope_delta = (c - b) - (b - a);

    if slope_delta > threshold {
        Some(Curvature::RisingSharp)
    } else if slope_delta < -threshold {
        Some(Curvature::FallingSharp)
    } else {
        Some(Curvature::Flat)
    }
}
