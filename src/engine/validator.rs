//! 候选信号校验
//!
//! 校验失败是正常的过滤结果，只在 debug 级别记录原因。

use crate::engine::events::{Curvature, SignalCandidate};
use crate::klcommon::config::SignalConfig;
use crate::klcommon::{AppError, Result};

/// 校验规则
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValidationRules {
    /// 成交量必须严格大于该值
    pub min_volume: f64,
    /// 两条均线曲率都为 flat 时拒绝
    pub reject_flat_curvature: bool,
}

impl Default for ValidationRules {
    fn default() -> Self {
        Self { min_volume: 0.0, reject_flat_curvature: false }
    }
}

impl From<&SignalConfig> for ValidationRules {
    fn from(config: &SignalConfig) -> Self {
        Self {
            min_volume: config.min_volume,
            reject_flat_curvature: config.reject_flat_curvature,
        }
    }
}

fn positive(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(AppError::ValidationRejected(format!("{} 无效: {}", name, value)))
    }
}

/// 返回第一个不满足的规则
pub fn validate(candidate: &SignalCandidate, rules: &ValidationRules) -> Result<()> {
    positive("price", candidate.price)?;
    positive("short_value", candidate.short_value)?;
    positive("long_value", candidate.long_value)?;

    if !candidate.volume.is_finite() || candidate.volume <= rules.min_volume {
        return Err(AppError::ValidationRejected(format!(
            "成交量 {} 不大于下限 {}",
            candidate.volume, rules.min_volume
        )));
    }

    if !(0.0..=100.0).contains(&candidate.rsi) {
        return Err(AppError::ValidationRejected(format!("RSI 超出范围: {}", candidate.rsi)));
    }

    let (Some(short), Some(long)) = (candidate.short_curvature, candidate.long_curvature) else {
        return Err(AppError::ValidationRejected("缺少曲率标签".to_string()));
    };

    if rules.reject_flat_curvature && short == Curvature::Flat && long == Curvature::Flat {
        return Err(AppError::ValidationRejected("两条均线曲率均为 flat".to_string()));
    }

    Ok(())
}

pub fn is_valid(candidate: &SignalCandidate, rules: &ValidationRules) -> bool {
    validate(candidate, rules).is_ok()
}
