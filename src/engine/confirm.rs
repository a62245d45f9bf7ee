//! 多周期确认：入场周期方向必须与趋势周期方向一致

use crate::engine::cross::{find_recent_cross, trend_state};
use crate::engine::events::Direction;
use serde::{Deserialize, Serialize};

/// 趋势周期方向的读取方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendMode {
    /// 最新一根上两条均线的相对位置
    #[default]
    State,
    /// 回看窗口内最近一次交叉的方向
    Cross,
}

pub fn confirms(fast: Option<Direction>, slow: Option<Direction>) -> bool {
    matches!((fast, slow), (Some(f), Some(s)) if f == s)
}

/// 读取趋势周期方向
pub fn slow_direction(a: &[f64], b: &[f64], mode: TrendMode, lookback: usize) -> Option<Direction> {
    match mode {
        TrendMode::State => trend_state(a, b),
        TrendMode::Cross => find_recent_cross(a, b, lookback).map(|c| c.direction),
    }
}
