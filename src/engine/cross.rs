//! 交叉检测

use crate::engine::events::{CrossEvent, Direction, IndicatorPair};

/// 在回看窗口内找到的交叉
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Crossing {
    pub direction: Direction,
    pub bars_ago: usize,
    pub bar_index: usize,
}

impl Crossing {
    pub fn into_event(self, pair: IndicatorPair) -> CrossEvent {
        CrossEvent {
            pair,
            direction: self.direction,
            bars_ago: self.bars_ago,
            bar_index: self.bar_index,
        }
    }
}

/// 在最近 `lookback` 个相邻点对中按时间顺序查找 `a - b` 的变号
///
/// 返回窗口内最早的一次交叉，`bars_ago = n - 1 - i`。两条序列按较短者对齐。
/// 相等不算交叉：要求 `a[i-1] < b[i-1] && a[i] > b[i]`（上穿）或其镜像（下穿）。
pub fn find_recent_cross(a: &[f64], b: &[f64], lookback: usize) -> Option<Crossing> {
    let n = a.len().min(b.len());
    if n < 2 || lookback == 0 {
        return None;
    }

    let start = n.saturating_sub(lookback).max(1);

    (start..n).find_map(|i| {
        let direction = if a[i - 1] < b[i - 1] && a[i] > b[i] {
            Direction::Up
        } else if a[i - 1] > b[i - 1] && a[i] < b[i] {
            Direction::Down
        } else {
            return None;
        };

        Some(Crossing { direction, bars_ago: n - 1 - i, bar_index: i })
    })
}

/// 最新一根上 `a` 相对 `b` 的位置，相等或无数据时返回 None
pub fn trend_state(a: &[f64], b: &[f64]) -> Option<Direction> {
    let n = a.len().min(b.len());
    if n == 0 {
        return None;
    }

    let diff = a[n - 1] - b[n - 1];
    if diff > 0.0 {
        Some(Direction::Up)
    } else if diff < 0.0 {
        Some(Direction::Down)
    } else {
        None
    }
}
