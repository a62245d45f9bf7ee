// src/engine/events.rs
use crate::klcommon::SentimentRatio;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 交叉方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    /// 建议操作
    pub fn action(&self) -> &'static str {
        match self {
            Direction::Up => "BUY",
            Direction::Down => "SELL",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Up => write!(f, "up"),
            Direction::Down => write!(f, "down"),
        }
    }
}

/// 均线末端曲率（斜率变化）标签
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Curvature {
    RisingSharp,
    FallingSharp,
    Flat,
}

impl fmt::Display for Curvature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Curvature::RisingSharp => write!(f, "rising-sharp"),
            Curvature::FallingSharp => write!(f, "falling-sharp"),
            Curvature::Flat => write!(f, "flat"),
        }
    }
}

/// 一组用于交叉检测的EMA（短周期 / 长周期）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndicatorPair {
    pub short_period: usize,
    pub long_period: usize,
}

impl IndicatorPair {
    pub const fn new(short_period: usize, long_period: usize) -> Self {
        Self { short_period, long_period }
    }
}

impl fmt::Display for IndicatorPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EMA{}/EMA{}", self.short_period, self.long_period)
    }
}

/// 一次交叉事件，检测后立即消费，不做持久化
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrossEvent {
    pub pair: IndicatorPair,
    pub direction: Direction,
    /// 距最新一根K线的根数，0 表示最新一根
    pub bars_ago: usize,
    /// 交叉发生的K线在序列中的索引
    pub bar_index: usize,
}

/// 信号类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalKind {
    /// 入场周期交叉，需要趋势周期确认
    Entry,
    /// 趋势周期自身的交叉
    Trend,
}

/// 止盈止损估算
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TradeLevels {
    pub take_profit: f64,
    pub stop_loss: f64,
}

/// 候选信号：交叉事件 + 所在交易对/周期的行情与指标快照
#[derive(Debug, Clone, PartialEq)]
pub struct SignalCandidate {
    pub symbol: String,
    pub interval: String,
    pub kind: SignalKind,
    pub event: CrossEvent,
    /// 交叉所在K线的开盘时间
    pub bar_open_time: i64,
    pub price: f64,
    /// 短周期EMA最新值
    pub short_value: f64,
    /// 长周期EMA最新值
    pub long_value: f64,
    pub volume: f64,
    pub rsi: f64,
    pub short_curvature: Option<Curvature>,
    pub long_curvature: Option<Curvature>,
    /// 趋势周期方向（仅入场信号使用）
    pub slow_direction: Option<Direction>,
    pub levels: Option<TradeLevels>,
    pub sentiment: Option<SentimentRatio>,
}

impl SignalCandidate {
    pub fn dedup_key(&self) -> DedupKey {
        DedupKey {
            symbol: self.symbol.clone(),
            interval: self.interval.clone(),
            pair: self.event.pair,
            direction: self.event.direction,
            bar_open_time: self.bar_open_time,
        }
    }
}

/// 去重键。K线以开盘时间标识，后续扫描中 bars_ago 增大时仍映射到同一个键。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupKey {
    pub symbol: String,
    pub interval: String,
    pub pair: IndicatorPair,
    pub direction: Direction,
    pub bar_open_time: i64,
}

impl fmt::Display for DedupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}|{}|{}|{}|{}",
            self.symbol, self.interval, self.pair, self.direction, self.bar_open_time
        )
    }
}
