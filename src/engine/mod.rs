// src/engine/mod.rs
pub mod confirm;
pub mod cross;
pub mod dedup;
pub mod events;
pub mod indicators;
pub mod levels;
pub mod validator;


use std::collections::BTreeMap;
use std::sync::Arc;

use crate::klcommon::config::SignalConfig;
use crate::klcommon::{AppError, CandleSeries, MarketDataSource, Result};
use crate::notify::NotificationDispatcher;
use crate::scheduler::RunController;
use confirm::{confirms, slow_direction};
use cross::find_recent_cross;

pub use events::{
    CrossEvent, Curvature, DedupKey, Direction, IndicatorPair, SignalCandidate, SignalKind, TradeLevels,
};
use indicators::{compute_curvature, compute_ema, compute_rsi};
use tracing::{debug, info, instrument, warn};
use validator::ValidationRules;

const LOG_TARGET: &str = "信号引擎";

/// 单个交易对单个周期的指标快照，只在一次评估内存活
#[derive(Debug, Clone)]
pub struct IndicatorSnapshot {
    emas: BTreeMap<usize, Vec<f64>>,
    pub rsi: f64,
}

impl IndicatorSnapshot {
    /// 计算配置中用到的全部EMA与RSI，K线数量不足时返回 InsufficientData
    pub fn compute(series: &CandleSeries, config: &SignalConfig) -> Result<Self> {
        let needed = config.min_required_bars();
        if series.len() < needed {
            return Err(AppError::InsufficientData { needed, actual: series.len() });
        }

        let closes = series.closes();
        let mut emas = BTreeMap::new();
        for period in config.ema_periods() {
            emas.insert(period, compute_ema(&closes, period)?);
        }
        let rsi = compute_rsi(&closes, config.rsi_period)?;

        Ok(Self { emas, rsi })
    }

    pub fn ema(&self, period: usize) -> Result<&[f64]> {
        self.emas
            .get(&period)
            .map(Vec::as_slice)
            .ok_or_else(|| AppError::ConfigError(format!("未计算 EMA{}", period)))
    }

    fn pair(&self, pair: IndicatorPair) -> Result<(&[f64], &[f64])> {
        Ok((self.ema(pair.short_period)?, self.ema(pair.long_period)?))
    }
}

/// 对一条K线序列上的一组均线做交叉检测，命中时组装候选信号
fn build_candidate(
    series: &CandleSeries,
    snapshot: &IndicatorSnapshot,
    pair: IndicatorPair,
    kind: SignalKind,
    config: &SignalConfig,
) -> Result<Option<SignalCandidate>> {
    let (short, long) = snapshot.pair(pair)?;

    let Some(crossing) = find_recent_cross(short, long, config.lookback) else {
        return Ok(None);
    };
    let (Some(last), Some(cross_bar)) = (series.last(), series.candles().get(crossing.bar_index)) else {
        return Ok(None);
    };

    let event = crossing.into_event(pair);
    let levels = match kind {
        SignalKind::Entry => levels::compute_trade_levels(series.candles(), event.direction, last.close, config),
        SignalKind::Trend => None,
    };

    Ok(Some(SignalCandidate {
        symbol: series.symbol().to_string(),
        interval: series.interval().to_string(),
        kind,
        event,
        bar_open_time: cross_bar.open_time,
        price: last.close,
        short_value: short.last().copied().unwrap_or(f64::NAN),
        long_value: long.last().copied().unwrap_or(f64::NAN),
        volume: last.volume,
        rsi: snapshot.rsi,
        short_curvature: compute_curvature(short, config.curvature_threshold),
        long_curvature: compute_curvature(long, config.curvature_threshold),
        slow_direction: None,
        levels,
        sentiment: None,
    }))
}

/// 从入场周期和趋势周期的K线中找出全部候选信号（尚未校验、确认与去重）
///
/// 入场周期上每组 `entry_pairs` 最多产生一个 Entry 候选，并带上趋势周期方向；
/// `emit_trend_signals` 打开时，趋势周期自身的 `trend_pair` 交叉产生一个 Trend 候选。
pub fn detect_candidates(
    config: &SignalConfig,
    fast: &CandleSeries,
    slow: &CandleSeries,
) -> Result<Vec<SignalCandidate>> {
    let fast_snapshot = IndicatorSnapshot::compute(fast, config)?;
    let slow_snapshot = IndicatorSnapshot::compute(slow, config)?;

    let (trend_short, trend_long) = slow_snapshot.pair(config.trend_pair)?;
    let slow_dir = slow_direction(trend_short, trend_long, config.trend_mode, config.lookback);

    let mut candidates = Vec::new();

    for &pair in &config.entry_pairs {
        if let Some(mut candidate) = build_candidate(fast, &fast_snapshot, pair, SignalKind::Entry, config)? {
            candidate.slow_direction = slow_dir;
            candidates.push(candidate);
        }
    }

    if config.emit_trend_signals {
        if let Some(candidate) =
            build_candidate(slow, &slow_snapshot, config.trend_pair, SignalKind::Trend, config)?
        {
            candidates.push(candidate);
        }
    }

    Ok(candidates)
}

/// 信号引擎：逐个交易对执行 拉取 -> 指标 -> 交叉 -> 校验 -> 确认 -> 去重 -> 推送
pub struct SignalEngine {
    config: Arc<SignalConfig>,
    source: Arc<dyn MarketDataSource>,
    dispatcher: Arc<NotificationDispatcher>,
    controller: Arc<RunController>,
    rules: ValidationRules,
}

impl SignalEngine {
    pub fn new(
        config: Arc<SignalConfig>,
        source: Arc<dyn MarketDataSource>,
        dispatcher: Arc<NotificationDispatcher>,
        controller: Arc<RunController>,
    ) -> Self {
        let rules = ValidationRules::from(config.as_ref());
        Self { config, source, dispatcher, controller, rules }
    }

    pub fn source(&self) -> &Arc<dyn MarketDataSource> {
        &self.source
    }

    /// 评估单个交易对，返回本次被接纳（已尝试推送）的信号数
    ///
    /// 数据获取与指标计算的错误向上返回，由调度器记录并跳过该交易对。
    /// 信号只登记到 `epoch` 轮次，轮次已切换时不再推送。推送失败不回滚去重账本。
    #[instrument(target = "信号引擎", skip_all, fields(symbol = %symbol, epoch = epoch))]
    pub async fn evaluate_pair(&self, symbol: &str, epoch: u64) -> Result<usize> {
        let config = &self.config;

        let (fast, slow) = tokio::try_join!(
            self.source.fetch_candles(symbol, &config.fast_interval, config.candle_limit),
            self.source.fetch_candles(symbol, &config.slow_interval, config.candle_limit),
        )?;

        let candidates = detect_candidates(config, &fast, &slow)?;
        let mut admitted = 0;

        for mut candidate in candidates {
            if let Err(e) = validator::validate(&candidate, &self.rules) {
                debug!(
                    target: LOG_TARGET,
                    pair = %candidate.event.pair,
                    interval = %candidate.interval,
                    error.summary = e.get_error_type_summary(),
                    error.details = %e,
                    "候选信号未通过校验"
                );
                continue;
            }

            if candidate.kind == SignalKind::Entry
                && !confirms(Some(candidate.event.direction), candidate.slow_direction)
            {
                debug!(
                    target: LOG_TARGET,
                    pair = %candidate.event.pair,
                    direction = %candidate.event.direction,
                    slow_direction = ?candidate.slow_direction,
                    "趋势周期方向不一致，忽略"
                );
                continue;
            }

            let key = candidate.dedup_key();
            if !self.controller.admit(epoch, key.clone()) {
                if self.controller.is_current(epoch) {
                    debug!(target: LOG_TARGET, key = %key, "信号已推送过，跳过");
                } else {
                    debug!(target: LOG_TARGET, key = %key, current_epoch = self.controller.epoch(), "运行轮次已切换，放弃旧轮次信号");
                }
                continue;
            }

            if config.sentiment_enabled {
                match self.source.fetch_sentiment(symbol, &config.sentiment_period).await {
                    Ok(ratio) => candidate.sentiment = Some(ratio),
                    Err(e) => warn!(
                        target: LOG_TARGET,
                        { error.summary = e.get_error_type_summary(),
                        error.details = %e },
                        "获取多空比失败，消息中使用占位符"
                    ),
                }
            }

            info!(
                target: LOG_TARGET,
                key = %key,
                kind = ?candidate.kind,
                bars_ago = candidate.event.bars_ago,
                price = candidate.price,
                "发现新信号"
            );

            self.dispatcher.dispatch(&candidate).await;
            admitted += 1;
        }

        Ok(admitted)
    }
}
