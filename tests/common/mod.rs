//! 集成测试共用的内存行情源与记录型推送渠道
#![allow(dead_code)]

use async_trait::async_trait;
use ema_signal_server::klcommon::api::interval_to_milliseconds;
use ema_signal_server::klcommon::{AppError, Candle, CandleSeries, MarketDataSource, Result, SentimentRatio};
use ema_signal_server::notify::Notifier;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

pub const BASE_TIME: i64 = 1_700_006_400_000;

/// EMA7 在倒数第二根上穿 EMA99
pub fn fast_buy_closes() -> Vec<f64> {
    (0..120)
        .map(|i| match i {
            i if i < 60 => 200.0,
            i if i < 90 => 200.0 - (i - 59) as f64 * (100.0 / 30.0),
            i if i < 118 => 100.0 + (i - 89) as f64 * 2.0,
            _ => 200.0,
        })
        .collect()
}

/// EMA25 始终在 EMA99 上方
pub fn slow_up_closes() -> Vec<f64> {
    (0..120).map(|i| 100.0 + i as f64 * 0.5).collect()
}

pub fn flat_closes() -> Vec<f64> {
    vec![100.0; 120]
}

pub fn series(symbol: &str, interval: &str, closes: &[f64]) -> CandleSeries {
    let step = interval_to_milliseconds(interval);
    let candles = closes
        .iter()
        .enumerate()
        .map(|(i, &close)| Candle {
            open_time: BASE_TIME + i as i64 * step,
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 1000.0,
        })
        .collect();
    CandleSeries::new(symbol, interval, candles).unwrap()
}

/// 按插入顺序返回交易对；`failing` 中的交易对拉取K线时报错
pub struct MockSource {
    pairs: Vec<String>,
    closes: HashMap<(String, String), Vec<f64>>,
    failing: HashSet<String>,
    started: Instant,
    /// 每次拉取K线的模拟耗时
    fetch_delay: Duration,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    /// (交易对, 首次拉取K线距离创建的毫秒数)
    pub fetch_log: Mutex<Vec<(String, u128)>>,
}

impl MockSource {
    pub fn new() -> Self {
        Self {
            pairs: Vec::new(),
            closes: HashMap::new(),
            failing: HashSet::new(),
            started: Instant::now(),
            fetch_delay: Duration::ZERO,
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
            fetch_log: Mutex::new(Vec::new()),
        }
    }

    pub fn with_fetch_delay(mut self, delay: Duration) -> Self {
        self.fetch_delay = delay;
        self
    }

    /// 同时进行中的K线请求数的最大值
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    pub fn with(mut self, symbol: &str, fast: Vec<f64>, slow: Vec<f64>) -> Self {
        self.pairs.push(symbol.to_string());
        self.closes.insert((symbol.to_string(), "15m".to_string()), fast);
        self.closes.insert((symbol.to_string(), "1h".to_string()), slow);
        self
    }

    pub fn with_failing(mut self, symbol: &str) -> Self {
        self.pairs.push(symbol.to_string());
        self.failing.insert(symbol.to_string());
        self
    }

    pub fn first_fetch_ms(&self, symbol: &str) -> Option<u128> {
        self.fetch_log
            .lock()
            .unwrap()
            .iter()
            .find(|(s, _)| s == symbol)
            .map(|(_, ms)| *ms)
    }
}

#[async_trait]
impl MarketDataSource for MockSource {
    async fn list_pairs(&self, quote_suffix: &str, cap: usize) -> Result<Vec<String>> {
        Ok(self
            .pairs
            .iter()
            .filter(|p| p.ends_with(quote_suffix))
            .take(cap)
            .cloned()
            .collect())
    }

    async fn fetch_candles(&self, symbol: &str, interval: &str, _limit: usize) -> Result<CandleSeries> {
        self.fetch_log
            .lock()
            .unwrap()
            .push((symbol.to_string(), self.started.elapsed().as_millis()));

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(current, Ordering::SeqCst);
        if !self.fetch_delay.is_zero() {
            tokio::time::sleep(self.fetch_delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing.contains(symbol) {
            return Err(AppError::UpstreamFetchError(format!("{} 模拟超时", symbol)));
        }

        self.closes
            .get(&(symbol.to_string(), interval.to_string()))
            .map(|closes| series(symbol, interval, closes))
            .ok_or_else(|| AppError::DataError(format!("{} {} 无数据", symbol, interval)))
    }

    async fn fetch_sentiment(&self, _symbol: &str, _period: &str) -> Result<SentimentRatio> {
        Ok(SentimentRatio { long_short_ratio: 1.25, long_account: 0.5556, short_account: 0.4444 })
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<String>>,
    pub fail: bool,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self { fail: true, ..Self::default() }
    }

    pub fn messages(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_text(&self, text: &str) -> Result<()> {
        self.sent.lock().unwrap().push(text.to_string());
        if self.fail {
            return Err(AppError::DispatchFailure("channel down".to_string()));
        }
        Ok(())
    }
}
