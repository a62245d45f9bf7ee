use crate::klcommon::{AppError, Result};
use serde::{Deserialize, Serialize};

/// 单根K线（已解析为浮点数）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// K线开盘时间（毫秒时间戳）
    pub open_time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    /// 从币安原始K线数组创建K线对象
    ///
    /// 币安返回 `[openTime, "open", "high", "low", "close", "volume", closeTime, ...]`，
    /// 价格与成交量都是字符串。
    pub fn from_raw_kline(raw: &[serde_json::Value]) -> Option<Self> {
        if raw.len() < 6 {
            return None;
        }

        let parse = |v: &serde_json::Value| -> Option<f64> {
            match v {
                serde_json::Value::String(s) => s.parse().ok(),
                serde_json::Value::Number(n) => n.as_f64(),
                _ => None,
            }
        };

        Some(Self {
            open_time: raw[0].as_i64()?,
            open: parse(&raw[1])?,
            high: parse(&raw[2])?,
            low: parse(&raw[3])?,
            close: parse(&raw[4])?,
            volume: parse(&raw[5])?,
        })
    }
}

/// 某个交易对在某个周期上的K线序列，按开盘时间严格递增
#[derive(Debug, Clone, PartialEq)]
pub struct CandleSeries {
    symbol: String,
    interval: String,
    candles: Vec<Candle>,
}

impl CandleSeries {
    /// 创建K线序列，开盘时间必须严格递增
    pub fn new(symbol: impl Into<String>, interval: impl Into<String>, candles: Vec<Candle>) -> Result<Self> {
        let symbol = symbol.into();
        let interval = interval.into();

        if let Some(pos) = candles.windows(2).position(|w| w[1].open_time <= w[0].open_time) {
            return Err(AppError::DataError(format!(
                "{}/{}: K线开盘时间不是严格递增 (索引 {}: {} -> {})",
                symbol,
                interval,
                pos + 1,
                candles[pos].open_time,
                candles[pos + 1].open_time
            )));
        }

        Ok(Self { symbol, interval, candles })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn interval(&self) -> &str {
        &self.interval
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn last(&self) -> Option<&Candle> {
        self.candles.last()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.close).collect()
    }
}

/// 交易所信息（只保留用到的字段）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeInfo {
    pub symbols: Vec<SymbolInfo>,
}

/// 交易对
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolInfo {
    pub symbol: String,
    #[serde(default)]
    pub status: String,
}

/// 多空账户比
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SentimentRatio {
    pub long_short_ratio: f64,
    /// 多头账户占比 (0..1)
    pub long_account: f64,
    /// 空头账户占比 (0..1)
    pub short_account: f64,
}

/// 币安 `globalLongShortAccountRatio` 的原始响应项，数值是字符串
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSentimentRatio {
    pub symbol: String,
    pub long_short_ratio: String,
    pub long_account: String,
    pub short_account: String,
}

impl RawSentimentRatio {
    pub fn parse(&self) -> Result<SentimentRatio> {
        let field = |name: &str, v: &str| -> Result<f64> {
            v.parse::<f64>()
                .map_err(|e| AppError::DataError(format!("{}: 无法解析多空比字段 {}={}: {}", self.symbol, name, v, e)))
        };

        Ok(SentimentRatio {
            long_short_ratio: field("longShortRatio", &self.long_short_ratio)?,
            long_account: field("longAccount", &self.long_account)?,
            short_account: field("shortAccount", &self.short_account)?,
        })
    }
}
