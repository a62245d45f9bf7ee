use crate::klcommon::config::ApiConfig;
use crate::klcommon::models::{Candle, CandleSeries, ExchangeInfo, RawSentimentRatio, SentimentRatio};
use crate::klcommon::{AppError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn, Instrument};

/// 将时间间隔转换为毫秒数
/// 例如: "15m" -> 900000, "1h" -> 3600000，无法识别时返回 0
pub fn interval_to_milliseconds(interval: &str) -> i64 {
    let Some(last_char) = interval.chars().last() else {
        return 0;
    };
    let Ok(value) = interval[..interval.len() - last_char.len_utf8()].parse::<i64>() else {
        return 0;
    };

    match last_char {
        'm' => value * 60 * 1000,               // 分钟
        'h' => value * 60 * 60 * 1000,          // 小时
        'd' => value * 24 * 60 * 60 * 1000,     // 天
        'w' => value * 7 * 24 * 60 * 60 * 1000, // 周
        _ => 0,
    }
}

/// 行情数据来源。扫描调度与信号引擎只依赖这个接口，测试中可替换为内存实现。
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// 获取计价资产后缀匹配、正在交易的交易对，最多 `cap` 个
    async fn list_pairs(&self, quote_suffix: &str, cap: usize) -> Result<Vec<String>>;

    /// 获取按时间升序排列的K线
    async fn fetch_candles(&self, symbol: &str, interval: &str, limit: usize) -> Result<CandleSeries>;

    /// 获取最新的多空账户比
    async fn fetch_sentiment(&self, symbol: &str, period: &str) -> Result<SentimentRatio>;
}

/// 币安API客户端
#[derive(Clone, Debug)]
pub struct BinanceApi {
    spot_api_url: String,
    futures_api_url: String,
    client: Client,
    max_retries: usize,
    retry_interval: Duration,
}

impl BinanceApi {
    /// 创建新的API客户端实例
    #[instrument(skip_all, fields(spot = %config.spot_api_url, futures = %config.futures_api_url))]
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let client = Self::create_client(config)?;
        info!(target: "api", log_type = "module", "🌐 初始化币安API客户端，端点: {} / {}", config.spot_api_url, config.futures_api_url);

        Ok(Self {
            spot_api_url: config.spot_api_url.trim_end_matches('/').to_string(),
            futures_api_url: config.futures_api_url.trim_end_matches('/').to_string(),
            client,
            max_retries: config.max_retries.max(1),
            retry_interval: Duration::from_millis(config.retry_interval_ms),
        })
    }

    /// 创建带超时（以及可选代理）的HTTP客户端，通知渠道也复用这份配置
    pub fn create_client(config: &ApiConfig) -> Result<Client> {
        let client_builder = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs));

        let client = match &config.proxy {
            Some(proxy_config) => {
                let proxy_url = proxy_config.get_url();
                match reqwest::Proxy::all(&proxy_url) {
                    Ok(proxy) => client_builder
                        .proxy(proxy)
                        .build()
                        .map_err(|e| AppError::ConfigError(format!("创建带代理的HTTP客户端失败: {}", e)))?,
                    Err(e) => {
                        warn!(target: "api", log_type = "module", "设置代理失败，将尝试直接连接: {} - {}", proxy_url, e);
                        client_builder
                            .build()
                            .map_err(|e| AppError::ConfigError(format!("创建HTTP客户端失败: {}", e)))?
                    }
                }
            }
            None => client_builder
                .build()
                .map_err(|e| AppError::ConfigError(format!("创建HTTP客户端失败: {}", e)))?,
        };

        Ok(client)
    }

    /// 发送GET请求并返回响应文本，非2xx状态视为上游错误
    async fn get_text(&self, url: &str, query: &[(&str, String)]) -> Result<String> {
        let response = match self.client.get(url).query(query).send().await {
            Ok(resp) => resp,
            Err(e) => {
                let http_error = AppError::from(e);
                error!(
                    target: "api",
                    message = "HTTP请求失败",
                    url = %url,
                    error.summary = http_error.get_error_type_summary(),
                    error.details = %http_error
                );
                return Err(http_error);
            }
        };

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let api_error = AppError::UpstreamFetchError(format!(
                "{} 返回 {} - {}",
                url,
                status,
                text.chars().take(300).collect::<String>()
            ));
            error!(
                target: "api",
                message = "API响应状态错误",
                url = %url,
                status = %status,
                error.summary = api_error.get_error_type_summary(),
                error.details = %api_error
            );
            return Err(api_error);
        }

        Ok(text)
    }

    /// 获取交易所信息
    #[instrument(skip(self), err)]
    pub async fn get_exchange_info(&self) -> Result<ExchangeInfo> {
        let url = format!("{}/api/v3/exchangeInfo", self.spot_api_url);
        debug!(target: "api", "发送获取交易所信息请求: {}", url);

        let response_text = self.get_text(&url, &[]).await?;

        let exchange_info: ExchangeInfo = serde_json::from_str(&response_text).map_err(|e| {
            error!(target: "api", log_type = "module", "解析交易所信息JSON失败: {}, 响应前500个字符: {}",
                e, response_text.chars().take(500).collect::<String>());
            AppError::JsonError(e)
        })?;

        debug!(target: "api", symbol_count = exchange_info.symbols.len(), "成功解析交易所信息");
        Ok(exchange_info)
    }

    /// 从交易所信息中筛选交易对
    ///
    /// 条件：以 `quote_suffix` 结尾，状态为 TRADING；按交易所返回顺序截取前 `cap` 个。
    pub fn filter_pairs(info: &ExchangeInfo, quote_suffix: &str, cap: usize) -> Vec<String> {
        info.symbols
            .iter()
            .filter(|s| s.symbol.ends_with(quote_suffix) && s.status == "TRADING")
            .take(cap)
            .map(|s| s.symbol.clone())
            .collect()
    }
}

#[async_trait]
impl MarketDataSource for BinanceApi {
    /// 获取交易对列表，失败或结果为空时按配置重试
    #[instrument(skip(self), err)]
    async fn list_pairs(&self, quote_suffix: &str, cap: usize) -> Result<Vec<String>> {
        let max_retries = self.max_retries;

        let retry_loop_span = tracing::info_span!(
            "exchange_info_retry_loop",
            max_retries,
            retry_interval_ms = self.retry_interval.as_millis() as u64
        );

        async {
            let mut last_error = None;

            for retry in 0..max_retries {
                match self.get_exchange_info().await {
                    Ok(info) => {
                        let pairs = Self::filter_pairs(&info, quote_suffix, cap);
                        if !pairs.is_empty() || cap == 0 {
                            info!(target: "api", log_type = "module", "获取 {} 交易对成功，共 {} 个", quote_suffix, pairs.len());
                            return Ok(pairs);
                        }
                        warn!(target: "api", log_type = "module", "过滤后没有 {} 交易对 (尝试 {}/{})", quote_suffix, retry + 1, max_retries);
                        last_error = Some(AppError::UpstreamFetchError(format!("没有找到以 {} 结尾的交易对", quote_suffix)));
                    }
                    Err(e) => {
                        error!(
                            target: "api",
                            message = "获取交易所信息失败",
                            attempt = retry + 1,
                            max_retries,
                            error.summary = e.get_error_type_summary(),
                            error.details = %e
                        );
                        last_error = Some(e);
                    }
                }

                if retry + 1 < max_retries {
                    tokio::time::sleep(self.retry_interval).await;
                }
            }

            let reason = last_error.map(|e| e.to_string()).unwrap_or_default();
            error!(target: "api", log_type = "module", "❌ 获取交易对失败，已重试{}次: {}", max_retries, reason);
            Err(AppError::UpstreamFetchError(format!("获取交易对失败，已重试{}次: {}", max_retries, reason)))
        }
        .instrument(retry_loop_span)
        .await
    }

    #[instrument(skip(self), fields(symbol = %symbol, interval = %interval), err)]
    async fn fetch_candles(&self, symbol: &str, interval: &str, limit: usize) -> Result<CandleSeries> {
        let url = format!("{}/api/v3/klines", self.spot_api_url);
        let query = [
            ("symbol", symbol.to_string()),
            ("interval", interval.to_string()),
            ("limit", limit.to_string()),
        ];

        let response_text = self.get_text(&url, &query).await?;

        let raw_klines: Vec<Vec<Value>> = serde_json::from_str(&response_text).map_err(|e| {
            error!(target: "api", log_type = "module", "{}/{}: 解析K线JSON失败: {}", symbol, interval, e);
            AppError::JsonError(e)
        })?;

        if raw_klines.is_empty() {
            return Err(AppError::DataError(format!("{}/{}: 接口返回空K线", symbol, interval)));
        }

        let candles: Vec<Candle> = raw_klines.iter().filter_map(|raw| Candle::from_raw_kline(raw)).collect();

        if candles.len() != raw_klines.len() {
            warn!(
                target: "api",
                symbol = %symbol,
                interval = %interval,
                parsed_count = candles.len(),
                raw_count = raw_klines.len(),
                "部分K线数据解析失败，可能存在格式问题"
            );
        }

        CandleSeries::new(symbol, interval, candles)
    }

    #[instrument(skip(self), fields(symbol = %symbol), err)]
    async fn fetch_sentiment(&self, symbol: &str, period: &str) -> Result<SentimentRatio> {
        let url = format!("{}/futures/data/globalLongShortAccountRatio", self.futures_api_url);
        let query = [
            ("symbol", symbol.to_string()),
            ("period", period.to_string()),
            ("limit", "1".to_string()),
        ];

        let response_text = self.get_text(&url, &query).await?;
        let raw: Vec<RawSentimentRatio> = serde_json::from_str(&response_text)?;

        raw.last()
            .ok_or_else(|| AppError::DataError(format!("{}: 多空比接口返回空结果", symbol)))?
            .parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::klcommon::models::SymbolInfo;

    #[test]
    fn test_interval_to_milliseconds() {
        assert_eq!(interval_to_milliseconds("15m"), 900_000);
        assert_eq!(interval_to_milliseconds("1h"), 3_600_000);
        assert_eq!(interval_to_milliseconds("1d"), 86_400_000);
        assert_eq!(interval_to_milliseconds("1w"), 604_800_000);
        assert_eq!(interval_to_milliseconds(""), 0);
        assert_eq!(interval_to_milliseconds("h"), 0);
        assert_eq!(interval_to_milliseconds("5x"), 0);
    }

    #[test]
    fn test_filter_pairs_applies_suffix_status_and_cap() {
        let symbol = |name: &str, status: &str| SymbolInfo {
            symbol: name.to_string(),
            status: status.to_string(),
        };
        let info = ExchangeInfo {
            symbols: vec![
                symbol("BTCUSDT", "TRADING"),
                symbol("ETHBTC", "TRADING"),
                symbol("LUNAUSDT", "BREAK"),
                symbol("ETHUSDT", "TRADING"),
                symbol("BNBUSDT", "TRADING"),
            ],
        };

        assert_eq!(BinanceApi::filter_pairs(&info, "USDT", 10), vec!["BTCUSDT", "ETHUSDT", "BNBUSDT"]);
        assert_eq!(BinanceApi::filter_pairs(&info, "USDT", 2), vec!["BTCUSDT", "ETHUSDT"]);
        assert!(BinanceApi::filter_pairs(&info, "USDT", 0).is_empty());
    }
}
