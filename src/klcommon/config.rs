//! 信号服务配置模块

use crate::engine::confirm::TrendMode;
use crate::engine::events::IndicatorPair;
use crate::klcommon::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 系统配置常量
pub mod constants {
    /// 默认配置文件路径
    pub const DEFAULT_CONFIG_PATH: &str = "config/SignalBotConfig.toml";

    /// 币安现货API端点（交易对列表与K线）
    pub const DEFAULT_SPOT_API_URL: &str = "https://api.binance.com";

    /// 币安U本位合约API端点（多空比）
    pub const DEFAULT_FUTURES_API_URL: &str = "https://fapi.binance.com";

    /// Telegram Bot API端点
    pub const DEFAULT_TELEGRAM_API_URL: &str = "https://api.telegram.org";

    /// 每次拉取的K线数量
    pub const DEFAULT_CANDLE_LIMIT: usize = 120;

    /// 币安单次K线请求的上限
    pub const MAX_CANDLE_LIMIT: usize = 1000;

    /// 默认每批交易对数量
    pub const DEFAULT_BATCH_SIZE: usize = 50;

    /// 交叉检测的回看窗口（根）
    pub const DEFAULT_LOOKBACK: usize = 10;

    /// 曲率判定阈值（斜率差）
    pub const DEFAULT_CURVATURE_THRESHOLD: f64 = 0.0001;
}

use constants::*;

/// 代理类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProxyType {
    Http,
    Socks5,
}

/// 代理配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProxyConfig {
    pub proxy_type: ProxyType,
    pub host: String,
    pub port: u16,
}

impl ProxyConfig {
    /// 获取完整的代理URL
    pub fn get_url(&self) -> String {
        match self.proxy_type {
            ProxyType::Http => format!("http://{}:{}", self.host, self.port),
            ProxyType::Socks5 => format!("socks5://{}:{}", self.host, self.port),
        }
    }
}

/// 信号服务总配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// 行情接口配置
    pub api: ApiConfig,

    /// 通知渠道配置
    pub telegram: TelegramConfig,

    /// 扫描调度配置
    pub scan: ScanConfig,

    /// 信号检测配置
    pub signal: SignalConfig,

    /// Web服务配置
    pub web: WebConfig,

    /// 日志配置
    pub logging: LoggingConfig,
}

/// 行情接口配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub spot_api_url: String,
    pub futures_api_url: String,

    /// 单次请求超时（秒）
    pub request_timeout_secs: u64,

    /// 连接超时（秒）
    pub connect_timeout_secs: u64,

    /// 获取交易对列表的最大重试次数
    pub max_retries: usize,

    /// 重试间隔（毫秒）
    pub retry_interval_ms: u64,

    /// 可选代理，不配置则直连
    pub proxy: Option<ProxyConfig>,
}

/// Telegram 配置，token 与 chat_id 通常通过环境变量提供
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    pub api_url: String,
    pub bot_token: Option<String>,
    pub chat_id: Option<String>,
}

/// 扫描调度配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// 交易对后缀过滤（计价资产）
    pub quote_suffix: String,

    /// 未指定数量时扫描的交易对数
    pub default_pair_count: usize,

    /// 单次扫描交易对数量上限
    pub max_pair_count: usize,

    /// 每批交易对数量
    pub batch_size: usize,

    /// 批内并发上限
    pub max_concurrency: usize,

    /// 批次之间的固定等待（毫秒）
    pub inter_batch_delay_ms: u64,

    /// 自动扫描间隔（秒），0 表示只响应手动触发
    pub auto_scan_interval_secs: u64,

    /// 启动时是否处于运行状态
    pub start_running: bool,
}

/// 信号检测配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalConfig {
    /// 入场周期
    pub fast_interval: String,

    /// 趋势周期
    pub slow_interval: String,

    /// 每个周期拉取的K线数量
    pub candle_limit: usize,

    /// 入场周期上检测的EMA组合
    pub entry_pairs: Vec<IndicatorPair>,

    /// 趋势周期上用于确认方向的EMA组合
    pub trend_pair: IndicatorPair,

    /// 趋势方向读取方式
    pub trend_mode: TrendMode,

    /// 趋势周期自身发生交叉时是否推送趋势确认消息
    pub emit_trend_signals: bool,

    pub rsi_period: usize,

    /// 交叉检测回看窗口（根）
    pub lookback: usize,

    pub curvature_threshold: f64,

    /// 成交量必须严格大于该值
    pub min_volume: f64,

    /// 两条均线曲率都为 flat 时拒绝
    pub reject_flat_curvature: bool,

    /// 止盈距离 = 止损距离 × 该比例
    pub reward_ratio: f64,

    /// 止盈距离下限（价格百分比）
    pub min_profit_pct: f64,

    /// 是否拉取多空比
    pub sentiment_enabled: bool,

    /// 多空比统计周期
    pub sentiment_period: String,
}

/// Web服务配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    pub bind_addr: String,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 日志级别 (trace, debug, info, warn, error)，RUST_LOG 优先
    pub log_level: String,

    /// 日志文件目录
    pub log_dir: String,

    /// 日志文件名前缀（按天滚动）
    pub file_prefix: String,

    /// 文件日志是否使用JSON格式
    pub json_format: bool,

    /// 是否启用控制台输出
    pub enable_console_output: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            spot_api_url: DEFAULT_SPOT_API_URL.to_string(),
            futures_api_url: DEFAULT_FUTURES_API_URL.to_string(),
            request_timeout_secs: 10,
            connect_timeout_secs: 5,
            max_retries: 5,
            retry_interval_ms: 1000,
            proxy: None,
        }
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_TELEGRAM_API_URL.to_string(),
            bot_token: None,
            chat_id: None,
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            quote_suffix: "USDT".to_string(),
            default_pair_count: 1000,
            max_pair_count: 1000,
            batch_size: DEFAULT_BATCH_SIZE,
            max_concurrency: 5,
            inter_batch_delay_ms: 1000,
            auto_scan_interval_secs: 0,
            start_running: true,
        }
    }
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            fast_interval: "15m".to_string(),
            slow_interval: "1h".to_string(),
            candle_limit: DEFAULT_CANDLE_LIMIT,
            entry_pairs: vec![IndicatorPair::new(7, 25), IndicatorPair::new(7, 99)],
            trend_pair: IndicatorPair::new(25, 99),
            trend_mode: TrendMode::State,
            emit_trend_signals: true,
            rsi_period: 14,
            lookback: DEFAULT_LOOKBACK,
            curvature_threshold: DEFAULT_CURVATURE_THRESHOLD,
            min_volume: 0.0,
            reject_flat_curvature: false,
            reward_ratio: 2.0,
            min_profit_pct: 1.0,
            sentiment_enabled: true,
            sentiment_period: "15m".to_string(),
        }
    }
}

impl Default for WebConfig {
    fn default() -> Self {
        Self { bind_addr: "0.0.0.0:3000".to_string() }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_dir: "logs".to_string(),
            file_prefix: "signal_server.log".to_string(),
            json_format: false,
            enable_console_output: true,
        }
    }
}

impl SignalConfig {
    /// 所有需要计算的EMA周期（去重、升序）
    pub fn ema_periods(&self) -> Vec<usize> {
        let mut periods: Vec<usize> = self
            .entry_pairs
            .iter()
            .chain(std::iter::once(&self.trend_pair))
            .flat_map(|p| [p.short_period, p.long_period])
            .collect();
        periods.sort_unstable();
        periods.dedup();
        periods
    }

    /// 指标计算所需的最少K线数量：最长EMA周期 + 回看窗口
    pub fn min_required_bars(&self) -> usize {
        let longest = self.ema_periods().last().copied().unwrap_or(0);
        (longest + self.lookback).max(self.rsi_period + 1)
    }
}

impl AppConfig {
    /// 从文件加载配置
    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(AppError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 从TOML文本解析配置，并应用环境变量覆盖
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(content)
            .map_err(|e| AppError::ConfigError(format!("解析配置文件失败: {}", e)))?;

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// 配置文件存在则加载，否则使用默认配置（日志系统尚未初始化，只能用 eprintln）
    pub fn load_or_default(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            return Self::from_file(path);
        }

        eprintln!("配置文件不存在: {}，使用默认配置", path);
        let mut config = Self::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// 敏感信息允许通过环境变量覆盖
    pub fn apply_env_overrides(&mut self) {
        if let Ok(token) = std::env::var("TELEGRAM_BOT_TOKEN") {
            if !token.is_empty() {
                self.telegram.bot_token = Some(token);
            }
        }
        if let Ok(chat_id) = std::env::var("TELEGRAM_CHAT_ID") {
            if !chat_id.is_empty() {
                self.telegram.chat_id = Some(chat_id);
            }
        }
    }

    /// 验证配置的有效性
    pub fn validate(&self) -> Result<()> {
        let signal = &self.signal;

        for interval in [&signal.fast_interval, &signal.slow_interval] {
            if crate::klcommon::api::interval_to_milliseconds(interval) <= 0 {
                return Err(AppError::ConfigError(format!("无效的时间周期: {}", interval)));
            }
        }

        if signal.entry_pairs.is_empty() {
            return Err(AppError::ConfigError("入场EMA组合不能为空".to_string()));
        }

        for pair in signal.entry_pairs.iter().chain(std::iter::once(&signal.trend_pair)) {
            if pair.short_period == 0 || pair.short_period >= pair.long_period {
                return Err(AppError::ConfigError(format!(
                    "无效的EMA组合 {}: 短周期必须大于0且小于长周期",
                    pair
                )));
            }
        }

        if signal.rsi_period == 0 {
            return Err(AppError::ConfigError("RSI周期必须大于0".to_string()));
        }

        if signal.lookback == 0 {
            return Err(AppError::ConfigError("交叉回看窗口必须大于0".to_string()));
        }

        if signal.candle_limit > MAX_CANDLE_LIMIT {
            return Err(AppError::ConfigError(format!(
                "K线数量 {} 超过接口上限 {}",
                signal.candle_limit, MAX_CANDLE_LIMIT
            )));
        }

        if signal.candle_limit < signal.min_required_bars() {
            return Err(AppError::ConfigError(format!(
                "K线数量 {} 小于指标所需的最少数量 {}",
                signal.candle_limit,
                signal.min_required_bars()
            )));
        }

        if !(signal.curvature_threshold >= 0.0) {
            return Err(AppError::ConfigError("曲率阈值不能为负数".to_string()));
        }

        if !(signal.reward_ratio > 0.0) || !(signal.min_profit_pct >= 0.0) {
            return Err(AppError::ConfigError("止盈比例必须大于0，最小盈利百分比不能为负数".to_string()));
        }

        if self.scan.batch_size == 0 {
            return Err(AppError::ConfigError("批次大小必须大于0".to_string()));
        }

        if self.scan.max_concurrency == 0 {
            return Err(AppError::ConfigError("批内并发数必须大于0".to_string()));
        }

        if self.scan.max_pair_count == 0 {
            return Err(AppError::ConfigError("交易对数量上限必须大于0".to_string()));
        }

        if self.scan.quote_suffix.is_empty() {
            return Err(AppError::ConfigError("交易对后缀不能为空".to_string()));
        }

        if self.api.request_timeout_secs == 0 {
            return Err(AppError::ConfigError("请求超时必须大于0".to_string()));
        }

        Ok(())
    }
}
