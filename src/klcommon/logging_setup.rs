//! 统一日志系统初始化模块
//!
//! 控制台输出 + 按天滚动的文件日志，`log` 宏产生的第三方库日志通过 LogTracer 桥接到 tracing。

use crate::klcommon::config::LoggingConfig;
use crate::klcommon::{AppError, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

const LOG_TARGET: &str = "日志系统";

/// 构建过滤器：RUST_LOG 优先，否则使用配置中的级别，并压低HTTP栈的噪音
pub fn build_env_filter(log_level: &str) -> EnvFilter {
    let business_filter_str = format!("{},hyper=warn,reqwest=warn,h2=warn", log_level);
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(business_filter_str))
}

/// 初始化日志系统。返回的 guard 必须由 main 持有，drop 时刷新文件日志。
pub fn init_logging(config: &LoggingConfig) -> Result<WorkerGuard> {
    std::fs::create_dir_all(&config.log_dir)
        .map_err(|e| AppError::ConfigError(format!("无法创建日志目录 {}: {}", config.log_dir, e)))?;

    let file_appender = tracing_appender::rolling::daily(&config.log_dir, &config.file_prefix);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // 条件层使用 Option<Layer>，None 时为无操作
    let (json_file_layer, plain_file_layer) = if config.json_format {
        (Some(fmt::layer().json().with_writer(non_blocking)), None)
    } else {
        (None, Some(fmt::layer().with_ansi(false).with_target(true).with_writer(non_blocking)))
    };

    let console_layer = config
        .enable_console_output
        .then(|| fmt::layer().with_target(true).with_level(true));

    Registry::default()
        .with(build_env_filter(&config.log_level))
        .with(console_layer)
        .with(json_file_layer)
        .with(plain_file_layer)
        .try_init()
        .map_err(|e| AppError::ConfigError(format!("日志订阅器初始化失败: {}", e)))?;

    // tracing-subscriber 默认特性通常已安装 LogTracer，这里失败是正常情况
    if let Err(e) = tracing_log::LogTracer::init_with_filter(log::LevelFilter::Warn) {
        tracing::debug!(target: LOG_TARGET, error = %e, "log桥接器已存在，跳过初始化");
    }

    tracing::info!(
        target: LOG_TARGET,
        log_level = %config.log_level,
        log_dir = %config.log_dir,
        json = config.json_format,
        "统一日志系统初始化完成"
    );

    Ok(guard)
}
