//! 启动EMA交叉信号服务。
//!
//! - 加载配置并初始化日志（guard 由 main 持有到退出）。
//! - 启动 HTTP 接口：触发扫描、切换运行状态、查询进度、发送测试消息。
//! - `scan.auto_scan_interval_secs > 0` 时在后台按间隔自动扫描。

use anyhow::Result;
use clap::Parser;
use ema_signal_server::klcommon::config::constants::DEFAULT_CONFIG_PATH;
use ema_signal_server::klcommon::logging_setup::init_logging;
use ema_signal_server::klcommon::AppConfig;
use ema_signal_server::klserver::start_web_server;
use ema_signal_server::service::SignalService;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, Instrument};

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "EMA crossover signal scanner for Binance USDT pairs.", long_about = None)]
struct Cli {
    /// 配置文件路径，未指定时读取 CONFIG_PATH 环境变量，再退回默认路径
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cli
        .config
        .or_else(|| std::env::var("CONFIG_PATH").ok())
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

    // 1. 配置与日志必须最先初始化
    let config = AppConfig::load_or_default(&config_path)?;
    let _guard = init_logging(&config.logging)?;

    // 设置一个 panic hook 来捕获未处理的 panic
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        error!(target: "应用生命周期", panic_info = %panic_info, "程序发生未捕获的Panic，即将退出");
        original_hook(panic_info);
        std::process::exit(1);
    }));

    info!(
        target: "应用生命周期",
        config_path = %config_path,
        fast = %config.signal.fast_interval,
        slow = %config.signal.slow_interval,
        batch_size = config.scan.batch_size,
        "🚀 EMA信号服务启动"
    );

    // 2. 组装服务
    let service = Arc::new(SignalService::from_config(&config)?);

    // 3. 自动扫描（可选）
    if config.scan.auto_scan_interval_secs > 0 {
        let interval = Duration::from_secs(config.scan.auto_scan_interval_secs);
        let auto_span = tracing::info_span!(target: "应用生命周期", "auto_scan_loop");
        tokio::spawn(service.clone().run_auto_scan(interval).instrument(auto_span));
    } else {
        info!(target: "应用生命周期", "未启用自动扫描，只响应手动触发");
    }

    // 4. Web服务器阻塞到退出
    tokio::select! {
        result = start_web_server(service, &config.web) => {
            if let Err(e) = result {
                error!(
                    target: "应用生命周期",
                    { error.summary = e.get_error_type_summary(),
                    error.details = %e },
                    "Web服务器异常退出"
                );
                return Err(e.into());
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!(target: "应用生命周期", "收到退出信号，正在关闭");
        }
    }

    info!(target: "应用生命周期", "EMA信号服务已退出");
    Ok(())
}
