//! 对外操作入口：触发扫描、切换运行状态、查询进度、发送测试消息
//!
//! HTTP层和自动扫描循环都只通过 `SignalService` 访问引擎。

use crate::engine::dedup::DedupLedger;
use crate::engine::SignalEngine;
use crate::klcommon::{AppConfig, BinanceApi, MarketDataSource, Result};
use crate::notify::{NotificationDispatcher, Notifier, TelegramNotifier};
use crate::scheduler::{FetchScheduler, ProgressSnapshot, RunController, ScanReport};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

const LOG_TARGET: &str = "应用生命周期";

pub struct SignalService {
    controller: Arc<RunController>,
    scheduler: FetchScheduler,
    dispatcher: Arc<NotificationDispatcher>,
    default_pair_count: usize,
}

impl SignalService {
    /// 使用给定的数据源与推送渠道组装服务
    pub fn new(config: &AppConfig, source: Arc<dyn MarketDataSource>, notifier: Arc<dyn Notifier>) -> Self {
        let ledger = Arc::new(DedupLedger::new());
        let controller = Arc::new(RunController::new(config.scan.start_running, ledger));
        let dispatcher = Arc::new(NotificationDispatcher::new(notifier));
        let engine = Arc::new(SignalEngine::new(
            Arc::new(config.signal.clone()),
            source,
            dispatcher.clone(),
            controller.clone(),
        ));
        let scheduler = FetchScheduler::new(engine, controller.clone(), &config.scan);

        Self {
            controller,
            scheduler,
            dispatcher,
            default_pair_count: config.scan.default_pair_count,
        }
    }

    /// 使用币安行情与 Telegram 推送组装服务
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let source = Arc::new(BinanceApi::new(&config.api)?);
        let notifier = TelegramNotifier::new(&config.telegram, &config.api)?;
        if !notifier.is_configured() {
            warn!(target: LOG_TARGET, "未配置 TELEGRAM_BOT_TOKEN / TELEGRAM_CHAT_ID，信号只会记录到日志");
        }
        Ok(Self::new(config, source, Arc::new(notifier)))
    }

    /// 触发一次扫描并等待完成。`None` 或 0 使用默认数量。
    pub async fn trigger_scan(&self, pair_count: Option<usize>) -> Result<ScanReport> {
        let guard = self.controller.try_begin_scan()?;
        let pair_count = pair_count.filter(|&n| n > 0).unwrap_or(self.default_pair_count);
        self.scheduler.run_scan(guard.epoch(), pair_count).await
    }

    /// 切换运行状态，返回切换后的状态
    pub fn set_run_state(&self, running: bool) -> bool {
        self.controller.set_running(running)
    }

    pub fn query_progress(&self) -> ProgressSnapshot {
        self.controller.snapshot()
    }

    pub async fn send_test_message(&self) -> Result<()> {
        self.dispatcher.send_test_message().await
    }

    /// 按固定间隔触发扫描。暂停期间跳过，上一轮未结束时跳过。
    pub async fn run_auto_scan(self: Arc<Self>, interval: Duration) {
        info!(target: LOG_TARGET, interval_secs = interval.as_secs(), "⏱️ 自动扫描已启动");
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;

            if !self.controller.is_running() {
                continue;
            }

            match self.trigger_scan(None).await {
                Ok(report) => info!(
                    target: LOG_TARGET,
                    accepted = report.accepted,
                    signals = report.signals,
                    failed = report.failed,
                    "自动扫描完成"
                ),
                Err(e) => warn!(
                    target: LOG_TARGET,
                    { error.summary = e.get_error_type_summary(),
                    error.details = %e },
                    "自动扫描未执行"
                ),
            }
        }
    }
}
