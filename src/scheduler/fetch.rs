//! 分批扫描调度：交易对列表、批次切分、批内并发上限、批间固定等待

use crate::engine::SignalEngine;
use crate::klcommon::config::ScanConfig;
use crate::klcommon::Result;
use crate::scheduler::run_state::RunController;
use crate::scheduler::ScanReport;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

const LOG_TARGET: &str = "调度器";

/// 批次参数
///
/// `max_concurrency` 限制同时评估的交易对数。每个交易对同时拉取入场和趋势两个周期，
/// 因此对上游的并发请求最多为 `max_concurrency * 2`。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchPolicy {
    pub batch_size: usize,
    pub max_concurrency: usize,
    pub inter_batch_delay: Duration,
}

impl From<&ScanConfig> for BatchPolicy {
    fn from(config: &ScanConfig) -> Self {
        Self {
            batch_size: config.batch_size.max(1),
            max_concurrency: config.max_concurrency.max(1),
            inter_batch_delay: Duration::from_millis(config.inter_batch_delay_ms),
        }
    }
}

pub struct FetchScheduler {
    engine: Arc<SignalEngine>,
    controller: Arc<RunController>,
    policy: BatchPolicy,
    quote_suffix: String,
    max_pair_count: usize,
}

impl FetchScheduler {
    pub fn new(engine: Arc<SignalEngine>, controller: Arc<RunController>, config: &ScanConfig) -> Self {
        Self {
            engine,
            controller,
            policy: BatchPolicy::from(config),
            quote_suffix: config.quote_suffix.clone(),
            max_pair_count: config.max_pair_count,
        }
    }

    /// 执行一次完整扫描
    ///
    /// 交易对列表每次扫描重新获取。单个交易对的失败只计数并记录，不中断批次。
    /// 调用方负责通过 `RunController::try_begin_scan` 保证同一时间只有一次扫描，
    /// `epoch` 为扫描开始时的运行轮次。扫描期间发生暂停后恢复，剩余批次不再执行。
    pub async fn run_scan(&self, epoch: u64, pair_count: usize) -> Result<ScanReport> {
        let cap = pair_count.min(self.max_pair_count);
        let universe = self.engine.source().list_pairs(&self.quote_suffix, cap).await?;
        let total = universe.len();
        let batch_count = total.div_ceil(self.policy.batch_size);

        self.controller.start_progress(epoch, total);
        info!(
            target: LOG_TARGET,
            epoch,
            total,
            batch_size = self.policy.batch_size,
            batch_count,
            max_concurrency = self.policy.max_concurrency,
            "🚀 开始扫描"
        );

        let start_time = Instant::now();
        let mut report = ScanReport { accepted: total, ..ScanReport::default() };

        for (batch_index, batch) in universe.chunks(self.policy.batch_size).enumerate() {
            if batch_index > 0 && !self.policy.inter_batch_delay.is_zero() {
                tokio::time::sleep(self.policy.inter_batch_delay).await;
            }

            if !self.controller.is_current(epoch) {
                let skipped = total - batch_index * self.policy.batch_size;
                warn!(
                    target: LOG_TARGET,
                    epoch,
                    current_epoch = self.controller.epoch(),
                    skipped,
                    "运行轮次已切换，停止本次扫描剩余批次"
                );
                report.skipped = skipped;
                break;
            }

            let pair_futures: Vec<_> = batch
                .iter()
                .map(|symbol| async move {
                    let result = self.engine.evaluate_pair(symbol, epoch).await;
                    self.controller.record_pair_done(epoch);
                    (symbol, result)
                })
                .collect();
            let results = stream::iter(pair_futures)
                .buffer_unordered(self.policy.max_concurrency)
                .collect::<Vec<_>>()
                .await;

            for (symbol, result) in results {
                match result {
                    Ok(signals) => report.signals += signals,
                    Err(e) => {
                        report.failed += 1;
                        warn!(
                            target: LOG_TARGET,
                            symbol = %symbol,
                            error.summary = e.get_error_type_summary(),
                            error.details = %e,
                            "交易对评估失败，本轮跳过"
                        );
                    }
                }
            }

            info!(
                target: LOG_TARGET,
                batch = batch_index + 1,
                batch_count,
                progress = self.controller.snapshot().done,
                total,
                "批次完成"
            );
        }

        info!(
            target: LOG_TARGET,
            accepted = report.accepted,
            signals = report.signals,
            failed = report.failed,
            skipped = report.skipped,
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            "✅ 扫描完成"
        );

        Ok(report)
    }
}
