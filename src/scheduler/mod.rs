pub mod fetch;
pub mod run_state;

use serde::Serialize;

pub use fetch::{BatchPolicy, FetchScheduler};
pub use run_state::{ProgressSnapshot, RunController, ScanGuard};

/// 一次扫描的结果统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    /// 本次扫描的交易对数量
    pub accepted: usize,
    /// 新推送的信号数量
    pub signals: usize,
    /// 评估失败（被跳过）的交易对数量
    pub failed: usize,
    /// 运行轮次切换后未执行的交易对数量
    pub skipped: usize,
}
