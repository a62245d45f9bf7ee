//! 运行状态机：Paused <-> Running，扫描进度与运行轮次

use crate::engine::dedup::DedupLedger;
use crate::engine::events::DedupKey;
use crate::klcommon::{AppError, Result};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::info;

const LOG_TARGET: &str = "运行控制";

/// 对外暴露的进度快照
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProgressSnapshot {
    pub done: usize,
    pub total: usize,
    pub running: bool,
    pub scanning: bool,
    pub epoch: u64,
}

pub struct RunController {
    running: AtomicBool,
    scanning: AtomicBool,
    epoch: AtomicU64,
    done: AtomicUsize,
    total: AtomicUsize,
    ledger: Arc<DedupLedger>,
    // 串行化状态切换，计数器本身是原子的
    transition: Mutex<()>,
}

/// 扫描进行中的凭证，drop 时结束扫描
#[must_use]
pub struct ScanGuard<'a> {
    controller: &'a RunController,
    epoch: u64,
}

impl ScanGuard<'_> {
    /// 扫描开始时所在的运行轮次
    pub fn epoch(&self) -> u64 {
        self.epoch
    }
}

impl Drop for ScanGuard<'_> {
    fn drop(&mut self) {
        self.controller.scanning.store(false, Ordering::SeqCst);
    }
}

impl RunController {
    pub fn new(start_running: bool, ledger: Arc<DedupLedger>) -> Self {
        Self {
            running: AtomicBool::new(start_running),
            scanning: AtomicBool::new(false),
            epoch: AtomicU64::new(if start_running { 1 } else { 0 }),
            done: AtomicUsize::new(0),
            total: AtomicUsize::new(0),
            ledger,
            transition: Mutex::new(()),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    /// 切换运行状态，返回切换后的状态
    ///
    /// Paused -> Running 开启新一轮：轮次加一、进度清零、清空去重账本。
    /// 其余情况（重复设置同一状态）不做任何事。
    pub fn set_running(&self, running: bool) -> bool {
        let _lock = self.lock_transition();

        let was_running = self.running.load(Ordering::SeqCst);
        if was_running == running {
            return running;
        }

        if running {
            let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
            self.done.store(0, Ordering::SeqCst);
            self.total.store(0, Ordering::SeqCst);
            self.ledger.clear();
            self.running.store(true, Ordering::SeqCst);
            info!(target: LOG_TARGET, epoch, "▶️ 恢复运行，开始新一轮，去重账本已清空");
        } else {
            self.running.store(false, Ordering::SeqCst);
            info!(target: LOG_TARGET, epoch = self.epoch(), "⏸️ 已暂停，进行中的扫描会继续完成");
        }

        running
    }

    /// 开始一次扫描。暂停中或已有扫描在进行时返回 ScanRejected。
    pub fn try_begin_scan(&self) -> Result<ScanGuard<'_>> {
        let _lock = self.lock_transition();

        if !self.running.load(Ordering::SeqCst) {
            return Err(AppError::ScanRejected("服务已暂停".to_string()));
        }

        if self
            .scanning
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(AppError::ScanRejected("已有扫描正在进行".to_string()));
        }

        Ok(ScanGuard { controller: self, epoch: self.epoch() })
    }

    fn lock_transition(&self) -> MutexGuard<'_, ()> {
        self.transition.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// 扫描所属轮次是否仍是当前轮次
    pub fn is_current(&self, epoch: u64) -> bool {
        self.epoch() == epoch
    }

    /// 以下三个操作都带扫描开始时的轮次，轮次已切换时不做任何事，
    /// 旧扫描不会改写新一轮的进度和去重账本。
    pub fn start_progress(&self, epoch: u64, total: usize) -> bool {
        let _lock = self.lock_transition();
        if !self.is_current(epoch) {
            return false;
        }
        self.total.store(total, Ordering::SeqCst);
        self.done.store(0, Ordering::SeqCst);
        true
    }

    pub fn record_pair_done(&self, epoch: u64) -> Option<usize> {
        let _lock = self.lock_transition();
        self.is_current(epoch).then(|| self.done.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// 在 `epoch` 轮次中登记信号，首次登记返回 true
    pub fn admit(&self, epoch: u64, key: DedupKey) -> bool {
        let _lock = self.lock_transition();
        self.is_current(epoch) && self.ledger.admit_once(key)
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            done: self.done.load(Ordering::SeqCst),
            total: self.total.load(Ordering::SeqCst),
            running: self.running.load(Ordering::SeqCst),
            scanning: self.scanning.load(Ordering::SeqCst),
            epoch: self.epoch(),
        }
    }
}
