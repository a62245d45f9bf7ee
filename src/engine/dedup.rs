//! 去重账本：本轮运行中已推送过的信号

use crate::engine::events::DedupKey;
use dashmap::DashSet;

#[derive(Debug, Default)]
pub struct DedupLedger {
    seen: DashSet<DedupKey>,
}

impl DedupLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// 首次出现返回 true。检查与插入由 `DashSet::insert` 在同一分片锁内完成。
    pub fn admit_once(&self, key: DedupKey) -> bool {
        self.seen.insert(key)
    }

    /// 新一轮运行开始时清空
    pub fn clear(&self) {
        self.seen.clear();
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
