//! Buffer pool counters

use std::sync::atomic::{AtomicUsize, Ordering};

/// Counters shared by a pool and all of its outstanding buffers
#[derive(Debug, Default)]
pub struct PoolStats {
    /// Buffers allocated because none was idle
    pub total_created: AtomicUsize,
    /// Buffers currently handed out
    pub in_use_count: AtomicUsize,
    /// Buffers currently waiting for reuse
    pub idle_count: AtomicUsize,
    /// Total acquisitions
    pub total_acquired: AtomicUsize,
    /// Buffers dropped instead of kept because the idle list was full
    pub total_discarded: AtomicUsize,
}

impl PoolStats {
    /// Create new pool stats
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_created(&self) {
        self.total_created.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_acquired(&self) {
        self.total_acquired.fetch_add(1, Ordering::Relaxed);
        self.in_use_count.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_released(&self) {
        self.in_use_count.fetch_sub(1, Ordering::Relaxed);
    }

    pub(crate) fn record_discarded(&self) {
        self.total_discarded.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn set_idle_count(&self, count: usize) {
        self.idle_count.store(count, Ordering::Relaxed);
    }

    /// Get current stats snapshot
    pub fn snapshot(&self) -> PoolStatsSnapshot {
        PoolStatsSnapshot {
            total_created: self.total_created.load(Ordering::Relaxed),
            in_use_count: self.in_use_count.load(Ordering::Relaxed),
            idle_count: self.idle_count.load(Ordering::Relaxed),
            total_acquired: self.total_acquired.load(Ordering::Relaxed),
            total_discarded: self.total_discarded.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of pool statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct PoolStatsSnapshot {
    pub total_created: usize,
    pub in_use_count: usize,
    pub idle_count: usize,
    pub total_acquired: usize,
    pub total_discarded: usize,
}
