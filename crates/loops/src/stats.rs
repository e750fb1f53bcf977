// Copyright Katana Graph Authors
// SPDX-License-Identifier: Apache-2.0

//! Per-loop-invocation counters, emitted as span tags unless `no_stats`
//! is set (spec.md §4.6).

use std::sync::atomic::{AtomicU64, Ordering};

/// Shared, lock-free counters updated from every worker during one loop
/// invocation.
#[derive(Debug, Default)]
pub struct LoopStats {
    items_processed: AtomicU64,
    pushes: AtomicU64,
}

impl LoopStats {
    pub(crate) fn record_item(&self) {
        self.items_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_push(&self) {
        self.pushes.fetch_add(1, Ordering::Relaxed);
    }

    /// Freeze the current counts into a plain snapshot.
    #[must_use]
    pub fn snapshot(&self) -> LoopStatsSnapshot {
        LoopStatsSnapshot {
            items_processed: self.items_processed.load(Ordering::Relaxed),
            pushes: self.pushes.load(Ordering::Relaxed),
        }
    }
}

/// An immutable point-in-time read of [`LoopStats`], returned to callers
/// once a loop has finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoopStatsSnapshot {
    /// Total items whose body completed.
    pub items_processed: u64,
    /// Total items pushed via `Context::push` across all workers.
    pub pushes: u64,
}
