// Copyright Katana Graph Authors
// SPDX-License-Identifier: Apache-2.0

//! The per-invocation handle passed to `for_each` bodies (spec.md §4.6).

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

use katana_worklist::WorkList;

use crate::stats::LoopStats;

/// Context a `for_each` body uses to push new work or request an early
/// stop. Mirrors the upstream `UserContext` without the C++ allocator
/// handle, since Rust bodies manage their own scratch memory.
pub struct Context<'a, T, W: WorkList<T>> {
    pub(crate) worklist: &'a W,
    pub(crate) outstanding: &'a AtomicI64,
    pub(crate) break_flag: &'a AtomicBool,
    pub(crate) no_pushes: bool,
    pub(crate) parallel_break: bool,
    pub(crate) stats: Option<&'a LoopStats>,
}

impl<'a, T, W: WorkList<T>> Context<'a, T, W> {
    /// Push a new item into the loop's worklist.
    ///
    /// # Panics
    /// Panics if the loop was configured with `no_pushes` — a body that
    /// pushes under that option has violated its own stated contract.
    pub fn push(&self, item: T) {
        assert!(
            !self.no_pushes,
            "for_each body pushed a new item but was configured with no_pushes"
        );
        self.outstanding.fetch_add(1, Ordering::AcqRel);
        self.worklist.push(item);
        if let Some(stats) = self.stats {
            stats.record_push();
        }
    }

    /// Request that the loop stop dispatching further items once the
    /// in-flight ones finish.
    ///
    /// # Panics
    /// Panics if the loop was not configured with `parallel_break`.
    pub fn break_loop(&self) {
        assert!(
            self.parallel_break,
            "ctx.break_loop() called without the parallel_break option"
        );
        self.break_flag.store(true, Ordering::Release);
    }

    /// Whether another worker has already requested a break.
    #[must_use]
    pub fn break_requested(&self) -> bool {
        self.break_flag.load(Ordering::Acquire)
    }
}
