// Copyright Katana Graph Authors
// SPDX-License-Identifier: Apache-2.0

//! Worklists: the push/pop scheduling primitives that `katana-loops`'
//! `for_each` drives (spec.md §4.5).
//!
//! Every concrete worklist implements [`WorkList`]. None of these types
//! are themselves thread pools — they are shared data structures handed
//! to worker closures, which is why every variant is internally
//! synchronized rather than requiring external locking.

mod bulk_synchronous;
mod chunked;
mod deterministic;
mod obim;
mod serial_bucket;

pub use bulk_synchronous::BulkSynchronous;
pub use chunked::{PerSocketChunkFifo, PerSocketChunkLifo};
pub use deterministic::Deterministic;
pub use obim::OrderedByIntegerMetric;
pub use serial_bucket::SerialBucketWl;

/// Common interface all worklists in this crate implement.
///
/// `push`/`pop` make no atomicity promise across calls — a worklist only
/// promises that concurrent `push`/`pop` calls do not corrupt its
/// internal state (spec.md §4.5, "implementation-defined ordering").
pub trait WorkList<T>: Send + Sync {
    /// Insert `item`. May be called from any worker concurrently.
    fn push(&self, item: T);

    /// Remove and return one item, or `None` if the worklist currently
    /// has nothing to hand out. `None` does not necessarily mean the
    /// worklist is permanently empty — another worker may still push.
    fn pop(&self) -> Option<T>;

    /// Best-effort count of items currently held, for stats and
    /// termination probing. May be stale the instant it returns.
    fn approx_len(&self) -> usize;

    /// Whether the worklist appears empty right now.
    fn is_empty(&self) -> bool {
        self.approx_len() == 0
    }
}
