// Copyright Katana Graph Authors
// SPDX-License-Identifier: Apache-2.0

//! `for_each_deterministic`: worklist-driven iteration over a
//! [`katana_worklist::Deterministic`] worklist that replays the
//! cautious-point read/commit protocol spec.md §4.5 describes ("an
//! optional cautious-point annotation divides the body into a read phase
//! and a commit phase; an optional parallel-break predicate may abort
//! iteration"), so the same items and the same body produce byte-identical
//! output regardless of thread count (spec.md §8, testable property 8).
//!
//! Each round draws a batch of items in ascending `det_id` order. `read`
//! runs on every item of the batch concurrently across the pool — it must
//! not mutate anything the commit phase or another item's `read` also
//! touches, since its execution order is unspecified. `commit` then runs
//! once per item, strictly serially, in that same `det_id` order, so
//! conflicting writes across items never race; it may push new items,
//! picked up in a later round. `det_parallel_break`, if given, is
//! evaluated immediately before each item's commit; once it returns
//! `true` for an item, that item and every item after it (in this round
//! and any later one) are dropped without committing.

use std::sync::Arc;

use katana_runtime::ThreadPool;
use katana_tracer::{Tracer, tags};
use katana_worklist::{Deterministic, WorkList};
use parking_lot::Mutex;

use crate::options::LoopOptions;
use crate::stats::{LoopStats, LoopStatsSnapshot};

/// Handle passed to a [`for_each_deterministic`] commit closure. Pushing
/// is the only capability a commit phase needs; there is no break flag
/// here — aborting iteration is `det_parallel_break`'s job, not the
/// body's, since a body running under a total order cannot race itself to
/// set one.
pub struct DeterministicContext<'a, T, F> {
    worklist: &'a Deterministic<T, F>,
    stats: &'a LoopStats,
}

impl<T: Send, F: Fn(&T) -> u64 + Send + Sync> DeterministicContext<'_, T, F> {
    /// Push a new item into the loop's worklist; it is read and committed,
    /// in `det_id` order, in a later round.
    pub fn push(&self, item: T) {
        self.worklist.push(item);
        self.stats.record_push();
    }
}

/// Run `read` on every item of `batch` concurrently across `pool`,
/// returning results in the same order as `batch`.
fn run_parallel_reads<T, R, Read>(pool: &ThreadPool, batch: &[Arc<T>], read: &Arc<Read>) -> Vec<R>
where
    T: Send + Sync + 'static,
    R: Send + 'static,
    Read: Fn(&T) -> R + Send + Sync + 'static,
{
    let slots: Arc<Vec<Mutex<Option<R>>>> =
        Arc::new((0..batch.len()).map(|_| Mutex::new(None)).collect());

    let jobs = batch.iter().cloned().enumerate().map(|(idx, item)| {
        let slots = slots.clone();
        let read = read.clone();
        Box::new(move || {
            let result = read(&item);
            *slots[idx].lock() = Some(result);
        }) as katana_runtime::Job
    });
    pool.execute_and_wait(jobs);

    let slots = Arc::try_unwrap(slots)
        .unwrap_or_else(|_| unreachable!("read-phase jobs have all finished and dropped their clone"));
    slots
        .into_iter()
        .map(|slot| slot.into_inner().expect("every slot is written by its read job"))
        .collect()
}

/// Drain `initial` plus whatever `commit` pushes through `worklist` in
/// rounds of up to `pool.num_threads() * opts.chunk_size.max(1)` items,
/// running the cautious-point read/commit protocol on each round.
#[allow(clippy::too_many_arguments)]
pub fn for_each_deterministic<T, F, R, Read, Commit>(
    pool: &ThreadPool,
    worklist: Arc<Deterministic<T, F>>,
    initial: Vec<T>,
    read: Read,
    commit: Commit,
    det_parallel_break: Option<Arc<dyn Fn(&T) -> bool + Send + Sync>>,
    opts: &LoopOptions,
    tracer: Option<&Tracer>,
) -> LoopStatsSnapshot
where
    T: Send + Sync + 'static,
    F: Fn(&T) -> u64 + Send + Sync + 'static,
    R: Send + 'static,
    Read: Fn(&T) -> R + Send + Sync + 'static,
    Commit: Fn(T, R, &DeterministicContext<'_, T, F>) + Send + Sync + 'static,
{
    let stats = Arc::new(LoopStats::default());
    let read = Arc::new(read);
    let batch_size = (pool.num_threads() * opts.chunk_size.max(1)).max(1);

    for item in initial {
        worklist.push(item);
    }

    'rounds: loop {
        let batch = worklist.pop_batch(batch_size);
        if batch.is_empty() {
            break;
        }

        let arced: Vec<Arc<T>> = batch.into_iter().map(Arc::new).collect();
        let reads = run_parallel_reads(pool, &arced, &read);

        for (item, read_result) in arced.into_iter().zip(reads) {
            if let Some(pred) = &det_parallel_break {
                if pred(&item) {
                    break 'rounds;
                }
            }
            let item = Arc::try_unwrap(item)
                .unwrap_or_else(|_| unreachable!("read phase dropped its clone before commit"));
            let ctx = DeterministicContext {
                worklist: worklist.as_ref(),
                stats: &stats,
            };
            commit(item, read_result, &ctx);
            stats.record_item();
        }
    }

    let snapshot = stats.snapshot();
    if !opts.no_stats {
        if let Some(tracer) = tracer {
            tracer.active_span().log(
                "for_each_deterministic finished",
                tags! {
                    "loopname" => opts.loopname.as_str(),
                    "items_processed" => snapshot.items_processed as i64,
                    "pushes" => snapshot.pushes as i64,
                },
            );
        }
    }
    snapshot
}
