// Copyright Katana Graph Authors
// SPDX-License-Identifier: Apache-2.0

//! `do_all`: run `body(item)` on every element exactly once, with no push
//! or break (spec.md §4.6).

use std::sync::Arc;

use katana_runtime::ThreadPool;
use katana_tracer::{Tracer, tags};

use crate::options::LoopOptions;
use crate::stats::{LoopStats, LoopStatsSnapshot};

/// Partition `items` into chunks of `opts.chunk_size`, hand them to
/// `pool`, and block until every item has run through `body` exactly
/// once. Stealing inside the pool may reorder completion across chunks,
/// but never runs the same item twice.
pub fn do_all<T, F>(
    pool: &ThreadPool,
    mut items: Vec<T>,
    body: Arc<F>,
    opts: &LoopOptions,
    tracer: Option<&Tracer>,
) -> LoopStatsSnapshot
where
    T: Send + 'static,
    F: Fn(T) + Send + Sync + 'static,
{
    let total = items.len();
    let stats = Arc::new(LoopStats::default());
    let chunk_size = opts.chunk_size.max(1);

    let mut chunks: Vec<Vec<T>> = Vec::with_capacity(total.div_ceil(chunk_size).max(1));
    while !items.is_empty() {
        let at = chunk_size.min(items.len());
        chunks.push(items.drain(..at).collect());
    }

    let jobs = chunks.into_iter().map(|chunk| {
        let body = body.clone();
        let stats = stats.clone();
        Box::new(move || {
            for item in chunk {
                body(item);
                stats.record_item();
            }
        }) as katana_runtime::Job
    });

    pool.execute_and_wait(jobs);

    let snapshot = stats.snapshot();
    if !opts.no_stats {
        if let Some(tracer) = tracer {
            tracer.active_span().log(
                "do_all finished",
                tags! {
                    "loopname" => opts.loopname.as_str(),
                    "items_processed" => snapshot.items_processed as i64,
                },
            );
        }
    }
    snapshot
}
