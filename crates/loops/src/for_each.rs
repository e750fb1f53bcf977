// Copyright Katana Graph Authors
// SPDX-License-Identifier: Apache-2.0

//! `for_each`: worklist-driven iteration where the body may push new
//! items or request an early stop (spec.md §4.6).

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

use katana_runtime::ThreadPool;
use katana_tracer::{Tracer, tags};
use katana_worklist::WorkList;

use crate::context::Context;
use crate::options::LoopOptions;
use crate::stats::{LoopStats, LoopStatsSnapshot};

/// Seed `worklist` with `initial`, then run `pool.num_threads()` drain
/// loops concurrently, each popping an item, running `body(item, ctx)`,
/// and repeating. Terminates once every item ever counted — initial plus
/// pushed — has finished and no worker is mid-item (spec.md §4.6,
/// "Termination: all current and newly pushed items have been processed
/// and no worker holds work").
pub fn for_each<T, W, F>(
    pool: &ThreadPool,
    worklist: Arc<W>,
    initial: Vec<T>,
    body: Arc<F>,
    opts: &LoopOptions,
    tracer: Option<&Tracer>,
) -> LoopStatsSnapshot
where
    T: Send + 'static,
    W: WorkList<T> + 'static,
    F: Fn(T, &Context<'_, T, W>) + Send + Sync + 'static,
{
    let outstanding = Arc::new(AtomicI64::new(initial.len() as i64));
    let break_flag = Arc::new(AtomicBool::new(false));
    let stats = Arc::new(LoopStats::default());

    for item in initial {
        worklist.push(item);
    }

    let jobs = (0..pool.num_threads()).map(|_| {
        let worklist = worklist.clone();
        let outstanding = outstanding.clone();
        let break_flag = break_flag.clone();
        let stats = stats.clone();
        let body = body.clone();
        let no_pushes = opts.no_pushes;
        let parallel_break = opts.parallel_break;
        Box::new(move || {
            loop {
                if break_flag.load(Ordering::Acquire) {
                    return;
                }
                match worklist.pop() {
                    Some(item) => {
                        let ctx = Context {
                            worklist: worklist.as_ref(),
                            outstanding: &outstanding,
                            break_flag: &break_flag,
                            no_pushes,
                            parallel_break,
                            stats: Some(&stats),
                        };
                        body(item, &ctx);
                        stats.record_item();
                        outstanding.fetch_sub(1, Ordering::AcqRel);
                    }
                    None => {
                        if outstanding.load(Ordering::Acquire) <= 0 {
                            return;
                        }
                        std::thread::yield_now();
                    }
                }
            }
        }) as katana_runtime::Job
    });

    pool.execute_and_wait(jobs);

    let snapshot = stats.snapshot();
    if !opts.no_stats {
        if let Some(tracer) = tracer {
            tracer.active_span().log(
                "for_each finished",
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

#[cfg(test)]
mod tests {
    use super::*;
    use katana_runtime::Topology;
    use katana_worklist::PerSocketChunkFifo;
    use std::sync::atomic::AtomicI64 as Counter;

    #[test]
    fn pushed_items_are_also_processed() {
        let pool = ThreadPool::with_topology(Topology::single_socket(4), false, false, None);
        let worklist = Arc::new(PerSocketChunkFifo::new(pool.topology(), 8));
        let total = Arc::new(Counter::new(0));
        let total_clone = total.clone();
        let opts = LoopOptions::named("countdown");
        // each item n > 0 pushes n - 1, so starting from 5 visits 6 items total.
        let snapshot = for_each(
            &pool,
            worklist,
            vec![5_i64],
            Arc::new(move |item: i64, ctx: &Context<'_, i64, PerSocketChunkFifo<i64>>| {
                total_clone.fetch_add(1, Ordering::Relaxed);
                if item > 0 {
                    ctx.push(item - 1);
                }
            }),
            &opts,
            None,
        );
        assert_eq!(total.load(Ordering::Relaxed), 6);
        assert_eq!(snapshot.items_processed, 6);
        assert_eq!(snapshot.pushes, 5);
        pool.shutdown();
    }

    #[test]
    #[should_panic(expected = "no_pushes")]
    fn push_under_no_pushes_panics() {
        let topo = Topology::single_socket(1);
        let worklist: PerSocketChunkFifo<i64> = PerSocketChunkFifo::new(&topo, 8);
        let outstanding = AtomicI64::new(0);
        let break_flag = AtomicBool::new(false);
        let ctx = Context {
            worklist: &worklist,
            outstanding: &outstanding,
            break_flag: &break_flag,
            no_pushes: true,
            parallel_break: false,
            stats: None,
        };
        ctx.push(1_i64);
    }
}
