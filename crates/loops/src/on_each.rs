// Copyright Katana Graph Authors
// SPDX-License-Identifier: Apache-2.0

//! `on_each`: run `body(thread_id, total_threads)` exactly once per
//! worker (spec.md §4.6). A thin, option-aware wrapper over
//! [`katana_runtime::ThreadPool::on_each`].

use katana_runtime::ThreadPool;
use katana_tracer::{Tracer, tags};

use crate::options::LoopOptions;

/// Run `body` once on every worker thread in `pool`, blocking until all
/// of them have finished. Used for coarse thread-local initialization and
/// by the tiled executor's per-socket start-point setup.
pub fn on_each<F>(pool: &ThreadPool, body: F, opts: &LoopOptions, tracer: Option<&Tracer>)
where
    F: Fn(usize, usize) + Send + Sync + 'static,
{
    pool.on_each(body);
    if !opts.no_stats {
        if let Some(tracer) = tracer {
            tracer.active_span().log(
                "on_each finished",
                tags! {
                    "loopname" => opts.loopname.as_str(),
                    "num_threads" => pool.num_threads() as i64,
                },
            );
        }
    }
}
