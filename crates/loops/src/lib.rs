// Copyright Katana Graph Authors
// SPDX-License-Identifier: Apache-2.0

//! Parallel loop primitives over [`katana_runtime::ThreadPool`]: bulk
//! iteration (`do_all`), worklist-driven iteration with push/break
//! (`for_each`), and per-worker broadcast (`on_each`) (spec.md §4.6).

mod context;
mod deterministic;
mod do_all;
mod for_each;
mod on_each;
mod options;
mod stats;

pub use context::Context;
pub use deterministic::{for_each_deterministic, DeterministicContext};
pub use do_all::do_all;
pub use for_each::for_each;
pub use on_each::on_each;
pub use options::LoopOptions;
pub use stats::{LoopStats, LoopStatsSnapshot};
