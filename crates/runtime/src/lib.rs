// Copyright Katana Graph Authors
// SPDX-License-Identifier: Apache-2.0

//! Shared-memory parallel execution substrate: topology discovery, a
//! work-stealing thread pool, per-thread storage, and commutative
//! reducers built on top of it (spec.md §4.4-§4.6).
//!
//! This crate deliberately has no `unsafe` in it: the workspace denies
//! `unsafe_code` at the lint level, so per-thread storage goes through
//! `parking_lot::Mutex` per slot rather than raw pointer indexing.

mod error;
mod per_thread;
mod pool;
mod reducer;
mod topology;

pub use error::{Error, Result};
pub use per_thread::PerThread;
pub use pool::{Job, ThreadPool, current_worker_index, set_current_worker_index_for_test};
pub use reducer::{Reducer, logical_or_reducer, max_reducer, min_reducer, sum_reducer};
pub use topology::Topology;
