// Copyright Katana Graph Authors
// SPDX-License-Identifier: Apache-2.0

//! Shared-memory parallel graph analytics substrate.
//!
//! This crate is a thin facade over the workspace members: it exists so
//! that `tests/` can exercise cross-crate scenarios against one dependency
//! rather than each member individually. There is no other logic here;
//! each concern lives in its own crate:
//!
//! - [`katana_config`] — policy thresholds, core allocation, chunk widths
//! - [`katana_tracer`] — spans, contexts, tags, structured log sinks
//! - [`katana_memory`] — the memory policy and supervisor
//! - [`katana_cache`] — the property cache and property manager
//! - [`katana_runtime`] — the thread pool, per-thread storage, reducers
//! - [`katana_worklist`] — chunked FIFO/LIFO, OBIM, bulk-synchronous, deterministic
//! - [`katana_loops`] — `do_all` / `for_each` / `on_each`
//! - [`katana_tiles`] — the 2-D tiled executor
//! - [`katana_graph`] — the CSR topology, property columns, entity types, projections

pub use katana_cache as cache;
pub use katana_config as config;
pub use katana_graph as graph;
pub use katana_loops as loops;
pub use katana_memory as memory;
pub use katana_runtime as runtime;
pub use katana_tiles as tiles;
pub use katana_tracer as tracer;
pub use katana_worklist as worklist;
