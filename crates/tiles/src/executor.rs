// Copyright Katana Graph Authors
// SPDX-License-Identifier: Apache-2.0

//! The 2-D tiled executor itself (spec.md §4.7, component C8).

use std::ops::Range;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use katana_config::policy::TiledExecutorConfig;
use katana_runtime::{ThreadPool, Topology};
use katana_tracer::{Tracer, tags};
use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::tile::{Tile, TileCoord};

/// A source of sorted neighbor lists, the minimal surface
/// [`TiledExecutor::run_sparse`] needs from an adjacency structure such as
/// `katana_graph::Csr` without this crate depending on the graph layer.
///
/// `row(node)` must return the same slice, sorted ascending by
/// destination, on every call — the executor calls it more than once per
/// node and caches a derived offset the first time.
pub trait RowSource: Send + Sync {
    /// Sorted (ascending) neighbor destinations of `node`.
    fn row(&self, node: u32) -> &[u32];
}

/// Outcome of one [`TiledExecutor::run_dense`]/[`TiledExecutor::run_sparse`]
/// call: how many probe attempts failed to find an eligible tile, and how
/// many tiles ended the run short of `max_updates_per_block` (always 0
/// when locking is disabled on a static graph; spec.md §8 property 10).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TiledExecutorReport {
    /// Probe attempts that found no claimable tile and stepped diagonally.
    pub probe_failures: usize,
    /// Tiles whose `updates` counter never reached `max_updates_per_block`.
    pub tiles_short_of_target: usize,
}

struct Inner {
    tiles: Vec<Tile>,
    lock_x: Vec<Mutex<()>>,
    lock_y: Vec<Mutex<()>>,
    num_x_blocks: usize,
    num_y_blocks: usize,
    max_updates: usize,
    use_locks: bool,
    probe_failures: AtomicUsize,
    tracer: Option<Arc<Tracer>>,
}

impl Inner {
    fn index(&self, tx: usize, ty: usize) -> usize {
        tx * self.num_y_blocks + ty
    }

    fn start_coord(&self, thread_id: usize, topology: &Topology) -> (usize, usize) {
        let tx = thread_id % self.num_x_blocks;
        let ty = if self.use_locks {
            let socket = topology.socket_of(thread_id);
            let socket_range = topology.socket_thread_range(socket);
            let local_index = thread_id.saturating_sub(socket_range.start);
            let socket_stride = self.num_y_blocks.div_ceil(topology.num_sockets().max(1));
            (socket * socket_stride + local_index) % self.num_y_blocks
        } else {
            thread_id % self.num_y_blocks
        };
        (tx, ty)
    }

    /// Attempt to claim and run the tile at `(tx, ty)`. Returns `true` if
    /// `f` ran (an update was recorded), `false` if the tile was already
    /// at its target, already claimed, or (with locking) its row/column
    /// lock could not be acquired.
    fn try_run<F: FnOnce(&Tile)>(&self, tx: usize, ty: usize, f: F) -> bool {
        let tile = &self.tiles[self.index(tx, ty)];
        if !tile.is_below_target(self.max_updates) {
            return false;
        }
        if !tile.try_claim() {
            return false;
        }
        // Re-check after claiming: another worker may have pushed this
        // tile to its target while we were acquiring the claim.
        if !tile.is_below_target(self.max_updates) {
            tile.release_without_update();
            return false;
        }
        if self.use_locks {
            let Some(row_guard) = self.lock_x[tx].try_lock() else {
                tile.release_without_update();
                return false;
            };
            let Some(col_guard) = self.lock_y[ty].try_lock() else {
                drop(row_guard);
                tile.release_without_update();
                return false;
            };
            f(tile);
            drop(col_guard);
            drop(row_guard);
        } else {
            f(tile);
        }
        tile.release_after_update();
        true
    }

    /// One worker's probe/diagonal walk over the whole grid (spec.md
    /// §4.7, "Scheduling"). Gives up once it has stepped past the grid
    /// twice in a row without claiming a tile — the "two full sweeps"
    /// termination rule, tracked per worker so the overall run ends once
    /// every worker independently reaches it.
    fn run_worker<F: Fn(&Tile)>(&self, thread_id: usize, topology: &Topology, body: F) {
        let num_tiles = self.num_x_blocks * self.num_y_blocks;
        if num_tiles == 0 {
            return;
        }
        let (mut tx, mut ty) = self.start_coord(thread_id, topology);
        let give_up_after = num_tiles.saturating_mul(2);
        let mut misses_since_progress = 0usize;

        while misses_since_progress < give_up_after {
            if self.try_run(tx, ty, &body) {
                misses_since_progress = 0;
            } else {
                self.probe_failures.fetch_add(1, Ordering::Relaxed);
                misses_since_progress += 1;
            }
            tx = (tx + 1) % self.num_x_blocks;
            ty = (ty + 1) % self.num_y_blocks;
        }
    }

    fn report(&self) -> TiledExecutorReport {
        let short: Vec<TileCoord> = self
            .tiles
            .iter()
            .filter(|t| t.is_below_target(self.max_updates))
            .map(Tile::coord)
            .collect();
        if !short.is_empty() {
            if let Some(tracer) = &self.tracer {
                let sample = short
                    .iter()
                    .take(5)
                    .map(|c| format!("({},{})", c.tx, c.ty))
                    .collect::<Vec<_>>()
                    .join(",");
                tracer.active_span().log(
                    "tiled executor finished with tiles short of target",
                    tags! {
                        "tiles_short_of_target" => short.len() as i64,
                        "total_tiles" => self.tiles.len() as i64,
                        "use_locks" => self.use_locks,
                        "sample_tiles" => sample,
                    },
                );
            }
        }
        TiledExecutorReport {
            probe_failures: self.probe_failures.load(Ordering::Relaxed),
            tiles_short_of_target: short.len(),
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        let failures = self.probe_failures.load(Ordering::Relaxed);
        if failures > 0 {
            if let Some(tracer) = &self.tracer {
                tracer.active_span().log(
                    "tiled executor probe failures",
                    tags! { "probe_failures" => failures as i64 },
                );
            }
        }
    }
}

/// Partitions an `X × Y` node-range iteration space into
/// `block_size_x × block_size_y` tiles and schedules worker threads
/// across them with a probe/diagonal walk, optionally serializing tiles
/// that share a row or column via per-axis locks (spec.md §4.7).
///
/// Cheap to clone: internally an `Arc` over the tile grid, so the same
/// executor can drive several [`TiledExecutor::run_dense`]/
/// [`TiledExecutor::run_sparse`] calls (e.g. successive SGD epochs)
/// without rebuilding the grid, each call resuming each tile's `updates`
/// counter from where the last call left off.
#[derive(Clone)]
pub struct TiledExecutor {
    inner: Arc<Inner>,
}

impl TiledExecutor {
    /// Build the tile grid over `x_range × y_range`.
    ///
    /// # Errors
    /// Returns [`Error::EmptyRange`] if either range is empty,
    /// [`Error::ZeroBlockSize`] if either configured block size is 0, or
    /// [`Error::ZeroMaxUpdates`] if `config.max_updates_per_block` is 0.
    pub fn new(
        x_range: Range<u32>,
        y_range: Range<u32>,
        config: &TiledExecutorConfig,
        use_locks: bool,
        tracer: Option<Arc<Tracer>>,
    ) -> Result<Self> {
        if x_range.is_empty() {
            return Err(Error::EmptyRange { axis: "x" });
        }
        if y_range.is_empty() {
            return Err(Error::EmptyRange { axis: "y" });
        }
        if config.block_size_x == 0 {
            return Err(Error::ZeroBlockSize { axis: "x" });
        }
        if config.block_size_y == 0 {
            return Err(Error::ZeroBlockSize { axis: "y" });
        }
        if config.max_updates_per_block == 0 {
            return Err(Error::ZeroMaxUpdates);
        }

        let x_len = (x_range.end - x_range.start) as usize;
        let y_len = (y_range.end - y_range.start) as usize;
        let num_x_blocks = x_len.div_ceil(config.block_size_x);
        let num_y_blocks = y_len.div_ceil(config.block_size_y);

        let mut tiles = Vec::with_capacity(num_x_blocks * num_y_blocks);
        for tx in 0..num_x_blocks {
            let tx_start = x_range.start + (tx * config.block_size_x) as u32;
            let tx_end = (x_range.start + ((tx + 1) * config.block_size_x) as u32).min(x_range.end);
            for ty in 0..num_y_blocks {
                let ty_start = y_range.start + (ty * config.block_size_y) as u32;
                let ty_end =
                    (y_range.start + ((ty + 1) * config.block_size_y) as u32).min(y_range.end);
                tiles.push(Tile::new(TileCoord { tx, ty }, tx_start..tx_end, ty_start..ty_end));
            }
        }
        let lock_x = (0..num_x_blocks).map(|_| Mutex::new(())).collect();
        let lock_y = (0..num_y_blocks).map(|_| Mutex::new(())).collect();

        Ok(Self {
            inner: Arc::new(Inner {
                tiles,
                lock_x,
                lock_y,
                num_x_blocks,
                num_y_blocks,
                max_updates: config.max_updates_per_block,
                use_locks,
                probe_failures: AtomicUsize::new(0),
                tracer,
            }),
        })
    }

    /// Number of tiles along the X axis.
    #[must_use]
    pub fn num_x_blocks(&self) -> usize {
        self.inner.num_x_blocks
    }

    /// Number of tiles along the Y axis.
    #[must_use]
    pub fn num_y_blocks(&self) -> usize {
        self.inner.num_y_blocks
    }

    /// Whether this executor serializes tiles sharing a row or column.
    #[must_use]
    pub fn use_locks(&self) -> bool {
        self.inner.use_locks
    }

    /// Run `body(x_node, y_node)` over every `(x, y)` pair in every tile,
    /// unconditionally (the dense form; spec.md §4.7 / SPEC_FULL item 4).
    pub fn run_dense<F>(&self, pool: &ThreadPool, body: F) -> TiledExecutorReport
    where
        F: Fn(u32, u32) + Send + Sync + 'static,
    {
        let inner = self.inner.clone();
        let topology = pool.topology().clone();
        let body = Arc::new(body);
        pool.on_each(move |thread_id, _total_threads| {
            let body = body.clone();
            inner.run_worker(thread_id, &topology, move |tile: &Tile| {
                for x in tile.x_range.clone() {
                    for y in tile.y_range.clone() {
                        body(x, y);
                    }
                }
            });
        });
        self.inner.report()
    }

    /// Run `body(x_node, y_node)` once per real edge landing inside each
    /// tile, skipping pairs with no edge (the sparse form; spec.md §4.7).
    /// `rows` supplies each `x_node`'s sorted neighbor list; the
    /// lower-bound offset into it is computed once per tile and cached.
    pub fn run_sparse<R, F>(&self, pool: &ThreadPool, rows: Arc<R>, body: F) -> TiledExecutorReport
    where
        R: RowSource + 'static,
        F: Fn(u32, u32) + Send + Sync + 'static,
    {
        let inner = self.inner.clone();
        let topology = pool.topology().clone();
        let body = Arc::new(body);
        pool.on_each(move |thread_id, _total_threads| {
            let body = body.clone();
            let rows = rows.clone();
            inner.run_worker(thread_id, &topology, move |tile: &Tile| {
                let y_start = tile.y_range.start;
                let rows_for_offsets = rows.clone();
                let offsets = tile.row_start_offsets(move |x_node| {
                    let row = rows_for_offsets.row(x_node);
                    row.partition_point(|&dest| dest < y_start)
                });
                for (i, x) in tile.x_range.clone().enumerate() {
                    let row = rows.row(x);
                    let mut j = offsets[i];
                    while j < row.len() && row[j] < tile.y_range.end {
                        body(x, row[j]);
                        j += 1;
                    }
                }
            });
        });
        self.inner.report()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use katana_runtime::{ThreadPool, Topology};
    use std::collections::HashSet;
    use std::sync::Mutex as StdMutex;

    fn config(block_x: usize, block_y: usize, max_updates: usize) -> TiledExecutorConfig {
        TiledExecutorConfig {
            block_size_x: block_x,
            block_size_y: block_y,
            max_updates_per_block: max_updates,
        }
    }

    #[test]
    fn rejects_empty_range() {
        let err = TiledExecutor::new(0..0, 0..10, &config(4, 4, 1), false, None).unwrap_err();
        assert!(matches!(err, Error::EmptyRange { axis: "x" }));
    }

    #[test]
    fn rejects_zero_block_size() {
        let err = TiledExecutor::new(0..10, 0..10, &config(0, 4, 1), false, None).unwrap_err();
        assert!(matches!(err, Error::ZeroBlockSize { axis: "x" }));
    }

    #[test]
    fn rejects_zero_max_updates() {
        let err = TiledExecutor::new(0..10, 0..10, &config(4, 4, 0), false, None).unwrap_err();
        assert!(matches!(err, Error::ZeroMaxUpdates));
    }

    #[test]
    fn grid_dimensions_cover_a_trailing_short_block() {
        let executor = TiledExecutor::new(0..10, 0..10, &config(4, 4, 1), false, None).unwrap();
        assert_eq!(executor.num_x_blocks(), 3);
        assert_eq!(executor.num_y_blocks(), 3);
    }

    #[test]
    fn dense_every_tile_reaches_target_without_locking() {
        let pool = ThreadPool::with_topology(Topology::single_socket(4), false, false, None);
        let executor = TiledExecutor::new(0..20, 0..20, &config(5, 5, 3), false, None).unwrap();
        let seen: Arc<StdMutex<HashSet<(u32, u32)>>> = Arc::new(StdMutex::new(HashSet::new()));
        let seen_clone = seen.clone();
        let report = executor.run_dense(&pool, move |x, y| {
            seen_clone.lock().unwrap().insert((x, y));
        });
        assert_eq!(report.tiles_short_of_target, 0);
        // Every (x, y) pair in the space was visited at least once.
        assert_eq!(seen.lock().unwrap().len(), 20 * 20);
        pool.shutdown();
    }

    #[test]
    fn dense_respects_max_updates_per_block() {
        let pool = ThreadPool::with_topology(Topology::single_socket(4), false, false, None);
        let executor = TiledExecutor::new(0..8, 0..8, &config(4, 4, 2), false, None).unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        let report = executor.run_dense(&pool, move |_x, _y| {
            calls_clone.fetch_add(1, Ordering::Relaxed);
        });
        // 4 tiles (2x2 grid) * 2 updates each * 16 (x,y) pairs per tile.
        assert_eq!(calls.load(Ordering::Relaxed), 4 * 2 * 16);
        assert_eq!(report.tiles_short_of_target, 0);
        pool.shutdown();
    }

    struct VecRows(Vec<Vec<u32>>);
    impl RowSource for VecRows {
        fn row(&self, node: u32) -> &[u32] {
            &self.0[node as usize]
        }
    }

    #[test]
    fn sparse_only_calls_body_on_real_edges() {
        let pool = ThreadPool::with_topology(Topology::single_socket(2), false, false, None);
        // node 0 -> {1, 3}, node 1 -> {}, node 2 -> {2}, node 3 -> {0}
        let rows = Arc::new(VecRows(vec![vec![1, 3], vec![], vec![2], vec![0]]));
        let executor = TiledExecutor::new(0..4, 0..4, &config(2, 2, 1), false, None).unwrap();
        let seen: Arc<StdMutex<Vec<(u32, u32)>>> = Arc::new(StdMutex::new(Vec::new()));
        let seen_clone = seen.clone();
        let report = executor.run_sparse(&pool, rows, move |x, y| {
            seen_clone.lock().unwrap().push((x, y));
        });
        let mut got = seen.lock().unwrap().clone();
        got.sort_unstable();
        assert_eq!(got, vec![(0, 1), (0, 3), (2, 2), (3, 0)]);
        assert_eq!(report.tiles_short_of_target, 0);
        pool.shutdown();
    }

    #[test]
    fn locking_never_exceeds_max_updates_and_reports_no_shortfall_when_static() {
        let pool = ThreadPool::with_topology(Topology::single_socket(4), false, false, None);
        let executor = TiledExecutor::new(0..12, 0..12, &config(3, 3, 2), true, None).unwrap();
        let report = executor.run_dense(&pool, |_x, _y| {});
        assert_eq!(report.tiles_short_of_target, 0);
        pool.shutdown();
    }
}
