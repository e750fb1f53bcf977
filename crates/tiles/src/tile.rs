// Copyright Katana Graph Authors
// SPDX-License-Identifier: Apache-2.0

//! A single block of the 2-D iteration space (spec.md §4.7, "Internal model").

use std::ops::Range;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use once_cell::sync::OnceCell;

/// Coordinates of a tile within the `num_x_blocks × num_y_blocks` grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileCoord {
    /// Index along the X axis.
    pub tx: usize,
    /// Index along the Y axis.
    pub ty: usize,
}

/// One block of the grid: its node ranges, an atomic update counter, a
/// claim flag guarding against two workers running its body concurrently,
/// and (for sparse execution) a once-populated cache of each row's
/// starting offset into the tile's Y range.
pub(crate) struct Tile {
    pub(crate) coord: TileCoord,
    pub(crate) x_range: Range<u32>,
    pub(crate) y_range: Range<u32>,
    updates: AtomicUsize,
    claimed: AtomicBool,
    row_offsets: OnceCell<Vec<usize>>,
}

impl Tile {
    pub(crate) fn new(coord: TileCoord, x_range: Range<u32>, y_range: Range<u32>) -> Self {
        Self {
            coord,
            x_range,
            y_range,
            updates: AtomicUsize::new(0),
            claimed: AtomicBool::new(false),
            row_offsets: OnceCell::new(),
        }
    }

    /// This tile's grid coordinates.
    pub(crate) fn coord(&self) -> TileCoord {
        self.coord
    }

    /// Total updates applied to this tile so far.
    pub(crate) fn updates(&self) -> usize {
        self.updates.load(Ordering::Relaxed)
    }

    pub(crate) fn is_below_target(&self, max_updates: usize) -> bool {
        self.updates() < max_updates
    }

    /// Attempt to claim this tile for one worker. Returns `true` if the
    /// caller now owns it and must call [`Tile::release`] when done.
    pub(crate) fn try_claim(&self) -> bool {
        self.claimed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Record one completed update and release the claim taken by
    /// [`Tile::try_claim`].
    pub(crate) fn release_after_update(&self) {
        self.updates.fetch_add(1, Ordering::Relaxed);
        self.claimed.store(false, Ordering::Release);
    }

    /// Release a claim without recording an update (probe found the tile
    /// ineligible after all, or lock acquisition failed).
    pub(crate) fn release_without_update(&self) {
        self.claimed.store(false, Ordering::Release);
    }

    /// The per-row starting offset into `row` (sorted ascending) at which
    /// destinations first reach this tile's Y range, computed once and
    /// cached for the lifetime of the tile (spec.md §4.7, "a binary-search
    /// cache populated once").
    pub(crate) fn row_start_offsets(&self, rows: impl Fn(u32) -> usize) -> &[usize] {
        self.row_offsets
            .get_or_init(move || self.x_range.clone().map(rows).collect())
    }
}
