// Copyright Katana Graph Authors
// SPDX-License-Identifier: Apache-2.0

//! Errors for 2-D tiled executor construction.

use miette::Diagnostic;

/// Errors returned by [`crate::TiledExecutor::new`].
#[derive(thiserror::Error, Debug, Diagnostic)]
pub enum Error {
    /// A requested axis range is empty; there is no iteration space to tile.
    #[error("{axis} range is empty")]
    #[diagnostic(code(katana_tiles::empty_range), url(docsrs))]
    EmptyRange {
        /// Which axis was empty (`"x"` or `"y"`).
        axis: &'static str,
    },

    /// A block size of zero would produce an unbounded number of tiles.
    #[error("{axis} block size must be greater than 0")]
    #[diagnostic(code(katana_tiles::zero_block_size), url(docsrs))]
    ZeroBlockSize {
        /// Which axis's block size was zero (`"x"` or `"y"`).
        axis: &'static str,
    },

    /// `max_updates_per_block` of zero means no tile can ever become
    /// eligible; every run would terminate immediately with every tile
    /// short of its (unreachable) target.
    #[error("max_updates_per_block must be greater than 0")]
    #[diagnostic(code(katana_tiles::zero_max_updates), url(docsrs))]
    ZeroMaxUpdates,
}

/// Convenience alias for fallible tiled-executor operations.
pub type Result<T> = std::result::Result<T, Error>;
