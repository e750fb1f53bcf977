// Copyright Katana Graph Authors
// SPDX-License-Identifier: Apache-2.0

//! Errors for the property graph, entity-type registry, and property loader.

use katana_cache::Role;
use miette::Diagnostic;

/// Errors returned by [`crate::PropertyGraph`] and the property loader.
#[derive(thiserror::Error, Debug, Diagnostic)]
pub enum Error {
    /// `AddNodeProperties`/`AddEdgeProperties` was called for a name already
    /// present on that role's property table (§4.3: "Attempting to add a
    /// property that is not absent fails with `ALREADY_EXISTS`").
    #[error("{role:?} property {name:?} already exists")]
    #[diagnostic(code(katana_graph::already_exists), url(docsrs))]
    AlreadyExists { role: Role, name: String },

    /// `RemoveNodeProperty`/`RemoveEdgeProperty`/`GetNodeProperty`/
    /// `GetEdgeProperty` referenced a name that is not present.
    #[error("{role:?} property {name:?} not found")]
    #[diagnostic(code(katana_graph::property_not_found), url(docsrs))]
    PropertyNotFound { role: Role, name: String },

    /// A property column's length does not match the topology's node or
    /// edge count.
    #[error("{role:?} property {name:?} has length {actual}, expected {expected}")]
    #[diagnostic(code(katana_graph::length_mismatch), url(docsrs))]
    LengthMismatch {
        role: Role,
        name: String,
        expected: usize,
        actual: usize,
    },

    /// A column's declared Arrow type is not one this storage-format
    /// version allows to be loaded (§4.3: "load... aborts (an internal
    /// consistency check)" — represented as a typed error rather than a
    /// panic, per the error-propagation discipline of §7).
    #[error("unsupported column type for {role:?} property {name:?}: {reason}")]
    #[diagnostic(code(katana_graph::unsupported_column_type), url(docsrs))]
    UnsupportedColumnType {
        role: Role,
        name: String,
        reason: String,
    },

    /// A stored property's field name did not match the `expected_name`
    /// argument given to `LoadProperties`/`LoadPropertySlice` (§6: "the
    /// only contract is that a property column... exposes a single field
    /// whose name must equal the `expected_name` argument").
    #[error("invalid argument: stored field name {actual:?} does not match expected {expected:?}")]
    #[diagnostic(code(katana_graph::invalid_argument), url(docsrs))]
    InvalidArgument { expected: String, actual: String },

    /// A requested property slice falls outside the stored table's bounds.
    #[error("slice [{offset}, {end}) out of bounds for table of length {table_length}")]
    #[diagnostic(code(katana_graph::slice_out_of_bounds), url(docsrs))]
    SliceOutOfBounds {
        offset: usize,
        end: usize,
        table_length: usize,
    },

    /// The CSR topology failed an invariant check (monotone `out_index`,
    /// bounds, or a sortedness precondition a caller relied on).
    #[error("CSR topology invariant violated: {0}")]
    #[diagnostic(code(katana_graph::csr_invariant), url(docsrs))]
    CsrInvariant(String),

    /// No entry was found in storage for a requested property.
    #[error("no stored entry at uri {uri:?} named {name:?}")]
    #[diagnostic(code(katana_graph::storage_not_found), url(docsrs))]
    StorageNotFound { uri: String, name: String },

    /// An Arrow operation (cast, concatenation, slice, take) failed.
    #[error(transparent)]
    #[diagnostic(code(katana_graph::arrow))]
    Arrow(#[from] arrow::error::ArrowError),

    /// The underlying [`katana_memory::MemorySupervisor`] rejected or could
    /// not locate this graph's property manager registration.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Memory(#[from] katana_memory::Error),

    /// The property cache / manager layer refused a load or unload.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Cache(#[from] katana_cache::Error),
}

/// Convenience alias for fallible graph operations.
pub type Result<T> = std::result::Result<T, Error>;
