// Copyright Katana Graph Authors
// SPDX-License-Identifier: Apache-2.0

//! Column-oriented property graph.
//!
//! Layered from the storage up:
//!
//! - [`topology`]: the CSR adjacency ([`Csr`]) node and edge IDs are
//!   indices into.
//! - [`columns`]: chunked Arrow property columns ([`ChunkedColumn`]) and
//!   the per-role [`PropertyTable`] that owns a named set of them.
//! - [`entity_types`]: interns atomic-type combinations into small
//!   [`EntityTypeId`]s ([`EntityTypeRegistry`]).
//! - [`graph`]: [`PropertyGraph`] binds all three into one graph, with the
//!   mutation and sort API.
//! - [`projection`]: [`ProjectedView`], a logical read-only subset of a
//!   graph selected by entity type.
//! - [`loader`]: [`PropertyStore`] and the `LoadProperties`/
//!   `LoadPropertySlice` free functions, against an in-memory stand-in.

pub mod columns;
pub mod entity_types;
pub mod error;
pub mod graph;
pub mod loader;
pub mod projection;
pub mod topology;

pub use columns::{ChunkedColumn, PropertyTable};
pub use entity_types::{AtomicTypeId, EntityTypeId, EntityTypeRegistry, EMPTY_ENTITY_TYPE};
pub use error::{Error, Result};
pub use graph::PropertyGraph;
pub use loader::{load_properties, load_property_slice, InMemoryPropertyStore, PropertyStore, StoredProperty};
pub use projection::ProjectedView;
pub use topology::Csr;
