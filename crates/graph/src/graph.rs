// Copyright Katana Graph Authors
// SPDX-License-Identifier: Apache-2.0

//! [`PropertyGraph`]: binds a CSR topology to per-role property tables and
//! entity-type registries over the same row order (spec.md §3, "Graph").

use std::sync::Arc;

use arrow::array::{ArrayRef, BooleanArray};
use katana_cache::{CacheKey, PropertyManager, Role};
use katana_tracer::{Tracer, tags};

use crate::columns::PropertyTable;
use crate::entity_types::{EntityTypeId, EntityTypeRegistry};
use crate::error::{Error, Result};
use crate::projection::ProjectedView;
use crate::topology::Csr;

/// Default width property columns are chunked at when none is supplied to
/// [`PropertyGraph::new`] (matches
/// `katana_config::policy::ChunkConfig::property_chunk_width`'s default).
pub const DEFAULT_PROPERTY_CHUNK_WIDTH: usize = 25_000;

/// A column-oriented property graph: one CSR topology plus node and edge
/// property tables and entity-type registries aligned with it (spec.md §3,
/// "Graph"). Node IDs are indices `0..topology.num_nodes()`; edge IDs are
/// indices `0..topology.num_edges()` into the topology's `out_dest`.
pub struct PropertyGraph {
    identity: String,
    topology: Csr,
    node_properties: PropertyTable,
    edge_properties: PropertyTable,
    node_types: EntityTypeRegistry,
    edge_types: EntityTypeRegistry,
    node_type_ids: Vec<EntityTypeId>,
    edge_type_ids: Vec<EntityTypeId>,
    chunk_width: usize,
    property_manager: Option<Arc<PropertyManager<ArrayRef>>>,
    tracer: Option<Arc<Tracer>>,
}

impl PropertyGraph {
    /// Build a graph over `topology` with empty property tables and entity
    /// types, identified by `identity` (its root URI, typically; used as
    /// the `graph_identity` component of cache keys).
    #[must_use]
    pub fn new(identity: impl Into<String>, topology: Csr) -> Self {
        Self::with_chunk_width(identity, topology, DEFAULT_PROPERTY_CHUNK_WIDTH)
    }

    /// Like [`PropertyGraph::new`], chunking property columns at `chunk_width`
    /// rows instead of the default.
    #[must_use]
    pub fn with_chunk_width(identity: impl Into<String>, topology: Csr, chunk_width: usize) -> Self {
        let num_nodes = topology.num_nodes();
        let num_edges = topology.num_edges();
        let node_types = EntityTypeRegistry::new();
        let edge_types = EntityTypeRegistry::new();
        Self {
            identity: identity.into(),
            node_properties: PropertyTable::new(Role::Node, num_nodes),
            edge_properties: PropertyTable::new(Role::Edge, num_edges),
            node_type_ids: vec![node_types.empty_entity_type(); num_nodes],
            edge_type_ids: vec![edge_types.empty_entity_type(); num_edges],
            node_types,
            edge_types,
            topology,
            chunk_width,
            property_manager: None,
            tracer: None,
        }
    }

    /// Attach a property manager so that added properties borrow active
    /// memory through it, and evicted properties (see
    /// [`PropertyGraph::evict_node_property`]) go through its standby cache.
    #[must_use]
    pub fn with_property_manager(mut self, manager: Arc<PropertyManager<ArrayRef>>) -> Self {
        self.property_manager = Some(manager);
        self
    }

    /// Attach a tracer used to log mutation and sort operations.
    #[must_use]
    pub fn with_tracer(mut self, tracer: Arc<Tracer>) -> Self {
        self.tracer = Some(tracer);
        self
    }

    /// The stable identity string this graph was constructed with.
    #[must_use]
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// The underlying CSR topology.
    #[must_use]
    pub fn topology(&self) -> &Csr {
        &self.topology
    }

    /// The node property table.
    #[must_use]
    pub fn node_properties(&self) -> &PropertyTable {
        &self.node_properties
    }

    /// The edge property table.
    #[must_use]
    pub fn edge_properties(&self) -> &PropertyTable {
        &self.edge_properties
    }

    /// The node entity-type registry.
    #[must_use]
    pub fn node_entity_types(&self) -> &EntityTypeRegistry {
        &self.node_types
    }

    /// The edge entity-type registry.
    #[must_use]
    pub fn edge_entity_types(&self) -> &EntityTypeRegistry {
        &self.edge_types
    }

    /// The interned entity-type ID of `node`.
    #[must_use]
    pub fn node_type_id(&self, node: u32) -> EntityTypeId {
        self.node_type_ids[node as usize]
    }

    /// The interned entity-type ID of edge at position `edge`.
    #[must_use]
    pub fn edge_type_id(&self, edge: usize) -> EntityTypeId {
        self.edge_type_ids[edge]
    }

    /// Register a node atomic type, returning its ID (idempotent).
    pub fn register_node_atomic_type(&mut self, name: impl Into<String>) -> u32 {
        self.node_types.register_atomic_type(name)
    }

    /// Register an edge atomic type, returning its ID (idempotent).
    pub fn register_edge_atomic_type(&mut self, name: impl Into<String>) -> u32 {
        self.edge_types.register_atomic_type(name)
    }

    /// Assign each node's entity type by reading one boolean column per
    /// already-registered atomic type, in registration order.
    ///
    /// # Errors
    /// Returns [`Error::PropertyNotFound`] if a name is not a node property,
    /// or [`Error::UnsupportedColumnType`] if it is not boolean.
    pub fn assign_node_entity_types(&mut self, atomic_columns: &[&str]) -> Result<()> {
        let flags = Self::read_flag_columns(&self.node_properties, atomic_columns)?;
        for (node, row) in self.node_type_ids.iter_mut().enumerate() {
            let per_node: Vec<bool> = flags.iter().map(|column| column.value(node)).collect();
            *row = self.node_types.intern_flags(&per_node);
        }
        Ok(())
    }

    /// Assign each edge's entity type by reading one boolean column per
    /// already-registered atomic type, in registration order.
    ///
    /// # Errors
    /// Returns [`Error::PropertyNotFound`] if a name is not an edge property,
    /// or [`Error::UnsupportedColumnType`] if it is not boolean.
    pub fn assign_edge_entity_types(&mut self, atomic_columns: &[&str]) -> Result<()> {
        let flags = Self::read_flag_columns(&self.edge_properties, atomic_columns)?;
        for (edge, row) in self.edge_type_ids.iter_mut().enumerate() {
            let per_edge: Vec<bool> = flags.iter().map(|column| column.value(edge)).collect();
            *row = self.edge_types.intern_flags(&per_edge);
        }
        Ok(())
    }

    fn read_flag_columns(table: &PropertyTable, names: &[&str]) -> Result<Vec<BooleanArray>> {
        names
            .iter()
            .map(|name| {
                let column = table.get(name)?;
                let array = column.to_contiguous()?;
                array
                    .as_any()
                    .downcast_ref::<BooleanArray>()
                    .cloned()
                    .ok_or_else(|| Error::UnsupportedColumnType {
                        role: table.role(),
                        name: (*name).to_string(),
                        reason: "expected a boolean column for an atomic-type flag".to_string(),
                    })
            })
            .collect()
    }

    /// Add a new node property column (§6, `AddNodeProperties`).
    ///
    /// # Errors
    /// Returns [`Error::AlreadyExists`] if `name` is taken, or
    /// [`Error::LengthMismatch`] if `array.len()` does not match
    /// [`Csr::num_nodes`].
    pub fn add_node_properties(&mut self, name: impl Into<String>, array: ArrayRef) -> Result<()> {
        let name = name.into();
        self.notify_property_loaded(&array);
        self.node_properties.add(name.clone(), array, self.chunk_width)?;
        self.log("node property added", &name, Role::Node);
        Ok(())
    }

    /// Add a new edge property column (§6, `AddEdgeProperties`).
    ///
    /// # Errors
    /// Returns [`Error::AlreadyExists`] if `name` is taken, or
    /// [`Error::LengthMismatch`] if `array.len()` does not match
    /// [`Csr::num_edges`].
    pub fn add_edge_properties(&mut self, name: impl Into<String>, array: ArrayRef) -> Result<()> {
        let name = name.into();
        self.notify_property_loaded(&array);
        self.edge_properties.add(name.clone(), array, self.chunk_width)?;
        self.log("edge property added", &name, Role::Edge);
        Ok(())
    }

    /// Remove a node property column outright (§6, `RemoveNodeProperty`).
    /// This is a contract-level delete, distinct from
    /// [`PropertyGraph::evict_node_property`]: it does not consult the
    /// property manager, since the data is discarded rather than moved to
    /// standby.
    ///
    /// # Errors
    /// Returns [`Error::PropertyNotFound`] if `name` is not present.
    pub fn remove_node_property(&mut self, name: &str) -> Result<ArrayRef> {
        let column = self.node_properties.remove(name)?;
        self.log("node property removed", name, Role::Node);
        column.to_contiguous()
    }

    /// Remove an edge property column outright (§6, `RemoveEdgeProperty`).
    ///
    /// # Errors
    /// Returns [`Error::PropertyNotFound`] if `name` is not present.
    pub fn remove_edge_property(&mut self, name: &str) -> Result<ArrayRef> {
        let column = self.edge_properties.remove(name)?;
        self.log("edge property removed", name, Role::Edge);
        column.to_contiguous()
    }

    /// Read a node property column (§6, `GetNodeProperty`).
    ///
    /// # Errors
    /// Returns [`Error::PropertyNotFound`] if `name` is not present.
    pub fn get_node_property(&self, name: &str) -> Result<ArrayRef> {
        self.node_properties.get(name)?.to_contiguous()
    }

    /// Read an edge property column (§6, `GetEdgeProperty`).
    ///
    /// # Errors
    /// Returns [`Error::PropertyNotFound`] if `name` is not present.
    pub fn get_edge_property(&self, name: &str) -> Result<ArrayRef> {
        self.edge_properties.get(name)?.to_contiguous()
    }

    /// Move a resident node property to the standby cache, keeping it
    /// reloadable via [`PropertyGraph::reload_node_property`]. A no-op if no
    /// property manager is attached.
    ///
    /// # Errors
    /// Returns [`Error::Cache`] (`UnloadRefused`) if the supervisor's policy
    /// still reports pressure after the transition, in which case the
    /// property remains resident; [`Error::PropertyNotFound`] if `name` is
    /// not present.
    pub fn evict_node_property(&mut self, name: &str) -> Result<()> {
        let Some(manager) = self.property_manager.clone() else {
            return Ok(());
        };
        let column = self.node_properties.get(name)?.to_contiguous()?;
        let key = CacheKey::new(Role::Node, self.identity.clone(), name.to_string());
        manager.unload_property(key, column)?;
        self.node_properties.remove(name)?;
        Ok(())
    }

    /// Move a resident edge property to the standby cache. See
    /// [`PropertyGraph::evict_node_property`].
    ///
    /// # Errors
    /// Same as [`PropertyGraph::evict_node_property`].
    pub fn evict_edge_property(&mut self, name: &str) -> Result<()> {
        let Some(manager) = self.property_manager.clone() else {
            return Ok(());
        };
        let column = self.edge_properties.get(name)?.to_contiguous()?;
        let key = CacheKey::new(Role::Edge, self.identity.clone(), name.to_string());
        manager.unload_property(key, column)?;
        self.edge_properties.remove(name)?;
        Ok(())
    }

    /// Try to bring a previously evicted node property back to residency
    /// from the standby cache, re-adding it under `name`. Returns `false`
    /// if it was not cached (or no property manager is attached).
    ///
    /// # Errors
    /// Returns [`Error::Memory`] on a lost manager registration, or
    /// [`Error::LengthMismatch`] if the cached column no longer matches
    /// this topology's node count.
    pub fn reload_node_property(&mut self, name: &str) -> Result<bool> {
        let Some(manager) = self.property_manager.clone() else {
            return Ok(false);
        };
        let key = CacheKey::new(Role::Node, self.identity.clone(), name.to_string());
        let Some(array) = manager.add_property(&key)? else {
            return Ok(false);
        };
        self.node_properties.add(name.to_string(), array, self.chunk_width)?;
        Ok(true)
    }

    /// Try to bring a previously evicted edge property back to residency.
    /// See [`PropertyGraph::reload_node_property`].
    ///
    /// # Errors
    /// Same as [`PropertyGraph::reload_node_property`].
    pub fn reload_edge_property(&mut self, name: &str) -> Result<bool> {
        let Some(manager) = self.property_manager.clone() else {
            return Ok(false);
        };
        let key = CacheKey::new(Role::Edge, self.identity.clone(), name.to_string());
        let Some(array) = manager.add_property(&key)? else {
            return Ok(false);
        };
        self.edge_properties.add(name.to_string(), array, self.chunk_width)?;
        Ok(true)
    }

    /// Sort every node's adjacency by destination, permuting edge property
    /// columns and edge entity types to stay aligned (§4.8,
    /// `SortAllEdgesByDest`). Idempotent.
    ///
    /// # Errors
    /// Returns [`Error::Arrow`] if permuting a property column fails.
    pub fn sort_all_edges_by_dest(&mut self) -> Result<()> {
        let perm = self.topology.sort_all_edges_by_dest();
        self.edge_properties = self.edge_properties.permuted(&perm)?;
        self.edge_type_ids = perm.iter().map(|&old| self.edge_type_ids[old as usize]).collect();
        self.log_plain("edges sorted by destination");
        Ok(())
    }

    /// Permute node IDs by descending degree, remapping the topology,
    /// property columns, and entity types together (§4.8,
    /// `SortNodesByDegree`).
    ///
    /// # Errors
    /// Returns [`Error::CsrInvariant`] or [`Error::Arrow`] if the underlying
    /// permutation fails.
    pub fn sort_nodes_by_degree(&mut self) -> Result<()> {
        let order = self.topology.degree_descending_order();
        self.topology = self.topology.permuted_by_node_order(&order)?;
        self.node_properties = self.node_properties.permuted(&order)?;
        self.node_type_ids = order.iter().map(|&old| self.node_type_ids[old as usize]).collect();
        self.log_plain("nodes sorted by degree");
        Ok(())
    }

    /// Build a logical projection over node and edge types named in
    /// `node_type_names`/`edge_type_names`. An empty slice selects all
    /// records of that role (§4.8, `MakeProjectedGraph`).
    ///
    /// # Errors
    /// Returns [`Error::PropertyNotFound`] if a named atomic type was never
    /// registered.
    pub fn make_projected_graph(
        &self,
        node_type_names: &[&str],
        edge_type_names: &[&str],
    ) -> Result<ProjectedView<'_>> {
        ProjectedView::new(self, node_type_names, edge_type_names)
    }

    fn notify_property_loaded(&self, array: &ArrayRef) {
        if let Some(manager) = &self.property_manager {
            let _ = manager.on_property_loaded(array.clone());
        }
    }

    fn log(&self, message: &'static str, name: &str, role: Role) {
        if let Some(tracer) = &self.tracer {
            tracer
                .active_span()
                .log(message, tags! { "graph" => self.identity.clone(), "property" => name.to_string(), "role" => format!("{role:?}") });
        }
    }

    fn log_plain(&self, message: &'static str) {
        if let Some(tracer) = &self.tracer {
            tracer
                .active_span()
                .log(message, tags! { "graph" => self.identity.clone() });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow_array::{BooleanArray as ArrowBooleanArray, Int64Array};

    fn triangle() -> Csr {
        // 0 -> 1 -> 2 -> 0
        Csr::new(vec![0, 1, 2, 3], vec![1, 2, 0]).unwrap()
    }

    fn bools(values: &[bool]) -> ArrayRef {
        Arc::new(ArrowBooleanArray::from(values.to_vec()))
    }

    fn ints(values: &[i64]) -> ArrayRef {
        Arc::new(Int64Array::from(values.to_vec()))
    }

    #[test]
    fn add_then_get_node_property_round_trips() {
        let mut graph = PropertyGraph::new("g", triangle());
        graph.add_node_properties("weight", ints(&[1, 2, 3])).unwrap();
        let back = graph.get_node_property("weight").unwrap();
        let values = back.as_any().downcast_ref::<Int64Array>().unwrap();
        assert_eq!(values.values(), &[1, 2, 3]);
    }

    #[test]
    fn add_node_properties_rejects_length_mismatch() {
        let mut graph = PropertyGraph::new("g", triangle());
        let err = graph.add_node_properties("weight", ints(&[1, 2])).unwrap_err();
        assert!(matches!(err, Error::LengthMismatch { .. }));
    }

    #[test]
    fn remove_then_get_is_not_found() {
        let mut graph = PropertyGraph::new("g", triangle());
        graph.add_node_properties("weight", ints(&[1, 2, 3])).unwrap();
        graph.remove_node_property("weight").unwrap();
        assert!(graph.get_node_property("weight").is_err());
    }

    #[test]
    fn entity_types_assigned_from_boolean_columns() {
        let mut graph = PropertyGraph::new("g", triangle());
        graph.register_node_atomic_type("A");
        graph.register_node_atomic_type("B");
        graph
            .add_node_properties("is_a", bools(&[true, true, false]))
            .unwrap();
        graph
            .add_node_properties("is_b", bools(&[false, true, false]))
            .unwrap();
        graph.assign_node_entity_types(&["is_a", "is_b"]).unwrap();

        let only_a = graph.node_type_id(0);
        let both = graph.node_type_id(1);
        let neither = graph.node_type_id(2);
        assert_eq!(neither, graph.node_entity_types().empty_entity_type());
        assert_ne!(only_a, both);
        assert_ne!(only_a, neither);
    }

    #[test]
    fn sort_all_edges_by_dest_keeps_edge_properties_aligned() {
        let mut graph = PropertyGraph::with_chunk_width(
            "g",
            Csr::new(vec![0, 3], vec![2, 0, 1]).unwrap(),
            8,
        );
        graph.add_edge_properties("label", ints(&[20, 0, 1])).unwrap();
        graph.sort_all_edges_by_dest().unwrap();
        assert_eq!(graph.topology().neighbors(0), &[0, 1, 2]);
        let labels = graph.get_edge_property("label").unwrap();
        let values = labels.as_any().downcast_ref::<Int64Array>().unwrap();
        assert_eq!(values.values(), &[0, 1, 20]);
    }

    #[test]
    fn sort_nodes_by_degree_keeps_node_properties_aligned() {
        // node 0: degree 1, node 1: degree 2, node 2: degree 0.
        let mut graph = PropertyGraph::with_chunk_width(
            "g",
            Csr::new(vec![0, 1, 3, 3], vec![1, 0, 2]).unwrap(),
            8,
        );
        graph.add_node_properties("id", ints(&[100, 101, 102])).unwrap();
        graph.sort_nodes_by_degree().unwrap();
        // new order: old 1 (degree 2) first, then old 0 (degree 1), then old 2.
        let ids = graph.get_node_property("id").unwrap();
        let values = ids.as_any().downcast_ref::<Int64Array>().unwrap();
        assert_eq!(values.values(), &[101, 100, 102]);
    }
}
