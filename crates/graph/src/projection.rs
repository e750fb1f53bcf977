// Copyright Katana Graph Authors
// SPDX-License-Identifier: Apache-2.0

//! Logical projections over a [`crate::PropertyGraph`] by entity type
//! (spec.md §4.8, `MakeProjectedGraph`).

use roaring::RoaringBitmap;

use crate::error::{Error, Result};
use crate::graph::PropertyGraph;

/// A read-only, logical view over a subset of a graph's nodes and edges,
/// selected by atomic entity type. Shares the underlying graph's storage;
/// no data is copied (spec.md §4.8: "logical... shares storage").
pub struct ProjectedView<'g> {
    graph: &'g PropertyGraph,
    selected_node_types: Option<RoaringBitmap>,
    selected_edge_types: Option<RoaringBitmap>,
}

impl<'g> ProjectedView<'g> {
    /// Resolve `node_type_names`/`edge_type_names` against `graph`'s
    /// registries and build a view. An empty slice selects all records of
    /// that role.
    ///
    /// # Errors
    /// Returns [`Error::PropertyNotFound`] if a name was never registered
    /// as an atomic type on the corresponding role.
    pub(crate) fn new(
        graph: &'g PropertyGraph,
        node_type_names: &[&str],
        edge_type_names: &[&str],
    ) -> Result<Self> {
        let selected_node_types = Self::resolve(graph, node_type_names, true)?;
        let selected_edge_types = Self::resolve(graph, edge_type_names, false)?;
        Ok(Self {
            graph,
            selected_node_types,
            selected_edge_types,
        })
    }

    fn resolve(graph: &PropertyGraph, names: &[&str], is_node: bool) -> Result<Option<RoaringBitmap>> {
        if names.is_empty() {
            return Ok(None);
        }
        let registry = if is_node {
            graph.node_entity_types()
        } else {
            graph.edge_entity_types()
        };
        let mut bitmap = RoaringBitmap::new();
        for &name in names {
            let id = registry.atomic_type_id(name).ok_or_else(|| Error::PropertyNotFound {
                role: if is_node { katana_cache::Role::Node } else { katana_cache::Role::Edge },
                name: name.to_string(),
            })?;
            bitmap.insert(id);
        }
        Ok(Some(bitmap))
    }

    /// Whether `node` is visible through this projection: an unselected
    /// role (empty `node_type_names` at construction) admits every node;
    /// otherwise a node is visible iff its entity type shares at least one
    /// atomic type with the selection (spec.md §8, scenario S6).
    #[must_use]
    pub fn node_is_visible(&self, node: u32) -> bool {
        match &self.selected_node_types {
            None => true,
            Some(selected) => self
                .graph
                .node_entity_types()
                .intersects(self.graph.node_type_id(node), selected),
        }
    }

    /// Whether the edge at position `edge` is visible through this
    /// projection. See [`ProjectedView::node_is_visible`].
    #[must_use]
    pub fn edge_is_visible(&self, edge: usize) -> bool {
        match &self.selected_edge_types {
            None => true,
            Some(selected) => self
                .graph
                .edge_entity_types()
                .intersects(self.graph.edge_type_id(edge), selected),
        }
    }

    /// Node IDs visible through this projection, in underlying order
    /// (spec.md §8, scenario S6: "iteration order preserves the underlying
    /// order").
    pub fn nodes(&self) -> impl Iterator<Item = u32> + '_ {
        (0..self.graph.topology().num_nodes() as u32).filter(|&n| self.node_is_visible(n))
    }

    /// Neighbors of `node` restricted to edges (and destination nodes)
    /// visible through this projection.
    pub fn neighbors(&self, node: u32) -> impl Iterator<Item = u32> + '_ {
        let range = self.graph.topology().edge_range(node);
        let dest = self.graph.topology().out_dest();
        range
            .clone()
            .filter(move |&edge| self.edge_is_visible(edge))
            .map(move |edge| dest[edge])
            .filter(move |&n| self.node_is_visible(n))
    }
}
