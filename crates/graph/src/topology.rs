// Copyright Katana Graph Authors
// SPDX-License-Identifier: Apache-2.0

//! Immutable-shape CSR topology (spec.md §3, "Topology").

use crate::error::{Error, Result};

/// Compressed sparse row graph topology.
///
/// `out_index` has length `num_nodes + 1` and is monotone non-decreasing,
/// with `out_index[0] == 0` and `out_index[num_nodes] == out_dest.len()`.
/// `out_dest` holds, for each node `n`, its neighbors at
/// `out_index[n]..out_index[n + 1]`. Sortedness of each node's adjacency
/// slice by destination is established by [`Csr::sort_all_edges_by_dest`],
/// not enforced by construction (spec.md §3: "a sort step establishes it").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Csr {
    out_index: Vec<u64>,
    out_dest: Vec<u32>,
}

impl Csr {
    /// Build a CSR from raw index/destination arrays.
    ///
    /// # Errors
    /// Returns [`Error::CsrInvariant`] if `out_index` is not of length
    /// `out_dest.len()`-consistent, non-decreasing, zero-started, or if any
    /// destination is out of range.
    pub fn new(out_index: Vec<u64>, out_dest: Vec<u32>) -> Result<Self> {
        let Some(&first) = out_index.first() else {
            return Err(Error::CsrInvariant("out_index must not be empty".to_string()));
        };
        if first != 0 {
            return Err(Error::CsrInvariant("out_index[0] must be 0".to_string()));
        }
        let num_nodes = out_index.len() - 1;
        for window in out_index.windows(2) {
            if window[1] < window[0] {
                return Err(Error::CsrInvariant("out_index must be monotone non-decreasing".to_string()));
            }
        }
        let last = out_index[num_nodes];
        if last as usize != out_dest.len() {
            return Err(Error::CsrInvariant(format!(
                "out_index[num_nodes] ({last}) must equal out_dest.len() ({})",
                out_dest.len()
            )));
        }
        let num_nodes_u32 = u32::try_from(num_nodes)
            .map_err(|_| Error::CsrInvariant("num_nodes exceeds u32::MAX".to_string()))?;
        if out_dest.iter().any(|&dest| dest >= num_nodes_u32) {
            return Err(Error::CsrInvariant("out_dest contains an out-of-range node id".to_string()));
        }
        Ok(Self { out_index, out_dest })
    }

    /// Number of nodes.
    #[must_use]
    pub fn num_nodes(&self) -> usize {
        self.out_index.len() - 1
    }

    /// Number of edges.
    #[must_use]
    pub fn num_edges(&self) -> usize {
        self.out_dest.len()
    }

    /// The half-open edge range `[out_index[n], out_index[n+1])` for node `n`.
    #[must_use]
    pub fn edge_range(&self, node: u32) -> std::ops::Range<usize> {
        let n = node as usize;
        self.out_index[n] as usize..self.out_index[n + 1] as usize
    }

    /// Neighbor (destination) node IDs of `node`.
    #[must_use]
    pub fn neighbors(&self, node: u32) -> &[u32] {
        &self.out_dest[self.edge_range(node)]
    }

    /// Out-degree of `node`.
    #[must_use]
    pub fn degree(&self, node: u32) -> u32 {
        self.edge_range(node).len() as u32
    }

    /// Raw `out_index` array.
    #[must_use]
    pub fn out_index(&self) -> &[u64] {
        &self.out_index
    }

    /// Raw `out_dest` array.
    #[must_use]
    pub fn out_dest(&self) -> &[u32] {
        &self.out_dest
    }

    /// Whether every node's adjacency slice is already sorted by
    /// destination (non-decreasing; multi-edges are allowed).
    #[must_use]
    pub fn is_sorted_by_dest(&self) -> bool {
        (0..self.num_nodes() as u32).all(|n| self.out_dest[self.edge_range(n)].is_sorted())
    }

    /// Sort every node's adjacency slice by destination in place. Idempotent
    /// (spec.md §3/§4.8): calling it again on an already-sorted topology is
    /// a no-op modulo a stable re-ordering of ties.
    ///
    /// Returns a permutation `perm` of length `num_edges()` such that the
    /// new edge at position `i` was the old edge at position `perm[i]`;
    /// callers permute edge property columns and the edge entity-type array
    /// with this same permutation to keep them aligned with the reordered
    /// `out_dest` (spec.md §4.8, sort contract).
    pub fn sort_all_edges_by_dest(&mut self) -> Vec<u32> {
        let mut perm: Vec<u32> = (0..self.out_dest.len() as u32).collect();
        for node in 0..self.num_nodes() as u32 {
            let range = self.edge_range(node);
            let dest = &self.out_dest;
            perm[range.clone()].sort_by_key(|&old_index| dest[old_index as usize]);
        }
        let sorted_dest: Vec<u32> = perm.iter().map(|&old_index| self.out_dest[old_index as usize]).collect();
        self.out_dest = sorted_dest;
        perm
    }

    /// Compute the node ordering that sorts nodes by descending degree
    /// (ties broken by ascending original node id for determinism), without
    /// mutating `self`.
    ///
    /// Returns `order` where `order[new_id] == old_id`; combine with
    /// [`Csr::permuted_by_node_order`] to produce the reordered topology,
    /// and apply the same `order` to node property columns and the node
    /// entity-type array (spec.md §4.8: `SortNodesByDegree`).
    #[must_use]
    pub fn degree_descending_order(&self) -> Vec<u32> {
        let mut order: Vec<u32> = (0..self.num_nodes() as u32).collect();
        order.sort_by(|&a, &b| self.degree(b).cmp(&self.degree(a)).then(a.cmp(&b)));
        order
    }

    /// Build a new CSR with nodes reordered according to `order`
    /// (`order[new_id] == old_id`), remapping every destination in
    /// `out_dest` from old to new node IDs.
    ///
    /// # Errors
    /// Returns [`Error::CsrInvariant`] if `order` is not a permutation of
    /// `0..num_nodes()`.
    pub fn permuted_by_node_order(&self, order: &[u32]) -> Result<Self> {
        if order.len() != self.num_nodes() {
            return Err(Error::CsrInvariant(
                "node order length must equal num_nodes".to_string(),
            ));
        }
        let mut old_to_new = vec![0u32; self.num_nodes()];
        for (new_id, &old_id) in order.iter().enumerate() {
            old_to_new[old_id as usize] = new_id as u32;
        }

        let mut new_out_index = Vec::with_capacity(self.out_index.len());
        new_out_index.push(0u64);
        let mut new_out_dest = Vec::with_capacity(self.out_dest.len());
        for &old_id in order {
            for &dest in self.neighbors(old_id) {
                new_out_dest.push(old_to_new[dest as usize]);
            }
            new_out_index.push(new_out_dest.len() as u64);
        }
        Self::new(new_out_index, new_out_dest)
    }
}
