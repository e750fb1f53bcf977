// Copyright Katana Graph Authors
// SPDX-License-Identifier: Apache-2.0

//! Chunked Arrow-backed property columns and per-role property tables
//! (spec.md §3, "Property columns").

use std::sync::Arc;

use ahash::AHashMap;
use arrow::array::{Array, ArrayRef, UInt32Array};
use arrow::compute;
use arrow_schema::DataType;
use katana_cache::Role;

use crate::error::{Error, Result};

/// A single named column, physically split into fixed-width chunks aligned
/// with CSR node or edge order. Width is a build-time parameter
/// (`katana_config::policy::ChunkConfig::property_chunk_width`, default
/// 25,000); the trailing chunk may be short (spec.md §3).
#[derive(Debug, Clone)]
pub struct ChunkedColumn {
    name: String,
    chunks: Vec<ArrayRef>,
    chunk_width: usize,
    len: usize,
}

impl ChunkedColumn {
    /// Split `array` into chunks of `chunk_width` rows.
    ///
    /// # Panics
    /// Panics if `chunk_width` is 0.
    #[must_use]
    pub fn new(name: impl Into<String>, array: ArrayRef, chunk_width: usize) -> Self {
        assert!(chunk_width > 0, "chunk_width must be positive");
        let len = array.len();
        let mut chunks = Vec::with_capacity(len.div_ceil(chunk_width).max(1));
        let mut offset = 0;
        while offset < len {
            let width = chunk_width.min(len - offset);
            chunks.push(array.slice(offset, width));
            offset += width;
        }
        if chunks.is_empty() {
            chunks.push(array.slice(0, 0));
        }
        Self {
            name: name.into(),
            chunks,
            chunk_width,
            len,
        }
    }

    /// This column's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of rows, summed across chunks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether this column has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// This column's Arrow data type.
    #[must_use]
    pub fn data_type(&self) -> &DataType {
        self.chunks[0].data_type()
    }

    /// The underlying chunks, in row order.
    #[must_use]
    pub fn chunks(&self) -> &[ArrayRef] {
        &self.chunks
    }

    /// Approximate in-memory footprint in bytes, summed across chunks. Used
    /// to size `katana_cache::PropertyManager`'s borrow/unload calls.
    #[must_use]
    pub fn approximate_size_bytes(&self) -> i64 {
        self.chunks
            .iter()
            .map(|c| c.get_array_memory_size() as i64)
            .sum()
    }

    /// Materialize the whole column as one contiguous array.
    ///
    /// # Errors
    /// Returns [`Error::Arrow`] if concatenating the chunks fails.
    pub fn to_contiguous(&self) -> Result<ArrayRef> {
        if self.chunks.len() == 1 {
            return Ok(self.chunks[0].clone());
        }
        let refs: Vec<&dyn Array> = self.chunks.iter().map(AsRef::as_ref).collect();
        Ok(compute::concat(&refs)?)
    }

    /// Materialize `length` rows starting at `offset`.
    ///
    /// # Errors
    /// Returns [`Error::SliceOutOfBounds`] if the range exceeds `self.len()`,
    /// or [`Error::Arrow`] if concatenation fails.
    pub fn slice(&self, offset: usize, length: usize) -> Result<ArrayRef> {
        if offset + length > self.len {
            return Err(Error::SliceOutOfBounds {
                offset,
                end: offset + length,
                table_length: self.len,
            });
        }
        Ok(self.to_contiguous()?.slice(offset, length))
    }

    /// Build a new column of the same name and chunk width, reordered so
    /// that row `i` of the result is row `order[i]` of `self` (used to keep
    /// property columns aligned after `SortAllEdgesByDest`/
    /// `SortNodesByDegree` permute the owning CSR).
    ///
    /// # Errors
    /// Returns [`Error::Arrow`] if the underlying `take` kernel fails.
    pub fn permuted(&self, order: &[u32]) -> Result<Self> {
        let contiguous = self.to_contiguous()?;
        let indices = UInt32Array::from(order.to_vec());
        let taken = compute::take(&contiguous, &indices, None)?;
        Ok(Self::new(self.name.clone(), taken, self.chunk_width))
    }
}

/// An ordered collection of named [`ChunkedColumn`]s for one
/// [`katana_cache::Role`] (node or edge), all aligned with the same row
/// count (spec.md §3, "Property columns").
#[derive(Debug, Clone)]
pub struct PropertyTable {
    role: Role,
    len: usize,
    order: Vec<String>,
    columns: AHashMap<String, ChunkedColumn>,
}

impl PropertyTable {
    /// Build an empty table of `len` rows (the owning CSR's node or edge count).
    #[must_use]
    pub fn new(role: Role, len: usize) -> Self {
        Self {
            role,
            len,
            order: Vec::new(),
            columns: AHashMap::new(),
        }
    }

    /// The role this table holds properties for.
    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }

    /// Row count every column in this table must match.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether this table has zero rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Column names, in the order they were added.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.order
    }

    /// Add a new named column.
    ///
    /// # Errors
    /// Returns [`Error::AlreadyExists`] if `name` is already present, or
    /// [`Error::LengthMismatch`] if `array.len()` does not equal
    /// [`PropertyTable::len`].
    pub fn add(&mut self, name: impl Into<String>, array: ArrayRef, chunk_width: usize) -> Result<()> {
        let name = name.into();
        if self.columns.contains_key(&name) {
            return Err(Error::AlreadyExists { role: self.role, name });
        }
        if array.len() != self.len {
            return Err(Error::LengthMismatch {
                role: self.role,
                name,
                expected: self.len,
                actual: array.len(),
            });
        }
        self.order.push(name.clone());
        self.columns
            .insert(name.clone(), ChunkedColumn::new(name, array, chunk_width));
        Ok(())
    }

    /// Remove and return a named column.
    ///
    /// # Errors
    /// Returns [`Error::PropertyNotFound`] if `name` is not present.
    pub fn remove(&mut self, name: &str) -> Result<ChunkedColumn> {
        let column = self.columns.remove(name).ok_or_else(|| Error::PropertyNotFound {
            role: self.role,
            name: name.to_string(),
        })?;
        self.order.retain(|n| n != name);
        Ok(column)
    }

    /// Borrow a named column.
    ///
    /// # Errors
    /// Returns [`Error::PropertyNotFound`] if `name` is not present.
    pub fn get(&self, name: &str) -> Result<&ChunkedColumn> {
        self.columns.get(name).ok_or_else(|| Error::PropertyNotFound {
            role: self.role,
            name: name.to_string(),
        })
    }

    /// Whether `name` is currently present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// Reorder every column in this table by `order` (row `i` of the result
    /// is row `order[i]` of `self`), and reset `len` to `order.len()`. Used
    /// after a topology-level permutation (sort-by-dest for edges,
    /// sort-by-degree for nodes).
    ///
    /// # Errors
    /// Returns [`Error::Arrow`] if any column's `take` kernel fails.
    pub fn permuted(&self, order: &[u32]) -> Result<Self> {
        let mut result = Self::new(self.role, order.len());
        for name in &self.order {
            let column = &self.columns[name];
            let permuted = column.permuted(order)?;
            result.order.push(name.clone());
            result.columns.insert(name.clone(), permuted);
        }
        Ok(result)
    }
}
