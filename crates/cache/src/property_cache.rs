// Copyright Katana Graph Authors
// SPDX-License-Identifier: Apache-2.0

//! Bounded LRU cache of evicted property tables, keyed by
//! `(owner_role, graph_identity, property_name)` (spec.md §3, "Property
//! cache entry").

use lru::LruCache;

/// Which side of the graph a property belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// A node (vertex) property.
    Node,
    /// An edge property.
    Edge,
}

/// Identifies one cached property table. `graph_identity` is a stable
/// string naming the owning graph (its root URI, typically) so properties
/// loaded for different graphs never collide in a shared cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    role: Role,
    graph_identity: String,
    property_name: String,
}

impl CacheKey {
    /// Build a key for a property of `role` named `property_name`, owned by
    /// the graph identified by `graph_identity`.
    #[must_use]
    pub fn new(
        role: Role,
        graph_identity: impl Into<String>,
        property_name: impl Into<String>,
    ) -> Self {
        Self {
            role,
            graph_identity: graph_identity.into(),
            property_name: property_name.into(),
        }
    }

    /// This key's role (node or edge).
    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }

    /// The owning graph's stable identity string.
    #[must_use]
    pub fn graph_identity(&self) -> &str {
        &self.graph_identity
    }

    /// The property's name.
    #[must_use]
    pub fn property_name(&self) -> &str {
        &self.property_name
    }
}

/// A capacity-bounded-by-bytes LRU cache of evicted property tables.
///
/// `V` is whatever cheaply-clonable handle the embedder uses for a loaded
/// property table (in this workspace, a chunked Arrow column handle from
/// `katana-graph`); the cache itself stays generic over `V` so it has no
/// dependency on the graph layer's representation, mirroring how the
/// upstream `PropertyCache` is templated on the property value type.
pub struct PropertyCache<V> {
    entries: LruCache<CacheKey, (V, i64)>,
    size_bytes: i64,
}

impl<V> PropertyCache<V> {
    /// Build an empty cache. Capacity is bounded only by bytes, via
    /// [`PropertyCache::reclaim`] — entry *count* is unbounded.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: LruCache::unbounded(),
            size_bytes: 0,
        }
    }

    /// Insert (or replace) `key` with `value`, sized at `size_bytes`.
    /// Marks `key` as most-recently-used.
    pub fn insert(&mut self, key: CacheKey, value: V, size_bytes: i64) {
        if let Some((_, old_size)) = self.entries.put(key, (value, size_bytes)) {
            self.size_bytes -= old_size;
        }
        self.size_bytes += size_bytes;
    }

    /// Remove `key` and return its value, marking the removal's bytes as
    /// freed. Does not affect LRU order of remaining entries.
    pub fn get_and_evict(&mut self, key: &CacheKey) -> Option<V> {
        let (value, size) = self.entries.pop(key)?;
        self.size_bytes -= size;
        Some(value)
    }

    /// Remove `key` without returning its value. Returns whether an entry
    /// was present.
    pub fn evict(&mut self, key: &CacheKey) -> bool {
        self.get_and_evict(key).is_some()
    }

    /// Whether `key` currently has an entry (does not update LRU order).
    #[must_use]
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries.contains(key)
    }

    /// Remove every entry, returning the number of bytes freed.
    pub fn clear(&mut self) -> i64 {
        let freed = self.size_bytes;
        self.entries.clear();
        self.size_bytes = 0;
        freed
    }

    /// Total bytes currently held across all entries.
    #[must_use]
    pub fn size_bytes(&self) -> i64 {
        self.size_bytes
    }

    /// Number of entries currently cached.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove least-recently-used entries until at least `n` bytes have
    /// been freed or the cache is empty, whichever comes first. Returns the
    /// exact number of bytes freed (testable property 4 in spec.md §8: the
    /// removed set is a prefix of the LRU order and `size_bytes() <=
    /// max(0, prior_size - n)` afterward).
    pub fn reclaim(&mut self, n: i64) -> i64 {
        if n <= 0 {
            return 0;
        }
        let mut freed = 0i64;
        while freed < n {
            let Some((_, (_, size))) = self.entries.pop_lru() else {
                break;
            };
            self.size_bytes -= size;
            freed += size;
        }
        freed
    }
}

impl<V> Default for PropertyCache<V> {
    fn default() -> Self {
        Self::new()
    }
}
