// Copyright Katana Graph Authors
// SPDX-License-Identifier: Apache-2.0

//! Entity-type registry: interns the set of atomic flags a node or edge
//! record carries down to a small integer ID (spec.md §3, "Entity-type
//! registry").
//!
//! Two disjoint registries exist, one per [`katana_cache::Role`]; a
//! [`crate::PropertyGraph`] owns one of each.

use std::collections::BTreeSet;

use ahash::AHashMap;
use roaring::RoaringBitmap;

/// Small integer ID for one registered atomic (boolean-flag) type.
pub type AtomicTypeId = u32;

/// Small integer ID for one interned combination of atomic types.
pub type EntityTypeId = u32;

/// The `EntityTypeId` of the empty atomic-type set. Stable across runs and
/// across registries: it is always interned first, at registry
/// construction (spec.md §3: "The empty set... [has a] stable ID").
pub const EMPTY_ENTITY_TYPE: EntityTypeId = 0;

/// Interns atomic types and the entity types (sets of atomic types) built
/// from them.
///
/// Two records with identical atomic-flag combinations always receive the
/// same `EntityTypeId` (spec.md §8, invariant 5): interning is a pure
/// function of the atomic-id set, keyed here by a sorted `BTreeSet` so
/// insertion order of individual flags never matters.
#[derive(Debug, Default)]
pub struct EntityTypeRegistry {
    atomic_names: Vec<String>,
    atomic_by_name: AHashMap<String, AtomicTypeId>,
    entity_bitmaps: Vec<RoaringBitmap>,
    entity_by_key: AHashMap<BTreeSet<AtomicTypeId>, EntityTypeId>,
}

impl EntityTypeRegistry {
    /// Build an empty registry. The empty atomic set is interned
    /// immediately, so [`EntityTypeRegistry::empty_entity_type`] is always
    /// [`EMPTY_ENTITY_TYPE`].
    #[must_use]
    pub fn new() -> Self {
        let mut registry = Self {
            atomic_names: Vec::new(),
            atomic_by_name: AHashMap::new(),
            entity_bitmaps: Vec::new(),
            entity_by_key: AHashMap::new(),
        };
        let empty_id = registry.intern(&BTreeSet::new());
        debug_assert_eq!(empty_id, EMPTY_ENTITY_TYPE);
        registry
    }

    /// The stable ID of the empty entity type.
    #[must_use]
    pub const fn empty_entity_type(&self) -> EntityTypeId {
        EMPTY_ENTITY_TYPE
    }

    /// Register an atomic type named `name`, or return its existing ID if
    /// already registered. Also eagerly interns the singleton entity type
    /// `{name}`, so that singleton's ID is assigned and stable as soon as
    /// the atomic type is known (spec.md §3: "the singleton `{atomic}`...
    /// [has a] stable ID").
    pub fn register_atomic_type(&mut self, name: impl Into<String>) -> AtomicTypeId {
        let name = name.into();
        if let Some(&id) = self.atomic_by_name.get(&name) {
            return id;
        }
        let id = self.atomic_names.len() as AtomicTypeId;
        self.atomic_names.push(name.clone());
        self.atomic_by_name.insert(name, id);
        let mut singleton = BTreeSet::new();
        singleton.insert(id);
        self.intern(&singleton);
        id
    }

    /// Look up an atomic type's ID by name, if registered.
    #[must_use]
    pub fn atomic_type_id(&self, name: &str) -> Option<AtomicTypeId> {
        self.atomic_by_name.get(name).copied()
    }

    /// Intern a set of atomic-type IDs into a single `EntityTypeId`,
    /// assigning a fresh ID on first occurrence.
    pub fn intern(&mut self, atomics: &BTreeSet<AtomicTypeId>) -> EntityTypeId {
        if let Some(&id) = self.entity_by_key.get(atomics) {
            return id;
        }
        let id = self.entity_bitmaps.len() as EntityTypeId;
        let mut bitmap = RoaringBitmap::new();
        for &atomic in atomics {
            bitmap.insert(atomic);
        }
        self.entity_bitmaps.push(bitmap);
        self.entity_by_key.insert(atomics.clone(), id);
        id
    }

    /// Intern the entity type for a record given its per-atomic-type flags,
    /// indexed in the order atomic types were registered.
    ///
    /// # Panics
    /// Panics if `flags.len()` does not match the number of registered
    /// atomic types.
    pub fn intern_flags(&mut self, flags: &[bool]) -> EntityTypeId {
        assert_eq!(
            flags.len(),
            self.atomic_names.len(),
            "flags must have one entry per registered atomic type"
        );
        let atomics: BTreeSet<AtomicTypeId> = flags
            .iter()
            .enumerate()
            .filter_map(|(id, &present)| present.then_some(id as AtomicTypeId))
            .collect();
        self.intern(&atomics)
    }

    /// Whether `entity_type` includes `atomic` in its flag set. O(1) via
    /// the interned bitset (spec.md §3: "Membership tests are
    /// O(atomic-count) or O(1) with a bitset per entity-type ID").
    #[must_use]
    pub fn contains(&self, entity_type: EntityTypeId, atomic: AtomicTypeId) -> bool {
        self.entity_bitmaps
            .get(entity_type as usize)
            .is_some_and(|bitmap| bitmap.contains(atomic))
    }

    /// Whether `entity_type`'s flag set shares at least one atomic type
    /// with `selected` (used by projections to test compatibility; an
    /// empty `selected` set is the caller's signal to select everything
    /// and is handled by the caller, not here).
    #[must_use]
    pub fn intersects(&self, entity_type: EntityTypeId, selected: &RoaringBitmap) -> bool {
        self.entity_bitmaps
            .get(entity_type as usize)
            .is_some_and(|bitmap| !bitmap.is_disjoint(selected))
    }

    /// Number of distinct atomic types registered.
    #[must_use]
    pub fn num_atomic_types(&self) -> usize {
        self.atomic_names.len()
    }

    /// Number of distinct entity types interned so far.
    #[must_use]
    pub fn num_entity_types(&self) -> usize {
        self.entity_bitmaps.len()
    }

    /// Registered atomic type names, in registration order.
    #[must_use]
    pub fn atomic_type_names(&self) -> &[String] {
        &self.atomic_names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_entity_type_is_stable_across_fresh_registries() {
        let a = EntityTypeRegistry::new();
        let b = EntityTypeRegistry::new();
        assert_eq!(a.empty_entity_type(), EMPTY_ENTITY_TYPE);
        assert_eq!(b.empty_entity_type(), EMPTY_ENTITY_TYPE);
    }

    #[test]
    fn registering_an_atomic_type_assigns_a_stable_singleton_id() {
        let mut reg = EntityTypeRegistry::new();
        let person = reg.register_atomic_type("Person");
        let mut singleton = BTreeSet::new();
        singleton.insert(person);
        let singleton_id = reg.intern(&singleton);
        assert_ne!(singleton_id, EMPTY_ENTITY_TYPE);
        // re-registering returns the same atomic id and the same singleton.
        let person_again = reg.register_atomic_type("Person");
        assert_eq!(person, person_again);
        assert_eq!(reg.intern(&singleton), singleton_id);
    }

    #[test]
    fn identical_flag_combinations_share_an_entity_type_id() {
        let mut reg = EntityTypeRegistry::new();
        reg.register_atomic_type("A");
        reg.register_atomic_type("B");
        let id1 = reg.intern_flags(&[true, false]);
        let id2 = reg.intern_flags(&[true, false]);
        let id3 = reg.intern_flags(&[true, true]);
        assert_eq!(id1, id2);
        assert_ne!(id1, id3);
    }

    #[test]
    fn contains_reflects_the_interned_flag_set() {
        let mut reg = EntityTypeRegistry::new();
        let a = reg.register_atomic_type("A");
        let b = reg.register_atomic_type("B");
        let id = reg.intern_flags(&[true, false]);
        assert!(reg.contains(id, a));
        assert!(!reg.contains(id, b));
    }

    #[test]
    fn intersects_detects_shared_atomic_membership() {
        let mut reg = EntityTypeRegistry::new();
        reg.register_atomic_type("A");
        reg.register_atomic_type("B");
        let only_a = reg.intern_flags(&[true, false]);
        let only_b = reg.intern_flags(&[false, true]);

        let mut selected = RoaringBitmap::new();
        selected.insert(1); // B

        assert!(!reg.intersects(only_a, &selected));
        assert!(reg.intersects(only_b, &selected));
    }
}
