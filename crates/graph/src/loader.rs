// Copyright Katana Graph Authors
// SPDX-License-Identifier: Apache-2.0

//! Property loading against an in-memory storage stand-in (spec.md §6,
//! `LoadProperties`/`LoadPropertySlice`; the actual file-backed format is
//! out of scope).

use std::sync::Arc;

use ahash::AHashMap;
use arrow::array::{Array, ArrayRef};
use katana_cache::PropertyManager;
use parking_lot::Mutex;

use crate::error::{Error, Result};

/// A named, single-field property column as held in storage: `.0` is the
/// field's own name (checked against `expected_name` by
/// [`load_properties`]/[`load_property_slice`]).
pub type StoredProperty = (String, ArrayRef);

/// Reads whole or sliced property columns from a backing store, keyed by a
/// `uri` (an opaque path string) and a property name.
///
/// This is the storage-layer seam the real system would satisfy with a
/// file format; here it is satisfied entirely in memory (spec.md §6: "no
/// file I/O beyond the `LoadProperties`/`LoadPropertySlice` interface
/// contract, implemented against an in-memory stand-in").
pub trait PropertyStore: Send + Sync {
    /// Load the whole column stored at `uri` under `name`.
    ///
    /// # Errors
    /// Returns [`Error::StorageNotFound`] if no such entry exists.
    fn load(&self, uri: &str, name: &str) -> Result<StoredProperty>;

    /// Load `length` rows starting at `offset` of the column stored at
    /// `uri` under `name`.
    ///
    /// # Errors
    /// Returns [`Error::StorageNotFound`] if no such entry exists, or
    /// [`Error::SliceOutOfBounds`] if the range exceeds the stored length.
    fn load_slice(&self, uri: &str, name: &str, offset: usize, length: usize) -> Result<StoredProperty>;
}

/// An in-memory [`PropertyStore`], keyed by `(uri, name)`. Used by tests and
/// by callers that build property bundles programmatically instead of from
/// a real file format.
#[derive(Default)]
pub struct InMemoryPropertyStore {
    entries: Mutex<AHashMap<(String, String), StoredProperty>>,
}

impl InMemoryPropertyStore {
    /// Build an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert (or replace) the column named `field_name` at `(uri, name)`.
    pub fn put(&self, uri: impl Into<String>, name: impl Into<String>, field_name: impl Into<String>, array: ArrayRef) {
        self.entries
            .lock()
            .insert((uri.into(), name.into()), (field_name.into(), array));
    }
}

impl PropertyStore for InMemoryPropertyStore {
    fn load(&self, uri: &str, name: &str) -> Result<StoredProperty> {
        self.entries
            .lock()
            .get(&(uri.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| Error::StorageNotFound {
                uri: uri.to_string(),
                name: name.to_string(),
            })
    }

    fn load_slice(&self, uri: &str, name: &str, offset: usize, length: usize) -> Result<StoredProperty> {
        let (field_name, array) = self.load(uri, name)?;
        if offset + length > array.len() {
            return Err(Error::SliceOutOfBounds {
                offset,
                end: offset + length,
                table_length: array.len(),
            });
        }
        Ok((field_name, array.slice(offset, length)))
    }
}

/// Load the whole property column at `uri`/`name`, checking that the
/// stored field name equals `expected_name` (spec.md §6: "a property
/// column read from `uri/<relative>` exposes a single field whose name
/// must equal the `expected_name` argument"). If `manager` is given,
/// records the load as active memory (§4.3, `OnPropertyLoaded`).
///
/// # Errors
/// Returns [`Error::StorageNotFound`] if nothing is stored there,
/// [`Error::InvalidArgument`] if the stored field name does not match
/// `expected_name`, or [`Error::Memory`] if the manager registration was
/// lost.
pub fn load_properties(
    store: &dyn PropertyStore,
    uri: &str,
    name: &str,
    expected_name: &str,
    manager: Option<&Arc<PropertyManager<ArrayRef>>>,
) -> Result<ArrayRef> {
    let (field_name, array) = store.load(uri, name)?;
    if field_name != expected_name {
        return Err(Error::InvalidArgument {
            expected: expected_name.to_string(),
            actual: field_name,
        });
    }
    match manager {
        Some(manager) => Ok(manager.on_property_loaded(array)?),
        None => Ok(array),
    }
}

/// Load `length` rows starting at `offset` of the property column at
/// `uri`/`name`, with the same `expected_name` check as
/// [`load_properties`] (§6, `LoadPropertySlice`).
///
/// # Errors
/// Same as [`load_properties`], plus [`Error::SliceOutOfBounds`] if the
/// range exceeds the stored column's length.
pub fn load_property_slice(
    store: &dyn PropertyStore,
    uri: &str,
    name: &str,
    expected_name: &str,
    offset: usize,
    length: usize,
    manager: Option<&Arc<PropertyManager<ArrayRef>>>,
) -> Result<ArrayRef> {
    let (field_name, array) = store.load_slice(uri, name, offset, length)?;
    if field_name != expected_name {
        return Err(Error::InvalidArgument {
            expected: expected_name.to_string(),
            actual: field_name,
        });
    }
    match manager {
        Some(manager) => Ok(manager.on_property_loaded(array)?),
        None => Ok(array),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow_array::Int64Array;

    fn ints(values: &[i64]) -> ArrayRef {
        Arc::new(Int64Array::from(values.to_vec()))
    }

    #[test]
    fn load_properties_round_trips() {
        let store = InMemoryPropertyStore::new();
        store.put("g/root", "weight", "weight", ints(&[1, 2, 3]));
        let array = load_properties(&store, "g/root", "weight", "weight", None).unwrap();
        let values = array.as_any().downcast_ref::<Int64Array>().unwrap();
        assert_eq!(values.values(), &[1, 2, 3]);
    }

    #[test]
    fn load_properties_rejects_field_name_mismatch() {
        let store = InMemoryPropertyStore::new();
        store.put("g/root", "weight", "not_weight", ints(&[1, 2, 3]));
        let err = load_properties(&store, "g/root", "weight", "weight", None).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument { .. }));
    }

    #[test]
    fn load_properties_missing_entry_is_storage_not_found() {
        let store = InMemoryPropertyStore::new();
        let err = load_properties(&store, "g/root", "missing", "missing", None).unwrap_err();
        assert!(matches!(err, Error::StorageNotFound { .. }));
    }

    #[test]
    fn load_property_slice_respects_bounds() {
        let store = InMemoryPropertyStore::new();
        store.put("g/root", "weight", "weight", ints(&[1, 2, 3, 4, 5]));
        let sliced = load_property_slice(&store, "g/root", "weight", "weight", 1, 2, None).unwrap();
        let values = sliced.as_any().downcast_ref::<Int64Array>().unwrap();
        assert_eq!(values.values(), &[2, 3]);

        let err = load_property_slice(&store, "g/root", "weight", "weight", 1, 10, None).unwrap_err();
        assert!(matches!(err, Error::SliceOutOfBounds { .. }));
    }
}
