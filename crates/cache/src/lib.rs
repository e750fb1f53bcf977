// Copyright Katana Graph Authors
// SPDX-License-Identifier: Apache-2.0

//! Per-resource memory accounting and the bounded LRU property cache
//! shared by the graph layer (spec.md §4.3/§4.4, component C4).
//!
//! Data Model:
//! - [`PropertyCache`] is a capacity-bounded-by-bytes LRU keyed by
//!   [`CacheKey`], holding evicted-but-still-resident property tables.
//! - [`PropertyManager`] wires a [`PropertyCache`] into a
//!   [`katana_memory::MemorySupervisor`] as a [`katana_memory::ReclaimTarget`]:
//!   loading a property borrows active budget, evicting a property
//!   converts active to standby and inserts into the cache, and
//!   `free_standby_memory` drains the cache by LRU order.

pub mod error;
mod manager;
mod property_cache;

pub use error::{Error, Result};
pub use manager::{DEFAULT_MANAGER_NAME, PropertyManager};
pub use property_cache::{CacheKey, PropertyCache, Role};
