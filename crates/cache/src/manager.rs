// Copyright Katana Graph Authors
// SPDX-License-Identifier: Apache-2.0

//! [`PropertyManager`]: the [`katana_memory::ReclaimTarget`] specialization
//! that tracks node/edge property tables and coordinates eviction through a
//! [`PropertyCache`].

use std::sync::{Arc, OnceLock};

use katana_memory::{ManagerHandle, MemorySupervisor, ReclaimTarget};
use katana_tracer::{Tracer, tags};
use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::property_cache::{CacheKey, PropertyCache};

/// Default manager name, matching the upstream `PropertyManager`'s default
/// `MemoryCategory()`.
pub const DEFAULT_MANAGER_NAME: &str = "property";

/// Tracks active/standby bytes for node and edge property tables and backs
/// them with a [`PropertyCache`] so evicted tables stay resident (but
/// reclaimable) instead of being dropped outright.
///
/// Registers itself with the supervisor as a [`ReclaimTarget`] by weak
/// reference at construction time (see [`PropertyManager::new`]), so it
/// must be held behind an `Arc` for its whole lifetime: once the last
/// strong reference drops, the supervisor's next reclaim pass simply skips
/// it (matching [`katana_memory::MemorySupervisor::reclaim_memory`]'s
/// "upgrade the weak target, skip if gone" behavior) rather than panicking.
pub struct PropertyManager<V> {
    handle: OnceLock<ManagerHandle>,
    supervisor: Arc<Mutex<MemorySupervisor>>,
    cache: Mutex<PropertyCache<V>>,
    size_fn: Box<dyn Fn(&V) -> i64 + Send + Sync>,
    tracer: Option<Arc<Tracer>>,
}

impl<V: Clone + Send + Sync + 'static> PropertyManager<V> {
    /// Register a new property manager named `name` with `supervisor`,
    /// sizing loaded tables with `size_fn`.
    ///
    /// # Errors
    /// Returns [`Error::Memory`] if `name` is already registered.
    pub fn new(
        name: impl Into<String>,
        supervisor: Arc<Mutex<MemorySupervisor>>,
        size_fn: impl Fn(&V) -> i64 + Send + Sync + 'static,
        tracer: Option<Arc<Tracer>>,
    ) -> Result<Arc<Self>> {
        let manager = Arc::new(Self {
            handle: OnceLock::new(),
            supervisor: supervisor.clone(),
            cache: Mutex::new(PropertyCache::new()),
            size_fn: Box::new(size_fn),
            tracer,
        });
        let target: Arc<dyn ReclaimTarget> = manager.clone();
        let handle = supervisor.lock().register(name, &target)?;
        drop(target);
        manager
            .handle
            .set(handle)
            .unwrap_or_else(|_| unreachable!("handle set exactly once, at construction"));
        Ok(manager)
    }

    fn handle(&self) -> &ManagerHandle {
        self.handle
            .get()
            .expect("handle is set before PropertyManager::new returns")
    }

    /// This manager's name as registered with the supervisor.
    #[must_use]
    pub fn name(&self) -> &str {
        self.handle().name()
    }

    /// Record that `table` has just been loaded into memory, borrowing its
    /// approximate byte footprint as active memory from the supervisor
    /// (§4.3, `OnPropertyLoaded`). Returns `table` unchanged for chaining.
    ///
    /// # Errors
    /// Returns [`Error::Memory`] if this manager's registration has been
    /// lost (should not happen while the returned `Arc` is held).
    pub fn on_property_loaded(&self, table: V) -> Result<V> {
        let bytes = (self.size_fn)(&table);
        self.supervisor
            .lock()
            .borrow_active_checked(self.handle(), bytes)?;
        if let Some(tracer) = &self.tracer {
            tracer.active_span().log(
                "property loaded",
                tags! { "manager" => self.name(), "bytes" => bytes },
            );
        }
        Ok(table)
    }

    /// If `key` is standby-resident in the cache, promote it back to
    /// active and return it; otherwise `None` (§4.3, `AddProperty`).
    ///
    /// # Errors
    /// Returns [`Error::Memory`] if this manager's registration has been lost.
    pub fn add_property(&self, key: &CacheKey) -> Result<Option<V>> {
        let mut cache = self.cache.lock();
        let Some(value) = cache.get_and_evict(key) else {
            return Ok(None);
        };
        let bytes = (self.size_fn)(&value);
        drop(cache);
        self.supervisor
            .lock()
            .standby_to_active_checked(self.handle(), bytes)?;
        Ok(Some(value))
    }

    /// Move `table`'s bytes from active to standby and insert it into the
    /// cache under `key` (§4.3, `UnloadProperty`).
    ///
    /// # Errors
    /// Returns [`Error::UnloadRefused`] if the supervisor's policy still
    /// reports pressure after the active-to-standby transition (the caller
    /// should keep `table` active rather than drop its only strong
    /// reference), or [`Error::Memory`] on a lost registration.
    pub fn unload_property(&self, key: CacheKey, table: V) -> Result<()> {
        let bytes = (self.size_fn)(&table);
        let freed = self
            .supervisor
            .lock()
            .active_to_standby_checked(self.handle(), bytes)?;
        if freed == 0 {
            return Err(Error::UnloadRefused);
        }
        self.cache.lock().insert(key, table, bytes);
        Ok(())
    }

    /// Current number of bytes resident in the standby cache.
    #[must_use]
    pub fn cache_size_bytes(&self) -> i64 {
        self.cache.lock().size_bytes()
    }

    /// Number of entries currently cached.
    #[must_use]
    pub fn cache_len(&self) -> usize {
        self.cache.lock().len()
    }
}

impl<V: Clone + Send + Sync + 'static> ReclaimTarget for PropertyManager<V> {
    /// `FreeStandby` (§4.3): clear the whole cache if `goal` subsumes it,
    /// otherwise reclaim least-recently-used entries until `goal` bytes are
    /// freed.
    fn free_standby_memory(&self, goal: i64) -> i64 {
        let mut cache = self.cache.lock();
        if goal >= cache.size_bytes() {
            let freed = cache.clear();
            if let Some(tracer) = &self.tracer {
                tracer
                    .active_span()
                    .log("property cache cleared", tags! { "freed_bytes" => freed });
            }
            freed
        } else {
            cache.reclaim(goal)
        }
    }
}
