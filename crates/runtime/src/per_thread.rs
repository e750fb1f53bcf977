// Copyright Katana Graph Authors
// SPDX-License-Identifier: Apache-2.0

//! Per-thread storage: one mutable slot per active worker, addressable
//! either "local" (from inside a worker) or "by index" (spec.md §4.4 /
//! §9 "Per-thread storage indexed by thread ID").
//!
//! Slots are stored behind `parking_lot::Mutex` rather than raw unguarded
//! cells: the substrate's own lint policy denies `unsafe_code`, so instead
//! of the upstream's "trust the caller not to alias" contract, aliasing is
//! made impossible by construction. In the hot path (each worker touching
//! only its own slot) the lock is uncontended, so this costs one atomic
//! swap per access rather than a real point of contention.

use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::pool::current_worker_index;

/// One typed slot per worker thread in a [`crate::ThreadPool`] of size `N`.
pub struct PerThread<T> {
    slots: Vec<Mutex<T>>,
}

impl<T> PerThread<T> {
    /// Build storage for `num_threads` workers, each slot initialized by
    /// calling `make` once per slot.
    #[must_use]
    pub fn new(num_threads: usize, mut make: impl FnMut() -> T) -> Self {
        Self {
            slots: (0..num_threads.max(1)).map(|_| Mutex::new(make())).collect(),
        }
    }

    /// Number of slots (equal to the owning pool's thread count).
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether this storage has no slots (never true for a pool-backed
    /// instance, since pools always have at least one worker).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Access the slot for worker `index` directly, regardless of which
    /// thread is calling. Used for cross-thread reads after a parallel
    /// region has ended, and by [`crate::Reducer::reduce`].
    ///
    /// # Errors
    /// Returns [`Error::ThreadIndexOutOfRange`] if `index` is out of range.
    pub fn with_index<R>(&self, index: usize, f: impl FnOnce(&mut T) -> R) -> Result<R> {
        let slot = self
            .slots
            .get(index)
            .ok_or(Error::ThreadIndexOutOfRange {
                index,
                num_threads: self.slots.len(),
            })?;
        Ok(f(&mut slot.lock()))
    }

    /// Access the calling thread's own slot. Requires that the current
    /// thread is one of the owning pool's workers.
    ///
    /// # Errors
    /// Returns [`Error::NotAWorkerThread`] if called from outside a worker
    /// thread of the pool this storage was built for.
    pub fn local<R>(&self, f: impl FnOnce(&mut T) -> R) -> Result<R> {
        let index = current_worker_index().ok_or(Error::NotAWorkerThread)?;
        self.with_index(index, f)
    }

    /// Iterate over every slot with exclusive access, valid only because
    /// `&mut self` proves no worker thread can be concurrently touching a
    /// slot (a serial region, per spec.md §5).
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.slots.iter_mut().map(Mutex::get_mut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn by_index_access_round_trips() {
        let storage: PerThread<i64> = PerThread::new(4, || 0);
        storage.with_index(2, |v| *v = 42).unwrap();
        let read = storage.with_index(2, |v| *v).unwrap();
        assert_eq!(read, 42);
    }

    #[test]
    fn out_of_range_index_is_an_error() {
        let storage: PerThread<i64> = PerThread::new(2, || 0);
        let err = storage.with_index(5, |v| *v).unwrap_err();
        assert!(matches!(err, Error::ThreadIndexOutOfRange { .. }));
    }

    #[test]
    fn local_outside_a_worker_thread_is_an_error() {
        let storage: PerThread<i64> = PerThread::new(2, || 0);
        let err = storage.local(|v| *v).unwrap_err();
        assert!(matches!(err, Error::NotAWorkerThread));
    }

    #[test]
    fn iter_mut_sees_every_slot() {
        let mut storage: PerThread<i64> = PerThread::new(3, || 1);
        for slot in storage.iter_mut() {
            *slot += 1;
        }
        assert_eq!(storage.with_index(0, |v| *v).unwrap(), 2);
        assert_eq!(storage.with_index(2, |v| *v).unwrap(), 2);
    }
}
