// Copyright Katana Graph Authors
// SPDX-License-Identifier: Apache-2.0

//! Ordered-by-integer-metric bucketed priority worklist (spec.md §4.5),
//! the scheduling structure delta-stepping SSSP is built on.

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::WorkList;

/// A priority worklist keyed by `indexer(item) -> u64`. Workers always
/// prefer the lowest non-empty bucket. The `with_barrier` constructor
/// additionally refuses to drop back below the lowest bucket already
/// reached, which is what gives δ-stepping its phase structure: an item
/// relaxed into an already-passed bucket is clamped up to the floor
/// instead of being allowed to reopen it.
pub struct OrderedByIntegerMetric<T, F> {
    indexer: F,
    buckets: Mutex<BTreeMap<u64, VecDeque<T>>>,
    floor: AtomicU64,
    with_barrier: bool,
}

impl<T, F: Fn(&T) -> u64> OrderedByIntegerMetric<T, F> {
    /// Unrestricted OBIM: the lowest non-empty bucket is always eligible,
    /// even if it is lower than one already drained.
    #[must_use]
    pub fn new(indexer: F) -> Self {
        Self {
            indexer,
            buckets: Mutex::new(BTreeMap::new()),
            floor: AtomicU64::new(0),
            with_barrier: false,
        }
    }

    /// OBIM with a phase barrier: once bucket `k` has been observed,
    /// pushes keyed below `k` are clamped up to `k` rather than reopening
    /// it (spec.md §4.5, "preventing workers from jumping backwards").
    #[must_use]
    pub fn with_barrier(indexer: F) -> Self {
        Self {
            indexer,
            buckets: Mutex::new(BTreeMap::new()),
            floor: AtomicU64::new(0),
            with_barrier: true,
        }
    }

    /// The lowest bucket key currently holding work, if any.
    #[must_use]
    pub fn lowest_nonempty_bucket(&self) -> Option<u64> {
        self.buckets.lock().keys().next().copied()
    }
}

impl<T: Send, F: Fn(&T) -> u64 + Send + Sync> WorkList<T> for OrderedByIntegerMetric<T, F> {
    fn push(&self, item: T) {
        let mut key = (self.indexer)(&item);
        if self.with_barrier {
            let floor = self.floor.load(Ordering::Acquire);
            key = key.max(floor);
        }
        self.buckets.lock().entry(key).or_default().push_back(item);
    }

    fn pop(&self) -> Option<T> {
        let mut buckets = self.buckets.lock();
        let floor = if self.with_barrier {
            self.floor.load(Ordering::Acquire)
        } else {
            0
        };
        let key = buckets
            .range(floor..)
            .find(|(_, queue)| !queue.is_empty())
            .map(|(key, _)| *key)?;
        let queue = buckets.get_mut(&key).expect("key found by the scan above");
        let item = queue.pop_front();
        if queue.is_empty() {
            buckets.remove(&key);
        }
        drop(buckets);
        if self.with_barrier {
            self.floor.fetch_max(key, Ordering::AcqRel);
        }
        item
    }

    fn approx_len(&self) -> usize {
        self.buckets.lock().values().map(VecDeque::len).sum()
    }
}
