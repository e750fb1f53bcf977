// Copyright Katana Graph Authors
// SPDX-License-Identifier: Apache-2.0

//! Single-threaded reference bucket worklist (spec.md §4.5), used as the
//! ground truth for δ-stepping and as the serial fallback worklist.

use std::collections::{BTreeMap, VecDeque};

use parking_lot::Mutex;

use crate::WorkList;

/// Same priority semantics as [`crate::OrderedByIntegerMetric`] but meant
/// to be driven from a single thread (the `Mutex` here is only to satisfy
/// [`WorkList`]'s `Sync` bound, not for real contention).
pub struct SerialBucketWl<T> {
    buckets: Mutex<BTreeMap<u64, VecDeque<T>>>,
}

impl<T> SerialBucketWl<T> {
    /// Build an empty bucket worklist.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buckets: Mutex::new(BTreeMap::new()),
        }
    }

    /// Insert `item` under an explicit bucket `key` (the serial reference
    /// implementation computes `key` itself rather than taking an
    /// indexer closure, since it is always called from algorithm code
    /// that already knows the bucket).
    pub fn push_bucket(&self, key: u64, item: T) {
        self.buckets.lock().entry(key).or_default().push_back(item);
    }

    /// The lowest bucket key currently holding work.
    #[must_use]
    pub fn lowest_nonempty_bucket(&self) -> Option<u64> {
        self.buckets.lock().keys().next().copied()
    }
}

impl<T> Default for SerialBucketWl<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send> WorkList<T> for SerialBucketWl<T> {
    fn push(&self, _item: T) {
        panic!("SerialBucketWl requires an explicit bucket key: use push_bucket");
    }

    fn pop(&self) -> Option<T> {
        let mut buckets = self.buckets.lock();
        let key = *buckets.keys().next()?;
        let queue = buckets.get_mut(&key).expect("key found by the scan above");
        let item = queue.pop_front();
        if queue.is_empty() {
            buckets.remove(&key);
        }
        item
    }

    fn approx_len(&self) -> usize {
        self.buckets.lock().values().map(VecDeque::len).sum()
    }
}
