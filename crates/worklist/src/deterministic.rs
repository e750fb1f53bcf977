// Copyright Katana Graph Authors
// SPDX-License-Identifier: Apache-2.0

//! Deterministic worklist (spec.md §4.5): items are ordered by a stable
//! user-supplied key rather than by scheduling happenstance, so running
//! the same items through the same body produces byte-identical output
//! regardless of thread count (spec.md §8, testable property 8).

use std::collections::{BTreeMap, VecDeque};

use parking_lot::Mutex;

use crate::WorkList;

/// Replays items in the total order induced by `det_id`, FIFO among
/// items that share a key. Cautious-point read/commit staging and the
/// parallel-break predicate are loop-level concerns (`katana-loops`'
/// `for_each`); this type only owns the ordering.
pub struct Deterministic<T, F> {
    det_id: F,
    items: Mutex<BTreeMap<u64, VecDeque<T>>>,
}

impl<T, F: Fn(&T) -> u64> Deterministic<T, F> {
    /// Build an empty deterministic worklist keyed by `det_id`.
    #[must_use]
    pub fn new(det_id: F) -> Self {
        Self {
            det_id,
            items: Mutex::new(BTreeMap::new()),
        }
    }

    /// The key `det_id` assigns to `item`, for callers that need to
    /// annotate stats or spans with it.
    pub fn key_of(&self, item: &T) -> u64 {
        (self.det_id)(item)
    }

    /// Pop up to `max` items in ascending key order (FIFO among items
    /// sharing a key), stopping early if the worklist empties.
    ///
    /// Used by `katana-loops`' cautious-point `for_each_deterministic` to
    /// draw one round's worth of candidate items: popping a whole batch
    /// under a single caller-visible call, rather than one `pop()` per
    /// worker, keeps round composition a function of `det_id` order alone,
    /// not of which worker happened to call `pop()` first.
    pub fn pop_batch(&self, max: usize) -> Vec<T> {
        let mut out = Vec::with_capacity(max);
        for _ in 0..max {
            match self.pop() {
                Some(item) => out.push(item),
                None => break,
            }
        }
        out
    }
}

impl<T: Send, F: Fn(&T) -> u64 + Send + Sync> WorkList<T> for Deterministic<T, F> {
    fn push(&self, item: T) {
        let key = (self.det_id)(&item);
        self.items.lock().entry(key).or_default().push_back(item);
    }

    fn pop(&self) -> Option<T> {
        let mut items = self.items.lock();
        let key = *items.keys().next()?;
        let queue = items.get_mut(&key).expect("key found by the scan above");
        let item = queue.pop_front();
        if queue.is_empty() {
            items.remove(&key);
        }
        item
    }

    fn approx_len(&self) -> usize {
        self.items.lock().values().map(VecDeque::len).sum()
    }
}
