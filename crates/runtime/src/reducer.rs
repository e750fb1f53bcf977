// Copyright Katana Graph Authors
// SPDX-License-Identifier: Apache-2.0

//! Commutative accumulators built on [`PerThread`]: `update(v)` folds into
//! the calling thread's slot with no cross-thread contention, and
//! `reduce()` folds every slot together from a serial region afterward
//! (spec.md §4.4, "Reducers").

use crate::error::Result;
use crate::per_thread::PerThread;

/// A per-thread commutative accumulator. `merge` must be commutative and
/// associative so that `reduce()` does not depend on which worker handled
/// which update (spec.md §8, testable property 9).
pub struct Reducer<T> {
    identity: T,
    per_thread: PerThread<T>,
    merge: Box<dyn Fn(&mut T, T) + Send + Sync>,
}

impl<T: Clone + Send + 'static> Reducer<T> {
    /// Build a reducer over `num_threads` slots, each starting at `identity`.
    pub fn new(
        num_threads: usize,
        identity: T,
        merge: impl Fn(&mut T, T) + Send + Sync + 'static,
    ) -> Self {
        let seed = identity.clone();
        Self {
            identity,
            per_thread: PerThread::new(num_threads, move || seed.clone()),
            merge: Box::new(merge),
        }
    }

    /// Fold `value` into the calling thread's local slot.
    ///
    /// # Errors
    /// Returns [`crate::Error::NotAWorkerThread`] outside a pool worker.
    pub fn update(&self, value: T) -> Result<()> {
        self.per_thread.local(|slot| (self.merge)(slot, value))
    }

    /// Fold `value` into worker `thread_id`'s slot directly, bypassing the
    /// "must be called from that thread" requirement of [`Reducer::update`].
    /// Used by [`crate::ThreadPool::on_each`]-style coarse initialization.
    ///
    /// # Errors
    /// Returns [`crate::Error::ThreadIndexOutOfRange`] if `thread_id` is
    /// out of range.
    pub fn update_at(&self, thread_id: usize, value: T) -> Result<()> {
        self.per_thread
            .with_index(thread_id, |slot| (self.merge)(slot, value))
    }

    /// Fold every thread's slot together (starting from `identity`) and
    /// reset each slot back to `identity`. Must be called from a serial
    /// region after all parallel work has finished (spec.md §5).
    pub fn reduce(&mut self) -> T {
        let identity = self.identity.clone();
        let merge = &self.merge;
        let mut acc = identity.clone();
        for slot in self.per_thread.iter_mut() {
            let value = std::mem::replace(slot, identity.clone());
            merge(&mut acc, value);
        }
        acc
    }
}

/// Sum accumulator: `merge(acc, v) = acc + v`, `identity = T::default()`.
pub fn sum_reducer<T>(num_threads: usize) -> Reducer<T>
where
    T: Clone + Send + Default + std::ops::Add<Output = T> + 'static,
{
    Reducer::new(num_threads, T::default(), |acc, v| {
        *acc = acc.clone() + v;
    })
}

/// Max accumulator: `merge(acc, v) = max(acc, v)`, seeded at `seed` (pass
/// the type's minimum representable value, since there is no generic
/// `Bounded` trait in `core`).
pub fn max_reducer<T: Clone + Send + Ord + 'static>(num_threads: usize, seed: T) -> Reducer<T> {
    Reducer::new(num_threads, seed, |acc, v| {
        if v > *acc {
            *acc = v;
        }
    })
}

/// Min accumulator: `merge(acc, v) = min(acc, v)`, seeded at `seed` (pass
/// the type's maximum representable value).
pub fn min_reducer<T: Clone + Send + Ord + 'static>(num_threads: usize, seed: T) -> Reducer<T> {
    Reducer::new(num_threads, seed, |acc, v| {
        if v < *acc {
            *acc = v;
        }
    })
}

/// Logical-or accumulator: `merge(acc, v) = acc || v`, `identity = false`.
pub fn logical_or_reducer(num_threads: usize) -> Reducer<bool> {
    Reducer::new(num_threads, false, |acc, v| *acc |= v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::set_current_worker_index_for_test;

    #[test]
    fn sum_reducer_folds_every_slot() {
        let mut reducer = sum_reducer::<i64>(4);
        for t in 0..4 {
            reducer.update_at(t, (t + 1) as i64).unwrap();
        }
        assert_eq!(reducer.reduce(), 1 + 2 + 3 + 4);
        // reduce resets slots back to identity.
        assert_eq!(reducer.reduce(), 0);
    }

    #[test]
    fn max_reducer_tracks_largest_value_seen() {
        let mut reducer = max_reducer::<i64>(3, i64::MIN);
        reducer.update_at(0, 10).unwrap();
        reducer.update_at(1, -5).unwrap();
        reducer.update_at(2, 42).unwrap();
        assert_eq!(reducer.reduce(), 42);
    }

    #[test]
    fn logical_or_reducer_is_true_if_any_slot_set_it() {
        let mut reducer = logical_or_reducer(4);
        reducer.update_at(3, true).unwrap();
        assert!(reducer.reduce());
    }

    #[test]
    fn update_uses_the_calling_threads_local_slot() {
        set_current_worker_index_for_test(Some(1));
        let mut reducer = sum_reducer::<i64>(4);
        reducer.update(7).unwrap();
        set_current_worker_index_for_test(None);
        assert_eq!(reducer.reduce(), 7);
    }
}
