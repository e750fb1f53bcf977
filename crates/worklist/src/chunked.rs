// Copyright Katana Graph Authors
// SPDX-License-Identifier: Apache-2.0

//! Per-socket chunked worklists (spec.md §4.5): producers append to a
//! local chunk; once it fills, the chunk is published to a socket-local
//! queue and consumers steal whole chunks from peers. FIFO and LIFO
//! variants differ only in which end of a chunk is drained.

use std::collections::VecDeque;

use katana_runtime::{Topology, current_worker_index};
use parking_lot::Mutex;

use crate::WorkList;

struct ChunkedWl<T> {
    chunk_capacity: usize,
    fifo: bool,
    /// Each worker's own chunk, simultaneously the "building" buffer for
    /// pushes and the first place a pop looks.
    local: Vec<Mutex<VecDeque<T>>>,
    /// One published-chunk queue per socket; workers pull whole chunks
    /// from their own socket first, then steal from others.
    socket_queues: Vec<Mutex<VecDeque<VecDeque<T>>>>,
    socket_of: Vec<usize>,
}

impl<T> ChunkedWl<T> {
    fn new(topology: &Topology, chunk_capacity: usize, fifo: bool) -> Self {
        let num_threads = topology.num_threads();
        let socket_of = (0..num_threads).map(|t| topology.socket_of(t)).collect();
        Self {
            chunk_capacity: chunk_capacity.max(1),
            fifo,
            local: (0..num_threads).map(|_| Mutex::new(VecDeque::new())).collect(),
            socket_queues: (0..topology.num_sockets()).map(|_| Mutex::new(VecDeque::new())).collect(),
            socket_of,
        }
    }

    /// Calling thread's worker index, falling back to 0 for non-worker
    /// callers (e.g. seeding the worklist before the pool starts).
    fn home_index(&self) -> usize {
        current_worker_index()
            .unwrap_or(0)
            .min(self.local.len().saturating_sub(1))
    }

    fn pop_one(&self, chunk: &mut VecDeque<T>) -> Option<T> {
        if self.fifo { chunk.pop_front() } else { chunk.pop_back() }
    }

    fn push(&self, item: T) {
        let idx = self.home_index();
        let mut buf = self.local[idx].lock();
        buf.push_back(item);
        if buf.len() >= self.chunk_capacity {
            let full = std::mem::take(&mut *buf);
            let socket = self.socket_of[idx];
            self.socket_queues[socket].lock().push_back(full);
        }
    }

    fn pop(&self) -> Option<T> {
        let idx = self.home_index();
        {
            let mut buf = self.local[idx].lock();
            if !buf.is_empty() {
                return self.pop_one(&mut buf);
            }
        }

        let home_socket = self.socket_of[idx];
        let sockets_in_preference_order = std::iter::once(home_socket)
            .chain((0..self.socket_queues.len()).filter(|s| *s != home_socket));

        for socket in sockets_in_preference_order {
            let mut chunk = {
                let mut queue = self.socket_queues[socket].lock();
                match queue.pop_front() {
                    Some(chunk) => chunk,
                    None => continue,
                }
            };
            let item = self.pop_one(&mut chunk);
            if !chunk.is_empty() {
                *self.local[idx].lock() = chunk;
            }
            if item.is_some() {
                return item;
            }
        }
        None
    }

    fn approx_len(&self) -> usize {
        let local: usize = self.local.iter().map(|m| m.lock().len()).sum();
        let queued: usize = self
            .socket_queues
            .iter()
            .map(|q| q.lock().iter().map(VecDeque::len).sum::<usize>())
            .sum();
        local + queued
    }
}

/// Chunked worklist draining FIFO within each chunk (oldest item first).
pub struct PerSocketChunkFifo<T>(ChunkedWl<T>);

impl<T> PerSocketChunkFifo<T> {
    /// Build a worklist sized to `topology`, publishing chunks once they
    /// reach `chunk_capacity` items (typically 16-128, spec.md §4.5).
    #[must_use]
    pub fn new(topology: &Topology, chunk_capacity: usize) -> Self {
        Self(ChunkedWl::new(topology, chunk_capacity, true))
    }
}

impl<T: Send> WorkList<T> for PerSocketChunkFifo<T> {
    fn push(&self, item: T) {
        self.0.push(item);
    }

    fn pop(&self) -> Option<T> {
        self.0.pop()
    }

    fn approx_len(&self) -> usize {
        self.0.approx_len()
    }
}

/// Chunked worklist draining LIFO within each chunk (most recent first).
pub struct PerSocketChunkLifo<T>(ChunkedWl<T>);

impl<T> PerSocketChunkLifo<T> {
    /// Build a worklist sized to `topology`, publishing chunks once they
    /// reach `chunk_capacity` items.
    #[must_use]
    pub fn new(topology: &Topology, chunk_capacity: usize) -> Self {
        Self(ChunkedWl::new(topology, chunk_capacity, false))
    }
}

impl<T: Send> WorkList<T> for PerSocketChunkLifo<T> {
    fn push(&self, item: T) {
        self.0.push(item);
    }

    fn pop(&self) -> Option<T> {
        self.0.pop()
    }

    fn approx_len(&self) -> usize {
        self.0.approx_len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifo_drains_chunk_oldest_first_once_published() {
        let topo = Topology::single_socket(1);
        let wl = PerSocketChunkFifo::new(&topo, 4);
        for i in 0..4 {
            wl.push(i);
        }
        // chunk is exactly full and published; local buffer is empty so
        // pop pulls the published chunk back and drains oldest-first.
        assert_eq!(wl.pop(), Some(0));
        assert_eq!(wl.pop(), Some(1));
    }

    #[test]
    fn lifo_drains_most_recent_first() {
        let topo = Topology::single_socket(1);
        let wl = PerSocketChunkLifo::new(&topo, 64);
        wl.push(1);
        wl.push(2);
        wl.push(3);
        assert_eq!(wl.pop(), Some(3));
        assert_eq!(wl.pop(), Some(2));
        assert_eq!(wl.pop(), Some(1));
    }

    #[test]
    fn steals_a_whole_chunk_from_a_peer_socket() {
        let topo = Topology::single_socket(2);
        let wl = PerSocketChunkFifo::new(&topo, 2);
        katana_runtime::set_current_worker_index_for_test(Some(0));
        wl.push(10);
        wl.push(11);
        katana_runtime::set_current_worker_index_for_test(Some(1));
        let first = wl.pop();
        katana_runtime::set_current_worker_index_for_test(None);
        assert_eq!(first, Some(10));
    }

    #[test]
    fn approx_len_counts_local_and_published_items() {
        let topo = Topology::single_socket(1);
        let wl = PerSocketChunkFifo::new(&topo, 4);
        wl.push(1);
        wl.push(2);
        assert_eq!(wl.approx_len(), 2);
    }
}
