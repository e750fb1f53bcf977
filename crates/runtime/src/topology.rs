// Copyright Katana Graph Authors
// SPDX-License-Identifier: Apache-2.0

//! Machine topology discovery: sockets, cores per socket, and the
//! thread-to-socket mapping the thread pool pins workers against
//! (spec.md §4.4, "Topology is discovered at startup").

use core_affinity::CoreId;

/// Discovered (or configured) machine topology for one [`crate::ThreadPool`].
///
/// Threads are assigned to sockets contiguously (thread `0..cores_per_socket`
/// on socket 0, and so on) rather than round-robin, matching how the
/// upstream runtime lays out per-socket worklist chunk queues: workers that
/// share a socket are adjacent in thread-id space, which is what the
/// per-socket worklist variants (`PerSocketChunkFIFO`/`LIFO` in
/// `katana-worklist`) and the tiled executor's socket-local start-point
/// adjustment (spec.md §9, item 5) both assume.
#[derive(Debug, Clone)]
pub struct Topology {
    core_ids: Vec<CoreId>,
    num_sockets: usize,
    cores_per_socket: usize,
}

impl Topology {
    /// Discover the machine's logical cores and group `num_threads` of them
    /// into sockets. `num_threads` is clamped to at least 1; if more
    /// threads are requested than logical cores exist, core ids are reused
    /// round-robin (oversubscription is allowed, just not pinned 1:1).
    #[must_use]
    pub fn discover(num_threads: Option<usize>) -> Self {
        let available = core_affinity::get_core_ids().unwrap_or_else(|| vec![CoreId { id: 0 }]);
        let available = if available.is_empty() {
            vec![CoreId { id: 0 }]
        } else {
            available
        };
        let num_threads = num_threads.unwrap_or(available.len()).max(1);
        let core_ids: Vec<CoreId> = (0..num_threads)
            .map(|i| available[i % available.len()])
            .collect();

        let num_sockets = discover_num_sockets().clamp(1, num_threads);
        let cores_per_socket = num_threads.div_ceil(num_sockets);

        tracing::debug!(num_sockets, num_threads, cores_per_socket, "topology discovered");

        Self {
            core_ids,
            num_sockets,
            cores_per_socket,
        }
    }

    /// Build a topology for a fixed thread count with a single socket,
    /// bypassing OS discovery entirely. Used by tests and by embeddings
    /// that already know their own placement.
    #[must_use]
    pub fn single_socket(num_threads: usize) -> Self {
        let num_threads = num_threads.max(1);
        Self {
            core_ids: (0..num_threads).map(|i| CoreId { id: i }).collect(),
            num_sockets: 1,
            cores_per_socket: num_threads,
        }
    }

    /// Total number of worker threads this topology describes.
    #[must_use]
    pub fn num_threads(&self) -> usize {
        self.core_ids.len()
    }

    /// Number of sockets threads are distributed across.
    #[must_use]
    pub fn num_sockets(&self) -> usize {
        self.num_sockets
    }

    /// The logical core id assigned to worker `thread_id`.
    #[must_use]
    pub fn core_id(&self, thread_id: usize) -> CoreId {
        self.core_ids[thread_id]
    }

    /// The socket index owning worker `thread_id`.
    #[must_use]
    pub fn socket_of(&self, thread_id: usize) -> usize {
        thread_id / self.cores_per_socket
    }

    /// The first and one-past-the-last thread id on `socket`.
    #[must_use]
    pub fn socket_thread_range(&self, socket: usize) -> std::ops::Range<usize> {
        let start = socket * self.cores_per_socket;
        let end = (start + self.cores_per_socket).min(self.num_threads());
        start..end
    }
}

#[cfg(target_os = "linux")]
fn discover_num_sockets() -> usize {
    let Ok(entries) = std::fs::read_dir("/sys/devices/system/node") else {
        return 1;
    };
    let count = entries
        .filter_map(std::result::Result::ok)
        .filter(|e| {
            e.file_name()
                .to_str()
                .is_some_and(|n| n.starts_with("node") && n[4..].parse::<u32>().is_ok())
        })
        .count();
    count.max(1)
}

#[cfg(not(target_os = "linux"))]
fn discover_num_sockets() -> usize {
    1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_socket_assigns_every_thread_to_socket_zero() {
        let topo = Topology::single_socket(8);
        assert_eq!(topo.num_threads(), 8);
        assert_eq!(topo.num_sockets(), 1);
        for t in 0..8 {
            assert_eq!(topo.socket_of(t), 0);
        }
    }

    #[test]
    fn socket_thread_range_is_contiguous_and_covers_every_thread() {
        let topo = Topology::single_socket(4);
        assert_eq!(topo.socket_thread_range(0), 0..4);
    }
}
