// Copyright Katana Graph Authors
// SPDX-License-Identifier: Apache-2.0

//! Scenario S3: triangle counting is not a substrate feature (algorithms
//! are a Non-goal) — this test exercises the CSR sort contract and the
//! `do_all` parallel loop that a triangle-counting *client* would be built
//! from, on a graph whose answer is known (K4 has exactly 4 triangles).

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use katana_substrate::graph::Csr;
use katana_substrate::loops::{LoopOptions, do_all};
use katana_substrate::runtime::{ThreadPool, Topology};

/// Undirected K4 (every node connects to every other), stored with each
/// node's adjacency list *not* yet sorted by destination.
fn k4_unsorted() -> Csr {
    let out_index = vec![0, 3, 6, 9, 12];
    let out_dest = vec![
        3, 2, 1, // node 0
        3, 2, 0, // node 1
        3, 1, 0, // node 2
        2, 1, 0, // node 3
    ];
    Csr::new(out_index, out_dest).unwrap()
}

#[test]
fn scenario_s3_sort_then_count_triangles_on_k4() {
    let mut csr = k4_unsorted();
    assert!(!csr.is_sorted_by_dest());

    let perm = csr.sort_all_edges_by_dest();
    assert_eq!(perm.len(), csr.num_edges());
    assert!(csr.is_sorted_by_dest());
    for node in 0..csr.num_nodes() as u32 {
        assert_eq!(csr.neighbors(node), &[0, 1, 2, 3].into_iter().filter(|&n| n != node).collect::<Vec<_>>()[..]);
    }

    let pool = ThreadPool::with_topology(Topology::single_socket(4), false, false, None);
    let csr = Arc::new(csr);
    let total = Arc::new(AtomicUsize::new(0));

    let csr_body = csr.clone();
    let total_body = total.clone();
    let nodes: Vec<u32> = (0..csr.num_nodes() as u32).collect();
    do_all(
        &pool,
        nodes,
        Arc::new(move |u: u32| {
            // Count only triangles where u is the smallest-id vertex, so
            // each triangle is counted exactly once across all nodes.
            let mut local = 0usize;
            for &v in csr_body.neighbors(u) {
                if v <= u {
                    continue;
                }
                for &w in csr_body.neighbors(v) {
                    if w <= v {
                        continue;
                    }
                    if csr_body.neighbors(u).binary_search(&w).is_ok() {
                        local += 1;
                    }
                }
            }
            total_body.fetch_add(local, Ordering::Relaxed);
        }),
        &LoopOptions::named("triangle_count").chunk_size(1),
        None,
    );
    pool.shutdown();

    assert_eq!(total.load(Ordering::Relaxed), 4);
}
