// Copyright Katana Graph Authors
// SPDX-License-Identifier: Apache-2.0

//! Scenario S2: BFS reachability over `for_each`, using an atomic
//! compare-exchange on the distance array both to settle a node's depth
//! and to claim it (avoiding duplicate pushes of the same node).

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use katana_substrate::graph::Csr;
use katana_substrate::loops::{Context, LoopOptions, for_each};
use katana_substrate::runtime::{ThreadPool, Topology};
use katana_substrate::worklist::PerSocketChunkFifo;

/// 0 -> {1, 2}, 1 -> 3, 2 -> 3, 3 -> 4. Expected BFS distances from node 0:
/// [0, 1, 1, 2, 3]. Node 4 has no outgoing edges.
fn sample_graph() -> Csr {
    let out_index = vec![0, 2, 3, 4, 5, 5];
    let out_dest = vec![1, 2, 3, 3, 4];
    Csr::new(out_index, out_dest).unwrap()
}

fn bfs(csr: &Csr, source: u32, num_threads: usize) -> Vec<i64> {
    let pool = ThreadPool::with_topology(Topology::single_socket(num_threads), false, false, None);
    let worklist: Arc<PerSocketChunkFifo<u32>> = Arc::new(PerSocketChunkFifo::new(pool.topology(), 8));

    let dist: Arc<Vec<AtomicI64>> = Arc::new((0..csr.num_nodes()).map(|_| AtomicI64::new(-1)).collect());
    dist[source as usize].store(0, Ordering::Relaxed);

    let dist_body = dist.clone();
    let out_index = csr.out_index().to_vec();
    let out_dest = csr.out_dest().to_vec();
    let body = Arc::new(move |node: u32, ctx: &Context<'_, u32, PerSocketChunkFifo<u32>>| {
        let depth = dist_body[node as usize].load(Ordering::Relaxed);
        let range = out_index[node as usize] as usize..out_index[node as usize + 1] as usize;
        for &v in &out_dest[range] {
            if dist_body[v as usize]
                .compare_exchange(-1, depth + 1, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                ctx.push(v);
            }
        }
    });

    let opts = LoopOptions::named("bfs");
    for_each(&pool, worklist, vec![source], body, &opts, None);
    pool.shutdown();

    dist.iter().map(|d| d.load(Ordering::Relaxed)).collect()
}

#[test]
fn scenario_s2_bfs_distances_from_node_zero() {
    let csr = sample_graph();
    let got = bfs(&csr, 0, 4);
    assert_eq!(got, vec![0, 1, 1, 2, 3]);
}

#[test]
fn scenario_s2_only_itself_is_reachable_from_the_sink_node() {
    let csr = sample_graph();
    let got = bfs(&csr, 4, 4);
    assert_eq!(got[4], 0);
    assert!(got[0..4].iter().all(|&d| d == -1));
}
