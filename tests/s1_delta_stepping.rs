// Copyright Katana Graph Authors
// SPDX-License-Identifier: Apache-2.0

//! Scenario S1: delta-stepping SSSP run over OBIM at several deltas,
//! checked for agreement with a single-threaded run and with the known
//! shortest distances.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use katana_substrate::graph::Csr;
use katana_substrate::loops::{Context, LoopOptions, for_each};
use katana_substrate::runtime::{ThreadPool, Topology};
use katana_substrate::worklist::OrderedByIntegerMetric;

type Item = (u32, u64);
type Obim = OrderedByIntegerMetric<Item, Box<dyn Fn(&Item) -> u64 + Send + Sync>>;

/// 0 --2--> 1 --1--> 2 --2--> 3 --4--> 4, plus a longer 0 --5--> 2 that the
/// shorter 0->1->2 path should beat. Expected distances from node 0:
/// [0, 2, 3, 5, 9].
fn sample_graph() -> (Csr, Vec<u32>) {
    let out_index = vec![0, 2, 3, 4, 5, 5];
    let out_dest = vec![1, 2, 2, 3, 4];
    let weights = vec![2, 5, 1, 2, 4];
    (Csr::new(out_index, out_dest).unwrap(), weights)
}

fn relax(dist: &[AtomicU64], node: usize, candidate: u64) -> bool {
    let mut current = dist[node].load(Ordering::Relaxed);
    while candidate < current {
        match dist[node].compare_exchange_weak(current, candidate, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => return true,
            Err(observed) => current = observed,
        }
    }
    false
}

fn delta_stepping_sssp(csr: &Csr, weights: &[u32], source: u32, delta: u64, num_threads: usize) -> Vec<u64> {
    let pool = ThreadPool::with_topology(Topology::single_socket(num_threads), false, false, None);
    let dist: Arc<Vec<AtomicU64>> = Arc::new(
        (0..csr.num_nodes())
            .map(|n| AtomicU64::new(if n as u32 == source { 0 } else { u64::MAX }))
            .collect(),
    );

    let indexer: Box<dyn Fn(&Item) -> u64 + Send + Sync> = Box::new(move |item: &Item| item.1 / delta);
    let worklist: Arc<Obim> = Arc::new(OrderedByIntegerMetric::new(indexer));

    let dist_body = dist.clone();
    let out_index = csr.out_index().to_vec();
    let out_dest = csr.out_dest().to_vec();
    let weights = weights.to_vec();
    let body = Arc::new(move |item: Item, ctx: &Context<'_, Item, Obim>| {
        let (u, d) = item;
        if dist_body[u as usize].load(Ordering::Relaxed) < d {
            return; // a cheaper relaxation already settled this node.
        }
        let range = out_index[u as usize] as usize..out_index[u as usize + 1] as usize;
        for edge in range {
            let v = out_dest[edge];
            let candidate = d + u64::from(weights[edge]);
            if relax(&dist_body, v as usize, candidate) {
                ctx.push((v, candidate));
            }
        }
    });

    let opts = LoopOptions::named("delta_stepping_sssp");
    for_each(&pool, worklist, vec![(source, 0)], body, &opts, None);
    pool.shutdown();

    dist.iter().map(|d| d.load(Ordering::Relaxed)).collect()
}

#[test]
fn scenario_s1_delta_stepping_agrees_across_deltas_and_thread_counts() {
    let (csr, weights) = sample_graph();
    let expected = vec![0u64, 2, 3, 5, 9];

    for &delta in &[1u64, 2, 4] {
        for &threads in &[1usize, 4] {
            let got = delta_stepping_sssp(&csr, &weights, 0, delta, threads);
            assert_eq!(got, expected, "delta={delta} threads={threads}");
        }
    }
}

#[test]
fn scenario_s1_unreachable_node_keeps_its_sentinel_distance() {
    let (csr, weights) = sample_graph();
    // From node 4, nothing is reachable (it has no outgoing edges).
    let got = delta_stepping_sssp(&csr, &weights, 4, 2, 4);
    assert_eq!(got[4], 0);
    assert!(got[0..4].iter().all(|&d| d == u64::MAX));
}
