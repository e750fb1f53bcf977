// Copyright Katana Graph Authors
// SPDX-License-Identifier: Apache-2.0

//! Scenario S5 (spec.md §8): a supervisor bound to the `Null` policy ignores
//! memory pressure; switching it to `Performance` mid-run (`set_policy`)
//! makes the same frozen OS signals trigger a reclaim pass. `used_ratio` is
//! an independent OS-level fact (`os.rss_bytes() / physical_budget`, spec.md
//! §4.1), not derived from the supervisor's own active/standby bookkeeping,
//! so it is set directly on the fake OS signals alongside `oom_score` and
//! `available_bytes` — matching how spec.md's own S5 text treats
//! `used_ratio = 0.9` as an independently synthesized fact.
//!
//! `oom_score` is set to 1150 rather than spec.md's literal 1200: ground
//! truth (`examples/original_source/libgalois/src/MemoryPolicy.cpp:80-92`)
//! puts the half/full split for `PerformancePolicy::reclaim_goal` at a
//! literal 1200, with `oom_score >= 1200` falling into the *full*-reclaim
//! band rather than `standby / 2` — 1200 itself is the boundary, not the
//! midpoint spec.md's prose implies. 1150 sits unambiguously inside the
//! `[1000, 1200)` half-reclaim band (see DESIGN.md's Open Question entry for
//! `PerformancePolicy::reclaim_goal`) while preserving the scenario's intent
//! of a pressure-true, half-standby reclaim once switched off `Null`. Uses
//! [`katana_substrate::memory::os_signals::FakeOsSignals`] so the pressure
//! reading is deterministic.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use katana_substrate::config::{MemoryPolicyConfig, MemoryPolicyKind};
use katana_substrate::memory::os_signals::FakeOsSignals;
use katana_substrate::memory::{MemorySupervisor, ReclaimTarget, build_policy};

const BUDGET: i64 = 1_000;
const RSS_BYTES: i64 = 900; // used_ratio = 900 / 1000 = 0.9, per spec.md §8 S5.
const ACTIVE: i64 = 800;
const STANDBY: i64 = 100;

/// A manager holding a fixed pool of standby bytes it will shed on demand.
struct StandbyPool {
    held: AtomicI64,
}

impl ReclaimTarget for StandbyPool {
    fn free_standby_memory(&self, goal: i64) -> i64 {
        let held = self.held.load(Ordering::Relaxed);
        let freed = goal.min(held);
        self.held.fetch_sub(freed, Ordering::Relaxed);
        freed
    }
}

#[test]
fn scenario_s5_switching_from_null_to_performance_activates_reclaim() {
    // oom_score 1150 (above high_pressure_oom 1100, inside the
    // reclaim_goal half-reclaim band [1000, 1200) — see module docs),
    // used_ratio 0.9 (above high_used_ratio 0.85, below kill_used_ratio
    // 0.95, read independently from `rss_bytes`), available_bytes
    // 0.05 * BUDGET (below the 0.10 * physical_budget scarcity floor every
    // non-Minimal predicate gates on).
    let os = FakeOsSignals::new();
    os.set_oom_score(1150);
    os.set_available_bytes(BUDGET / 20);
    os.set_rss_bytes(RSS_BYTES);

    let null_policy = build_policy(&MemoryPolicyConfig { kind: MemoryPolicyKind::Null, thresholds: None }, BUDGET);
    let mut supervisor = MemorySupervisor::new(null_policy, BUDGET).with_os_signals(Box::new(os));

    let target = Arc::new(StandbyPool { held: AtomicI64::new(STANDBY) });
    let dyn_target: Arc<dyn ReclaimTarget> = target.clone();
    let handle = supervisor.register("standby_pool", &dyn_target).unwrap();
    supervisor.borrow_active(&handle, ACTIVE).unwrap();
    supervisor.borrow_standby(&handle, STANDBY).unwrap();

    // Under Null, the frozen pressure signal is never consulted.
    assert_eq!(supervisor.reclaim_memory(), 0);
    assert_eq!(target.held.load(Ordering::Relaxed), STANDBY);

    let performance_policy =
        build_policy(&MemoryPolicyConfig { kind: MemoryPolicyKind::Performance, thresholds: None }, BUDGET);
    supervisor.set_policy(performance_policy);

    // reclaim_goal = standby / 2 = 50 while oom_score sits inside the
    // [1000, 1200) half-reclaim band, matching spec.md §8 S5's
    // "reclaim_goal equal to standby / 2".
    assert_eq!(supervisor.reclaim_memory(), 50);
    assert_eq!(target.held.load(Ordering::Relaxed), 50);

    // A second pass: standby is now 50. used_ratio is read from `rss_bytes`
    // independently of active/standby, so it is unchanged at 0.9; oom_score
    // (1150) is also unchanged, so reclaim_goal is still in the half-reclaim
    // band: goal = 50 / 2 = 25.
    assert_eq!(supervisor.reclaim_memory(), 25);
    assert_eq!(target.held.load(Ordering::Relaxed), 25);

    assert!(supervisor.sanity_check());
}
