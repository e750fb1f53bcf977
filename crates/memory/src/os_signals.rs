// Copyright Katana Graph Authors
// SPDX-License-Identifier: Apache-2.0

//! Side-channel facts a [`crate::policy::MemoryPolicy`] consults on demand:
//! resident set size, machine-wide available memory, and the Linux OOM
//! score. Behind a trait so policy predicates are deterministically
//! testable without a real process under memory pressure.

use std::fs;
use std::sync::atomic::{AtomicI64, Ordering};

/// Source of the OS-level facts every memory policy predicate reads.
pub trait OsSignals: Send + Sync {
    /// Process resident set size, in bytes.
    fn rss_bytes(&self) -> i64;
    /// Machine-wide available memory, in bytes (0 if unknown).
    fn available_bytes(&self) -> i64;
    /// Linux `/proc/self/oom_score` (0 on platforms without OOM scoring).
    fn oom_score(&self) -> i64;
    /// Total installed physical memory, in bytes (0 if unknown).
    fn total_system_memory(&self) -> i64;
}

/// Reads real OS signals. On Linux this parses `/proc/self/oom_score` and
/// `/proc/meminfo`; on other platforms `oom_score` and memory totals read
/// as 0, matching the upstream "no OOM scoring on this platform" fallback.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemOsSignals;

impl OsSignals for SystemOsSignals {
    fn rss_bytes(&self) -> i64 {
        memory_stats::memory_stats().map_or(0, |s| s.physical_mem as i64)
    }

    fn available_bytes(&self) -> i64 {
        meminfo_field("MemAvailable:") as i64
    }

    fn oom_score(&self) -> i64 {
        oom_score_linux()
    }

    fn total_system_memory(&self) -> i64 {
        meminfo_field("MemTotal:") as i64
    }
}

#[cfg(target_os = "linux")]
fn meminfo_field(prefix: &str) -> u64 {
    let Ok(contents) = fs::read_to_string("/proc/meminfo") else {
        return 0;
    };
    for line in contents.lines() {
        if let Some(rest) = line.strip_prefix(prefix) {
            let kb: u64 = rest
                .trim()
                .trim_end_matches("kB")
                .trim()
                .parse()
                .unwrap_or(0);
            return kb * 1024;
        }
    }
    0
}

#[cfg(not(target_os = "linux"))]
fn meminfo_field(_prefix: &str) -> u64 {
    0
}

#[cfg(target_os = "linux")]
fn oom_score_linux() -> i64 {
    fs::read_to_string("/proc/self/oom_score")
        .ok()
        .and_then(|s| s.trim().parse::<i64>().ok())
        .unwrap_or(0)
}

#[cfg(not(target_os = "linux"))]
fn oom_score_linux() -> i64 {
    0
}

/// A fully synthetic [`OsSignals`] for deterministic tests: every field is
/// an independently settable atomic, so a test can drive a policy through
/// specific `(used_ratio, oom_score, available_bytes)` combinations (as in
/// scenario S5) without touching the real machine.
#[derive(Debug)]
pub struct FakeOsSignals {
    rss_bytes: AtomicI64,
    available_bytes: AtomicI64,
    oom_score: AtomicI64,
    total_system_memory: AtomicI64,
}

impl FakeOsSignals {
    /// Construct a fake with all signals at zero.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rss_bytes: AtomicI64::new(0),
            available_bytes: AtomicI64::new(0),
            oom_score: AtomicI64::new(0),
            total_system_memory: AtomicI64::new(0),
        }
    }

    /// Set the reported resident set size.
    pub fn set_rss_bytes(&self, value: i64) {
        self.rss_bytes.store(value, Ordering::Relaxed);
    }

    /// Set the reported machine-wide available memory.
    pub fn set_available_bytes(&self, value: i64) {
        self.available_bytes.store(value, Ordering::Relaxed);
    }

    /// Set the reported OOM score.
    pub fn set_oom_score(&self, value: i64) {
        self.oom_score.store(value, Ordering::Relaxed);
    }

    /// Set the reported total system memory.
    pub fn set_total_system_memory(&self, value: i64) {
        self.total_system_memory.store(value, Ordering::Relaxed);
    }
}

impl Default for FakeOsSignals {
    fn default() -> Self {
        Self::new()
    }
}

impl OsSignals for FakeOsSignals {
    fn rss_bytes(&self) -> i64 {
        self.rss_bytes.load(Ordering::Relaxed)
    }

    fn available_bytes(&self) -> i64 {
        self.available_bytes.load(Ordering::Relaxed)
    }

    fn oom_score(&self) -> i64 {
        self.oom_score.load(Ordering::Relaxed)
    }

    fn total_system_memory(&self) -> i64 {
        self.total_system_memory.load(Ordering::Relaxed)
    }
}
