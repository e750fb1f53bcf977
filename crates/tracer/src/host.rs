// Copyright Katana Graph Authors
// SPDX-License-Identifier: Apache-2.0

//! Host-level statistics attached to log records: process count, total RAM,
//! hostname, pid. Parsed from `/proc/meminfo` on Linux; zeroed elsewhere.

use std::fs;

/// A snapshot of host identity and capacity, attached once per span start
/// and carried alongside every standard metrics bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostStats {
    /// Number of logical processors available to this process.
    pub nprocs: usize,
    /// Total installed RAM, in gibibytes (rounded down).
    pub ram_gb: u64,
    /// Hostname as reported by the OS, or `"unknown"` if unavailable.
    pub hostname: String,
    /// Process id.
    pub pid: u32,
}

impl HostStats {
    /// Gather current host stats. Never fails: unavailable fields are
    /// zeroed or substituted with a placeholder.
    #[must_use]
    pub fn gather() -> Self {
        Self {
            nprocs: std::thread::available_parallelism().map_or(1, |n| n.get()),
            ram_gb: total_ram_bytes() / (1024 * 1024 * 1024),
            hostname: hostname(),
            pid: std::process::id(),
        }
    }
}

fn hostname() -> String {
    if let Ok(name) = fs::read_to_string("/proc/sys/kernel/hostname") {
        let trimmed = name.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }
    std::env::var("HOSTNAME").unwrap_or_else(|_| "unknown".to_string())
}

#[cfg(target_os = "linux")]
fn total_ram_bytes() -> u64 {
    let Ok(contents) = fs::read_to_string("/proc/meminfo") else {
        return 0;
    };
    for line in contents.lines() {
        if let Some(rest) = line.strip_prefix("MemTotal:") {
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
fn total_ram_bytes() -> u64 {
    0
}

/// Process resident set size in bytes, or 0 if unavailable on this platform.
#[must_use]
pub fn rss_bytes() -> u64 {
    memory_stats::memory_stats().map_or(0, |s| s.physical_mem as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gather_never_panics_and_has_a_pid() {
        let stats = HostStats::gather();
        assert_eq!(stats.pid, std::process::id());
        assert!(stats.nprocs >= 1);
    }
}
