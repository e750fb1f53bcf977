// Copyright Katana Graph Authors
// SPDX-License-Identifier: Apache-2.0

//! Memory policy and resource allocation configuration.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// The named memory policies a [`crate::SubstrateConfig`] may select.
///
/// Policies differ only in thresholds and aggressiveness, per the policy
/// table: *Performance* keeps memory and sheds only near OOM, *Minimal*
/// sheds aggressively as soon as the OOM score rises, *Meek* reclaims
/// whenever free memory is scarce regardless of OOM score, and *Null*
/// never reclaims (useful for deterministic tests).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum MemoryPolicyKind {
    /// Keep memory resident; shed only under real pressure.
    #[default]
    Performance,
    /// Shed standby memory as soon as the OOM score crosses the high-pressure threshold.
    Minimal,
    /// Reclaim whenever machine-wide free memory is scarce, regardless of OOM score.
    Meek,
    /// Never reclaim and never kill; for tests and embeddings that manage memory themselves.
    Null,
}

/// Threshold set shared by every policy's predicates.
///
/// Field names and default values mirror the upstream policy table; the
/// `Performance`, `Meek`, and `Null` policies share the same thresholds and
/// differ only in which side channels their predicates consult. `Minimal`
/// raises `high_used_ratio` to 0.95 and drops the `available_bytes` clause
/// entirely.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct MemoryThresholds {
    /// Resident/physical ratio above which pressure is considered high.
    #[serde(default = "MemoryThresholds::default_high_used_ratio")]
    pub high_used_ratio: f64,
    /// Resident/physical ratio above which the process kills itself.
    #[serde(default = "MemoryThresholds::default_kill_used_ratio")]
    pub kill_used_ratio: f64,
    /// `/proc/self/oom_score` value above which the process kills itself.
    #[serde(default = "MemoryThresholds::default_kill_oom")]
    pub kill_oom: i64,
    /// `/proc/self/oom_score` value above which pressure is considered high.
    #[serde(default = "MemoryThresholds::default_high_pressure_oom")]
    pub high_pressure_oom: i64,
}

impl MemoryThresholds {
    const fn default_high_used_ratio() -> f64 {
        0.85
    }
    const fn default_kill_used_ratio() -> f64 {
        0.95
    }
    const fn default_kill_oom() -> i64 {
        1280
    }
    const fn default_high_pressure_oom() -> i64 {
        1100
    }

    /// Thresholds for the `Performance` / `Meek` / `Null` policies.
    #[must_use]
    pub const fn performance() -> Self {
        Self {
            high_used_ratio: 0.85,
            kill_used_ratio: 0.95,
            kill_oom: 1280,
            high_pressure_oom: 1100,
        }
    }

    /// Thresholds for the `Minimal` policy (raised `high_used_ratio`).
    #[must_use]
    pub const fn minimal() -> Self {
        Self {
            high_used_ratio: 0.95,
            kill_used_ratio: 0.95,
            kill_oom: 1280,
            high_pressure_oom: 1100,
        }
    }
}

impl Default for MemoryThresholds {
    fn default() -> Self {
        Self::performance()
    }
}

/// Top-level memory supervision policy configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(deny_unknown_fields)]
pub struct MemoryPolicyConfig {
    /// Which named policy to instantiate.
    #[serde(default)]
    pub kind: MemoryPolicyKind,
    /// Threshold overrides. When absent, the policy's own defaults apply
    /// (`Minimal` uses [`MemoryThresholds::minimal`], all others use
    /// [`MemoryThresholds::performance`]).
    pub thresholds: Option<MemoryThresholds>,
}

impl MemoryPolicyConfig {
    /// Resolve the effective thresholds for this configuration: an explicit
    /// override if present, otherwise the policy kind's own default.
    #[must_use]
    pub fn effective_thresholds(&self) -> MemoryThresholds {
        self.thresholds.unwrap_or(match self.kind {
            MemoryPolicyKind::Minimal => MemoryThresholds::minimal(),
            MemoryPolicyKind::Performance | MemoryPolicyKind::Meek | MemoryPolicyKind::Null => {
                MemoryThresholds::performance()
            }
        })
    }
}

/// Core/thread allocation for the work-stealing thread pool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct CoreAllocationConfig {
    /// Number of worker threads to start. `None` means "one per discovered logical core".
    #[serde(default)]
    pub num_threads: Option<usize>,
    /// Pin each worker thread to a distinct logical core via `core_affinity`.
    #[serde(default = "default_true")]
    pub pin_threads: bool,
    /// Busy-wait on an empty local deque instead of parking on a condition variable.
    #[serde(default)]
    pub busy_wait: bool,
}

impl Default for CoreAllocationConfig {
    fn default() -> Self {
        Self {
            num_threads: None,
            pin_threads: true,
            busy_wait: false,
        }
    }
}

const fn default_true() -> bool {
    true
}

/// Chunk widths used throughout the worklist and property-column layers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ChunkConfig {
    /// Unit of ownership for chunked worklists (FIFO/LIFO/OBIM buckets).
    #[serde(default = "ChunkConfig::default_worklist_chunk_size")]
    pub worklist_chunk_size: usize,
    /// Width of a property column chunk, in rows.
    #[serde(default = "ChunkConfig::default_property_chunk_width")]
    pub property_chunk_width: usize,
}

impl ChunkConfig {
    const fn default_worklist_chunk_size() -> usize {
        64
    }
    const fn default_property_chunk_width() -> usize {
        25_000
    }
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            worklist_chunk_size: Self::default_worklist_chunk_size(),
            property_chunk_width: Self::default_property_chunk_width(),
        }
    }
}

/// 2-D tiled executor block sizing, shared across matrix-completion-style kernels.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct TiledExecutorConfig {
    /// Tile width along the X axis, in nodes.
    #[serde(default = "TiledExecutorConfig::default_block_size")]
    pub block_size_x: usize,
    /// Tile width along the Y axis, in nodes.
    #[serde(default = "TiledExecutorConfig::default_block_size")]
    pub block_size_y: usize,
    /// Maximum updates to apply to any one tile before it is retired.
    #[serde(default = "TiledExecutorConfig::default_max_updates")]
    pub max_updates_per_block: usize,
}

impl TiledExecutorConfig {
    const fn default_block_size() -> usize {
        64
    }
    const fn default_max_updates() -> usize {
        1
    }
}

impl Default for TiledExecutorConfig {
    fn default() -> Self {
        Self {
            block_size_x: Self::default_block_size(),
            block_size_y: Self::default_block_size(),
            max_updates_per_block: Self::default_max_updates(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn performance_thresholds_match_upstream_defaults() {
        let t = MemoryThresholds::performance();
        assert_eq!(t.high_used_ratio, 0.85);
        assert_eq!(t.kill_used_ratio, 0.95);
        assert_eq!(t.kill_oom, 1280);
        assert_eq!(t.high_pressure_oom, 1100);
    }

    #[test]
    fn minimal_thresholds_raise_high_used_ratio_only() {
        let t = MemoryThresholds::minimal();
        assert_eq!(t.high_used_ratio, 0.95);
        assert_eq!(t.kill_used_ratio, 0.95);
        assert_eq!(t.kill_oom, 1280);
        assert_eq!(t.high_pressure_oom, 1100);
    }

    #[test]
    fn policy_config_resolves_kind_specific_defaults_when_unset() {
        let minimal = MemoryPolicyConfig {
            kind: MemoryPolicyKind::Minimal,
            thresholds: None,
        };
        assert_eq!(
            minimal.effective_thresholds().high_used_ratio,
            MemoryThresholds::minimal().high_used_ratio
        );

        let performance = MemoryPolicyConfig {
            kind: MemoryPolicyKind::Performance,
            thresholds: None,
        };
        assert_eq!(
            performance.effective_thresholds().high_used_ratio,
            MemoryThresholds::performance().high_used_ratio
        );
    }

    #[test]
    fn policy_config_honors_explicit_override() {
        let custom = MemoryPolicyConfig {
            kind: MemoryPolicyKind::Performance,
            thresholds: Some(MemoryThresholds {
                high_used_ratio: 0.5,
                kill_used_ratio: 0.6,
                kill_oom: 900,
                high_pressure_oom: 800,
            }),
        };
        assert_eq!(custom.effective_thresholds().high_used_ratio, 0.5);
    }

    #[test]
    fn defaults_match_expected_values() {
        let cores = CoreAllocationConfig::default();
        assert_eq!(cores.num_threads, None);
        assert!(cores.pin_threads);
        assert!(!cores.busy_wait);

        let chunks = ChunkConfig::default();
        assert_eq!(chunks.worklist_chunk_size, 64);
        assert_eq!(chunks.property_chunk_width, 25_000);

        let tiles = TiledExecutorConfig::default();
        assert_eq!(tiles.block_size_x, 64);
        assert_eq!(tiles.block_size_y, 64);
        assert_eq!(tiles.max_updates_per_block, 1);
    }
}
