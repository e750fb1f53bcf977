// Copyright Katana Graph Authors
// SPDX-License-Identifier: Apache-2.0

//! Configuration surface for the graph analytics substrate.
//!
//! Data Model:
//! - [`SubstrateConfig`]
//!   - memory supervision ([`policy::MemoryPolicyConfig`], physical budget)
//!   - thread pool / core allocation ([`policy::CoreAllocationConfig`])
//!   - chunk widths ([`policy::ChunkConfig`])
//!   - property cache capacity
//!   - tiled executor block sizing ([`policy::TiledExecutorConfig`])
//!
//! Every nested struct derives `serde::{Serialize, Deserialize}` and
//! `schemars::JsonSchema` with `#[serde(deny_unknown_fields)]`, so a
//! configuration document is validated structurally at parse time rather
//! than by ad hoc checks scattered through the substrate.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub mod byte_units;
pub mod error;
pub mod policy;

pub use error::Error;
pub use policy::{
    ChunkConfig, CoreAllocationConfig, MemoryPolicyConfig, MemoryPolicyKind, MemoryThresholds,
    TiledExecutorConfig,
};

/// Capacity configuration for the property cache.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct PropertyCacheConfig {
    /// Maximum resident bytes the cache may hold before it starts evicting
    /// least-recently-used entries on its own, independent of supervisor
    /// reclamation. `None` means the cache is bounded only by supervisor
    /// reclamation requests.
    #[serde(default, deserialize_with = "byte_units::deserialize")]
    pub max_resident_bytes: Option<u32>,
}

impl Default for PropertyCacheConfig {
    fn default() -> Self {
        Self {
            max_resident_bytes: None,
        }
    }
}

/// Top-level configuration for one substrate instance.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SubstrateConfig {
    /// Process-wide physical memory budget. Accepts either a plain byte
    /// count or a unit string such as `"8 GiB"`.
    #[serde(
        default = "SubstrateConfig::default_physical_budget_bytes",
        deserialize_with = "byte_units::deserialize_u64"
    )]
    pub physical_budget_bytes: u64,
    /// Memory supervision policy.
    #[serde(default)]
    pub memory_policy: MemoryPolicyConfig,
    /// Thread pool / core allocation.
    #[serde(default)]
    pub cores: CoreAllocationConfig,
    /// Worklist and property-column chunk widths.
    #[serde(default)]
    pub chunks: ChunkConfig,
    /// Property cache capacity.
    #[serde(default)]
    pub property_cache: PropertyCacheConfig,
    /// 2-D tiled executor defaults.
    #[serde(default)]
    pub tiled_executor: TiledExecutorConfig,
}

impl SubstrateConfig {
    const fn default_physical_budget_bytes() -> u64 {
        // 4 GiB: a conservative default that does not assume anything about
        // the host beyond "some memory exists". Real deployments should set
        // this explicitly from the actual machine budget.
        4 * 1024 * 1024 * 1024
    }

    /// Validate cross-field invariants not expressible through serde alone.
    ///
    /// # Errors
    /// Returns [`Error::InvalidConfiguration`] with one [`Error::InvalidField`]
    /// per violated constraint.
    pub fn validate(&self) -> Result<(), Error> {
        let mut errors = Vec::new();
        if self.physical_budget_bytes == 0 {
            errors.push(Error::InvalidField {
                field: "physical_budget_bytes".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }
        if self.chunks.worklist_chunk_size == 0 {
            errors.push(Error::InvalidField {
                field: "chunks.worklist_chunk_size".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }
        if self.chunks.property_chunk_width == 0 {
            errors.push(Error::InvalidField {
                field: "chunks.property_chunk_width".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }
        if let Some(n) = self.cores.num_threads {
            if n == 0 {
                errors.push(Error::InvalidField {
                    field: "cores.num_threads".to_string(),
                    reason: "must be greater than 0 when set".to_string(),
                });
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(Error::InvalidConfiguration { errors })
        }
    }
}

impl Default for SubstrateConfig {
    fn default() -> Self {
        Self {
            physical_budget_bytes: Self::default_physical_budget_bytes(),
            memory_policy: MemoryPolicyConfig::default(),
            cores: CoreAllocationConfig::default(),
            chunks: ChunkConfig::default(),
            property_cache: PropertyCacheConfig::default(),
            tiled_executor: TiledExecutorConfig::default(),
        }
    }
}
