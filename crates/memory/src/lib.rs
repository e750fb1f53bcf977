// Copyright Katana Graph Authors
// SPDX-License-Identifier: Apache-2.0

//! Cooperative memory-budget controller.
//!
//! Data Model:
//! - [`MemorySupervisor`] tracks active/standby byte counts per registered
//!   manager and asks managers to shed standby memory under pressure.
//! - [`policy::MemoryPolicy`] is the pluggable predicate set (pressure,
//!   reclaim goal, kill) a supervisor consults; [`policy::build_policy`]
//!   constructs the named policy from [`katana_config::policy::MemoryPolicyConfig`].
//! - [`os_signals::OsSignals`] abstracts the machine facts policies read
//!   (RSS, available memory, OOM score), with a real `/proc`-backed
//!   implementation and a [`os_signals::FakeOsSignals`] test double.
//!
//! A manager participates by implementing [`ReclaimTarget`] and registering
//! itself with a supervisor; see [`crate::supervisor`] for the full
//! reclaim protocol and its reentrancy-avoiding design.

pub mod error;
pub mod os_signals;
pub mod policy;
mod supervisor;

pub use error::{Error, Result};
pub use os_signals::OsSignals;
pub use policy::{MemoryPolicy, build_policy};
pub use supervisor::{ManagerHandle, MemorySupervisor, ReclaimTarget};
