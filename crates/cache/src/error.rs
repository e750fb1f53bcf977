// Copyright Katana Graph Authors
// SPDX-License-Identifier: Apache-2.0

//! Errors for the property cache and property manager.

use miette::Diagnostic;

/// Errors returned by [`crate::PropertyManager`] operations.
#[derive(thiserror::Error, Debug, Diagnostic)]
pub enum Error {
    /// The underlying [`katana_memory::MemorySupervisor`] rejected or could
    /// not locate this manager's registration.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Memory(#[from] katana_memory::Error),

    /// [`crate::PropertyManager::unload_property`] was refused because the
    /// supervisor's policy still reports memory pressure after the standby
    /// transition; the caller keeps the property active.
    #[error("unload of property refused by memory policy, keeping it active")]
    #[diagnostic(code(katana_cache::unload_refused), url(docsrs))]
    UnloadRefused,
}

/// Convenience alias for fallible cache/manager operations.
pub type Result<T> = std::result::Result<T, Error>;
