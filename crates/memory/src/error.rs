// Copyright Katana Graph Authors
// SPDX-License-Identifier: Apache-2.0

//! Errors for the memory supervisor.

use miette::Diagnostic;

/// Errors returned by [`crate::MemorySupervisor`] operations.
#[derive(thiserror::Error, Debug, Diagnostic)]
pub enum Error {
    /// A manager name was already registered.
    #[error("manager '{name}' is already registered")]
    #[diagnostic(code(katana_memory::already_registered), url(docsrs))]
    AlreadyRegistered {
        /// The conflicting manager name.
        name: String,
    },

    /// An operation referenced a manager handle the supervisor does not
    /// recognize (unregistered, or registered with a different supervisor).
    #[error("manager '{name}' is not registered")]
    #[diagnostic(code(katana_memory::not_registered), url(docsrs))]
    NotRegistered {
        /// The unknown manager name.
        name: String,
    },
}

/// Convenience alias for fallible supervisor operations.
pub type Result<T> = std::result::Result<T, Error>;
