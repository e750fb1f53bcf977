// Copyright Katana Graph Authors
// SPDX-License-Identifier: Apache-2.0

//! Errors for thread pool construction and per-thread storage access.

use miette::Diagnostic;

/// Errors returned by [`crate::ThreadPool`] and [`crate::PerThread`] operations.
#[derive(thiserror::Error, Debug, Diagnostic)]
pub enum Error {
    /// [`crate::ThreadPool::new`] was asked for zero worker threads.
    #[error("thread pool must have at least one worker thread")]
    #[diagnostic(code(katana_runtime::zero_threads), url(docsrs))]
    ZeroThreads,

    /// A per-thread storage slot was addressed by an index with no
    /// corresponding worker (or accessed from a thread the pool does not
    /// recognize as one of its own workers).
    #[error("thread index {index} is out of range for a pool of {num_threads} workers")]
    #[diagnostic(code(katana_runtime::thread_index_out_of_range), url(docsrs))]
    ThreadIndexOutOfRange {
        /// The requested index.
        index: usize,
        /// The pool's configured worker count.
        num_threads: usize,
    },

    /// [`crate::PerThread::local`] (or a reducer built on it) was called
    /// from a thread that is not one of the pool's own workers, so there is
    /// no well-defined "local" slot.
    #[error("current thread is not a worker of this thread pool")]
    #[diagnostic(code(katana_runtime::not_a_worker_thread), url(docsrs))]
    NotAWorkerThread,
}

/// Convenience alias for fallible runtime operations.
pub type Result<T> = std::result::Result<T, Error>;
