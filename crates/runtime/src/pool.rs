// Copyright Katana Graph Authors
// SPDX-License-Identifier: Apache-2.0

//! The fixed work-stealing thread pool (spec.md §4.4 / §5): at most one OS
//! thread per logical core, optionally pinned, busy-waiting or parking on a
//! condition variable while idle.

use std::cell::Cell;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicIsize, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_deque::{Injector, Stealer, Worker};
use katana_config::policy::CoreAllocationConfig;
use katana_tracer::{Tracer, tags};
use parking_lot::{Condvar, Mutex};

use crate::error::{Error, Result};
use crate::topology::Topology;

/// A unit of work dispatched to the pool. Panics inside a job are caught
/// at the worker loop boundary and logged rather than unwinding across the
/// pool (spec.md §9, "catch Arrow exceptions at the boundary... never let
/// them escape into parallel workers").
pub type Job = Box<dyn FnOnce() + Send + 'static>;

thread_local! {
    static CURRENT_WORKER_INDEX: Cell<Option<usize>> = const { Cell::new(None) };
}

/// The calling thread's worker index within its owning pool, or `None` if
/// the calling thread is not a pool worker.
#[must_use]
pub fn current_worker_index() -> Option<usize> {
    CURRENT_WORKER_INDEX.with(|c| c.get())
}

/// Test-only hook to simulate "running as worker N" from the thread that
/// calls a reducer or `PerThread` test directly, without standing up a
/// real pool.
#[doc(hidden)]
pub fn set_current_worker_index_for_test(index: Option<usize>) {
    CURRENT_WORKER_INDEX.with(|c| c.set(index));
}

struct Shared {
    injector: Injector<Job>,
    stealers: Vec<Stealer<Job>>,
    inboxes: Vec<Mutex<VecDeque<Job>>>,
    pending: AtomicIsize,
    pending_cv: Condvar,
    pending_lock: Mutex<()>,
    broadcast_pending: AtomicIsize,
    broadcast_cv: Condvar,
    broadcast_lock: Mutex<()>,
    wake_flag: Mutex<bool>,
    wake_cv: Condvar,
    shutdown: AtomicBool,
}

impl Shared {
    fn wake_all(&self) {
        *self.wake_flag.lock() = true;
        self.wake_cv.notify_all();
    }
}

/// A fixed pool of worker threads sized at construction, topology-aware,
/// offering bulk dispatch (used by `katana-loops`' `do_all`/`for_each`) and
/// exactly-once-per-worker broadcast (`on_each`).
pub struct ThreadPool {
    topology: Topology,
    shared: Arc<Shared>,
    handles: Vec<JoinHandle<()>>,
    pin_threads: bool,
    busy_wait: bool,
}

impl ThreadPool {
    /// Build a pool from `config`, logging startup topology through
    /// `tracer` if given.
    ///
    /// # Errors
    /// Returns [`Error::ZeroThreads`] if `config.num_threads` is `Some(0)`.
    pub fn new(config: &CoreAllocationConfig, tracer: Option<Arc<Tracer>>) -> Result<Self> {
        if config.num_threads == Some(0) {
            return Err(Error::ZeroThreads);
        }
        let topology = Topology::discover(config.num_threads);
        Ok(Self::with_topology(topology, config.pin_threads, config.busy_wait, tracer))
    }

    /// Build a pool over an explicit, already-discovered [`Topology`]
    /// (tests, or embeddings that perform their own topology discovery).
    #[must_use]
    pub fn with_topology(
        topology: Topology,
        pin_threads: bool,
        busy_wait: bool,
        tracer: Option<Arc<Tracer>>,
    ) -> Self {
        let num_threads = topology.num_threads();
        let workers: Vec<Worker<Job>> = (0..num_threads).map(|_| Worker::new_fifo()).collect();
        let stealers: Vec<Stealer<Job>> = workers.iter().map(Worker::stealer).collect();
        let inboxes: Vec<Mutex<VecDeque<Job>>> =
            (0..num_threads).map(|_| Mutex::new(VecDeque::new())).collect();

        let shared = Arc::new(Shared {
            injector: Injector::new(),
            stealers,
            inboxes,
            pending: AtomicIsize::new(0),
            pending_cv: Condvar::new(),
            pending_lock: Mutex::new(()),
            broadcast_pending: AtomicIsize::new(0),
            broadcast_cv: Condvar::new(),
            broadcast_lock: Mutex::new(()),
            wake_flag: Mutex::new(false),
            wake_cv: Condvar::new(),
            shutdown: AtomicBool::new(false),
        });

        if let Some(tracer) = &tracer {
            tracer.active_span().log(
                "thread pool starting",
                tags! {
                    "num_threads" => num_threads as i64,
                    "num_sockets" => topology.num_sockets() as i64,
                    "pin_threads" => pin_threads,
                    "busy_wait" => busy_wait,
                },
            );
        }

        let handles = workers
            .into_iter()
            .enumerate()
            .map(|(index, local)| {
                let shared = shared.clone();
                let core_id = topology.core_id(index);
                std::thread::Builder::new()
                    .name(format!("katana-worker-{index}"))
                    .spawn(move || {
                        CURRENT_WORKER_INDEX.with(|c| c.set(Some(index)));
                        if pin_threads {
                            let _ = core_affinity::set_for_current(core_id);
                        }
                        worker_loop(index, &local, &shared, busy_wait);
                    })
                    .expect("failed to spawn worker thread")
            })
            .collect();

        Self {
            topology,
            shared,
            handles,
            pin_threads,
            busy_wait,
        }
    }

    /// This pool's discovered (or configured) topology.
    #[must_use]
    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Number of worker threads.
    #[must_use]
    pub fn num_threads(&self) -> usize {
        self.topology.num_threads()
    }

    /// Push `jobs` onto the pool's global injector and block the calling
    /// thread until every one of them has run. The primitive `do_all` and
    /// `for_each` (in `katana-loops`) are both built on this.
    pub fn execute_and_wait<I: IntoIterator<Item = Job>>(&self, jobs: I) {
        let jobs: Vec<Job> = jobs.into_iter().collect();
        if jobs.is_empty() {
            return;
        }
        self.shared.pending.store(jobs.len() as isize, Ordering::SeqCst);
        for job in jobs {
            self.shared.injector.push(job);
        }
        self.shared.wake_all();

        let mut guard = self.shared.pending_lock.lock();
        while self.shared.pending.load(Ordering::SeqCst) > 0 {
            self.shared.pending_cv.wait_for(&mut guard, Duration::from_millis(5));
        }
    }

    /// Run `f(thread_id, total_threads)` exactly once on each worker
    /// thread, blocking the caller until every worker has run it
    /// (spec.md §4.6, `on_each`).
    pub fn on_each<F>(&self, f: F)
    where
        F: Fn(usize, usize) + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        let num_threads = self.num_threads();
        self.shared
            .broadcast_pending
            .store(num_threads as isize, Ordering::SeqCst);
        for (index, inbox) in self.shared.inboxes.iter().enumerate() {
            let f = f.clone();
            inbox.lock().push_back(Box::new(move || f(index, num_threads)));
        }
        self.shared.wake_all();

        let mut guard = self.shared.broadcast_lock.lock();
        while self.shared.broadcast_pending.load(Ordering::SeqCst) > 0 {
            self.shared
                .broadcast_cv
                .wait_for(&mut guard, Duration::from_millis(5));
        }
    }

    /// Whether this pool pins worker threads to distinct logical cores.
    #[must_use]
    pub fn pins_threads(&self) -> bool {
        self.pin_threads
    }

    /// Whether idle workers busy-wait instead of parking on a condvar.
    #[must_use]
    pub fn busy_waits(&self) -> bool {
        self.busy_wait
    }

    /// Signal every worker to stop and join their threads. Blocks until
    /// all workers have exited.
    pub fn shutdown(mut self) {
        self.shared.shutdown.store(true, Ordering::SeqCst);
        self.shared.wake_all();
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}

fn find_task(
    local: &Worker<Job>,
    global: &Injector<Job>,
    stealers: &[Stealer<Job>],
) -> Option<Job> {
    local.pop().or_else(|| {
        std::iter::repeat_with(|| {
            global
                .steal_batch_and_pop(local)
                .or_else(|| stealers.iter().map(Stealer::steal).collect())
        })
        .find(|s| !s.is_retry())
        .and_then(|s| s.success())
    })
}

/// Run `job`, converting a panic into a logged error rather than letting
/// it unwind across the worker thread and leave `execute_and_wait`'s
/// caller blocked forever on a pending count that never reaches zero.
fn run_job_catching_panics(job: Job) {
    if let Err(payload) = std::panic::catch_unwind(std::panic::AssertUnwindSafe(job)) {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        tracing::error!(panic = %message, "worker job panicked");
    }
}

fn worker_loop(index: usize, local: &Worker<Job>, shared: &Shared, busy_wait: bool) {
    loop {
        if shared.shutdown.load(Ordering::SeqCst) {
            return;
        }

        if let Some(job) = shared.inboxes[index].lock().pop_front() {
            run_job_catching_panics(job);
            if shared.broadcast_pending.fetch_sub(1, Ordering::SeqCst) == 1 {
                let _guard = shared.broadcast_lock.lock();
                shared.broadcast_cv.notify_all();
            }
            continue;
        }

        if let Some(job) = find_task(local, &shared.injector, &shared.stealers) {
            run_job_catching_panics(job);
            if shared.pending.fetch_sub(1, Ordering::SeqCst) == 1 {
                let _guard = shared.pending_lock.lock();
                shared.pending_cv.notify_all();
            }
            continue;
        }

        if busy_wait {
            std::hint::spin_loop();
            continue;
        }

        let mut flag = shared.wake_flag.lock();
        if !*flag {
            shared.wake_cv.wait_for(&mut flag, Duration::from_millis(5));
        }
        *flag = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn test_pool(num_threads: usize) -> ThreadPool {
        ThreadPool::with_topology(
            Topology::single_socket(num_threads),
            false,
            false,
            None,
        )
    }

    #[test]
    fn execute_and_wait_runs_every_job_exactly_once() {
        let pool = test_pool(4);
        let counter = Arc::new(AtomicIsize::new(0));
        let jobs: Vec<Job> = (0..100)
            .map(|_| {
                let counter = counter.clone();
                Box::new(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                }) as Job
            })
            .collect();
        pool.execute_and_wait(jobs);
        assert_eq!(counter.load(Ordering::SeqCst), 100);
        pool.shutdown();
    }

    #[test]
    fn on_each_runs_once_per_worker_with_correct_thread_id() {
        let pool = test_pool(4);
        let seen: Arc<Mutex<Vec<usize>>> = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        pool.on_each(move |thread_id, total| {
            assert_eq!(total, 4);
            seen_clone.lock().push(thread_id);
        });
        let mut got = seen.lock().clone();
        got.sort_unstable();
        assert_eq!(got, vec![0, 1, 2, 3]);
        pool.shutdown();
    }

    #[test]
    fn empty_job_list_returns_immediately() {
        let pool = test_pool(2);
        pool.execute_and_wait(Vec::<Job>::new());
        pool.shutdown();
    }

    #[test]
    fn current_worker_index_is_set_inside_jobs() {
        let pool = test_pool(2);
        let seen = Arc::new(AtomicUsize::new(99));
        let seen_clone = seen.clone();
        pool.execute_and_wait(vec![Box::new(move || {
            if let Some(idx) = current_worker_index() {
                seen_clone.store(idx, Ordering::SeqCst);
            }
        }) as Job]);
        assert!(seen.load(Ordering::SeqCst) < 2);
        pool.shutdown();
    }
}
