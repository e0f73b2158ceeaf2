//! Work-stealing pool: idle workers help execute a peer's running task.
//!
//! The stealing pool reuses the shared queue core unchanged and layers a
//! second protocol on top: each worker advertises the task it is currently
//! executing in a per-worker slot, and a worker that finds the queue empty
//! after finishing its own task probes those slots round-robin, calling
//! `steal_from` against the first live task it finds.
//!
//! Every slot, the probe cursor, and every task's helper reference count are
//! guarded by one steal lock. That lock is ordered strictly below the queue
//! lock: the queue lock is never acquired while the steal lock is held, which
//! is why the steal loop samples `task_count` before taking the steal lock.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::trace;

use crate::config::PoolConfig;
use crate::context::WorkerContext;
use crate::error::PoolError;
use crate::pool::{join_workers, Shared};
use crate::task::{SharedTask, StealableTask};
use crate::worker::Worker;

/// Slot registry and probe cursor, guarded as one unit by the steal lock.
struct StealRegistry {
    /// One slot per worker: the task it is currently executing, if any.
    /// Written only by the owning worker; read by any worker.
    slots: Vec<Option<Arc<SharedTask>>>,
    /// Rotating probe index for approximate round-robin victim selection.
    cursor: usize,
}

impl StealRegistry {
    fn new(worker_count: usize) -> Self {
        StealRegistry {
            slots: vec![None; worker_count],
            cursor: 0,
        }
    }

    /// Probes up to one full rotation of slots, starting after the cursor,
    /// and returns the first advertised task. The cursor advances on every
    /// probe; precise arithmetic is unimportant, only that selection keeps
    /// rotating.
    fn find_target(&mut self) -> Option<Arc<SharedTask>> {
        let worker_count = self.slots.len();
        for _ in 0..worker_count {
            self.cursor += 1;
            if self.cursor >= worker_count {
                self.cursor -= worker_count;
            }
            if let Some(task) = &self.slots[self.cursor] {
                return Some(Arc::clone(task));
            }
        }
        None
    }
}

/// A fixed set of workers that run divisible tasks cooperatively.
///
/// Drives [`StealableTask`]s: one worker executes `run` while idle peers,
/// having drained the queue, repeatedly call `steal_from` to execute part of
/// the remaining work. A reference count keeps the task alive until the
/// original executor and every helper have withdrawn; whichever thread
/// withdraws last runs `finalize`, exactly once per task.
///
/// Lifecycle, submission, waiting, and accounting behave exactly as on
/// [`ThreadPool`](crate::ThreadPool).
pub struct StealingPool {
    shared: Arc<Shared<Arc<SharedTask>>>,
    registry: Arc<Mutex<StealRegistry>>,
    workers: Vec<Worker>,
}

impl StealingPool {
    /// Creates a pool with `num_workers` workers and default configuration.
    pub fn new(num_workers: usize) -> Self {
        Self::with_config(PoolConfig::new(num_workers))
    }

    /// Creates a pool from an explicit configuration.
    pub fn with_config(config: PoolConfig) -> Self {
        let shared = Arc::new(Shared::new(config.workers));
        let registry = Arc::new(Mutex::new(StealRegistry::new(config.workers)));
        let cores = config.core_assignments();

        let workers = (0..config.workers)
            .map(|index| {
                let shared = Arc::clone(&shared);
                let registry = Arc::clone(&registry);
                Worker::spawn(&config, index, cores[index], move |ctx| {
                    run_loop(&shared, &registry, index, ctx);
                })
            })
            .collect();

        StealingPool {
            shared,
            registry,
            workers,
        }
    }

    /// Submits a divisible task. Never blocks; the queue is unbounded.
    pub fn submit(&self, task: impl StealableTask) {
        self.shared.submit(Arc::new(SharedTask::new(Box::new(task))));
    }

    /// Submits a batch of divisible tasks under a single lock acquisition.
    pub fn submit_all(&self, tasks: impl IntoIterator<Item = Box<dyn StealableTask>>) {
        self.shared
            .submit_all(tasks.into_iter().map(|task| Arc::new(SharedTask::new(task))));
    }

    /// Lets workers dequeue and opens a new idle-time accounting epoch.
    /// Safe to call repeatedly.
    pub fn start_workers(&self) {
        self.shared.start_workers();
    }

    /// Stops dequeuing without discarding queued tasks. In-flight tasks run
    /// to completion (including any stealing in progress). Does not wake
    /// blocked workers.
    pub fn stop_workers(&self) {
        self.shared.stop_workers();
    }

    /// Blocks until the pool is quiescent or shutting down. With `do_work`,
    /// the calling thread helps by draining the queue first; tasks it drains
    /// are never advertised for stealing, so it runs them to completion and
    /// finalizes them directly.
    pub fn wait(&self, do_work: bool) {
        self.shared.wait(&WorkerContext::external(), do_work);
    }

    /// Snapshot of the number of queued tasks.
    pub fn task_count(&self) -> usize {
        self.shared.task_count()
    }

    /// Cumulative worker idle time since the most recent
    /// [`start_workers`](StealingPool::start_workers).
    pub fn total_wait_time(&self) -> Duration {
        self.shared.total_wait_time()
    }

    /// Number of worker threads.
    pub fn worker_count(&self) -> usize {
        self.shared.worker_count()
    }

    /// Shuts the pool down and joins every worker, reporting workers lost to
    /// panics. Tasks still queued are dropped without running.
    pub fn shutdown(mut self) -> Result<(), PoolError> {
        self.shutdown_inner()
    }

    fn shutdown_inner(&mut self) -> Result<(), PoolError> {
        self.shared.shutdown();
        join_workers(std::mem::take(&mut self.workers))
    }
}

impl Drop for StealingPool {
    fn drop(&mut self) {
        let _ = self.shutdown_inner();
    }
}

/// Per-task protocol driven by each stealing worker.
///
/// For every task obtained from the queue: advertise it (count +1), run it
/// outside the locks, stop advertising, then help peers until the queue has
/// work again, and finally withdraw the run reference - finalizing if that
/// was the last one.
fn run_loop(
    shared: &Shared<Arc<SharedTask>>,
    registry: &Mutex<StealRegistry>,
    index: usize,
    ctx: &WorkerContext,
) {
    while let Some(task) = shared.get_task() {
        {
            let mut registry = registry.lock();
            assert!(
                registry.slots[index].is_none(),
                "worker {index} is already advertising a task"
            );
            task.acquire();
            registry.slots[index] = Some(Arc::clone(&task));
        }

        task.task().run(ctx);

        // Stop advertising before helping elsewhere. A peer that read the
        // slot just before this clear already holds its own reference, so
        // the task stays alive until that peer withdraws.
        registry.lock().slots[index] = None;

        // Help peers while the queue is dry. The queue lock inside
        // task_count must not nest under the steal lock, hence the sampling
        // happens first. The race in which a task is enqueued right after
        // the check only means one more round of helping instead of a
        // dequeue.
        while shared.task_count() == 0 {
            let victim = {
                let mut registry = registry.lock();
                match registry.find_target() {
                    Some(victim) => {
                        assert!(
                            !Arc::ptr_eq(&victim, &task),
                            "worker {index} selected its own completed task as victim"
                        );
                        victim.acquire();
                        Some(victim)
                    }
                    None => None,
                }
            };

            let victim = match victim {
                Some(victim) => victim,
                None => break,
            };

            trace!(worker = index, "helping a peer task");
            task.task().steal_from(ctx, victim.task());

            let finalize = {
                let _registry = registry.lock();
                victim.release()
            };
            if finalize {
                trace!(worker = index, "helper finalizing peer task");
                victim.task().finalize();
            }
        }

        let finalize = {
            let _registry = registry.lock();
            task.release()
        };
        if finalize {
            task.task().finalize();
        }
    }
}
