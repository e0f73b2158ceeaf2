//! Shared pool core and the simple FIFO thread pool.
//!
//! The queue protocol lives in [`Shared`], which both pool variants reuse:
//! one mutex guards the queue and every lifecycle field, `not_empty` wakes
//! dequeuers, and `all_idle` wakes threads blocked in `wait` when the
//! quiescence predicate (queue empty, every worker waiting) becomes true.

use std::cmp;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, error};

use crate::config::PoolConfig;
use crate::context::WorkerContext;
use crate::error::PoolError;
use crate::task::{ClosureTask, SharedTask, Task};
use crate::worker::Worker;

/// Anything the shared queue can hold, run, and finalize.
///
/// Implemented for the two queue item shapes: boxed plain tasks and
/// shared-ownership stealable tasks. The caller-drain path in `wait` runs
/// items through this interface on whatever thread invoked it.
pub(crate) trait QueuedTask: Send + 'static {
    fn run(&mut self, ctx: &WorkerContext);
    fn finalize(self);
}

impl QueuedTask for Box<dyn Task> {
    fn run(&mut self, ctx: &WorkerContext) {
        (**self).run(ctx);
    }

    fn finalize(self) {
        Task::finalize(self);
    }
}

impl QueuedTask for Arc<SharedTask> {
    fn run(&mut self, ctx: &WorkerContext) {
        self.task().run(ctx);
    }

    /// Direct finalize for tasks executed outside the steal protocol: the
    /// task was never advertised, so no helper can hold a reference.
    fn finalize(self) {
        self.task().finalize();
    }
}

/// Everything guarded by the queue lock.
struct State<T> {
    tasks: VecDeque<T>,
    /// Workers may dequeue only while true.
    started: bool,
    /// Terminal; set once by pool destruction.
    shutting_down: bool,
    /// Number of workers currently blocked on `not_empty`.
    waiting_count: usize,
    /// Start of the current accounting epoch.
    start_time: Instant,
    /// Cumulative worker idle time within the current epoch.
    total_wait_time: Duration,
}

/// Queue, lifecycle, and accounting state shared between a pool facade and
/// its workers.
pub(crate) struct Shared<T> {
    state: Mutex<State<T>>,
    /// Signalled when the pool gains work or changes lifecycle state.
    not_empty: Condvar,
    /// Signalled when the quiescence predicate becomes true.
    all_idle: Condvar,
    worker_count: usize,
}

impl<T: QueuedTask> Shared<T> {
    pub(crate) fn new(worker_count: usize) -> Self {
        Shared {
            state: Mutex::new(State {
                tasks: VecDeque::new(),
                started: false,
                shutting_down: false,
                waiting_count: 0,
                start_time: Instant::now(),
                total_wait_time: Duration::ZERO,
            }),
            not_empty: Condvar::new(),
            all_idle: Condvar::new(),
            worker_count,
        }
    }

    pub(crate) fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Appends a task and wakes one dequeuer if any are blocked.
    pub(crate) fn submit(&self, task: T) {
        let mut state = self.state.lock();
        state.tasks.push_back(task);
        if state.waiting_count > 0 {
            self.not_empty.notify_one();
        }
    }

    /// Appends a batch under a single lock acquisition.
    pub(crate) fn submit_all(&self, tasks: impl IntoIterator<Item = T>) {
        let mut state = self.state.lock();
        state.tasks.extend(tasks);
        if state.waiting_count > 0 {
            self.not_empty.notify_all();
        }
    }

    /// Lets workers dequeue and opens a new accounting epoch.
    pub(crate) fn start_workers(&self) {
        let mut state = self.state.lock();
        state.started = true;
        self.not_empty.notify_all();
        state.start_time = Instant::now();
        state.total_wait_time = Duration::ZERO;
        debug!(workers = self.worker_count, "workers started");
    }

    /// Stops dequeuing. Queued tasks remain; in-flight tasks run to
    /// completion. Workers already blocked on `not_empty` stay blocked until
    /// a submission signals them or shutdown broadcasts - stopping does not
    /// wake anyone.
    pub(crate) fn stop_workers(&self) {
        let mut state = self.state.lock();
        state.started = false;
        debug!("workers stopped");
    }

    /// Blocking dequeue used by workers. Returns `None` once the pool is
    /// shutting down, telling the worker to exit its loop.
    pub(crate) fn get_task(&self) -> Option<T> {
        let mut state = self.state.lock();
        while !state.shutting_down {
            if let Some(task) = Self::pop_locked(&mut state) {
                return Some(task);
            }

            state.waiting_count += 1;
            if state.waiting_count == self.worker_count && state.tasks.is_empty() {
                // Everyone is about to be parked on an empty queue; let
                // `wait` callers re-check the quiescence predicate.
                self.all_idle.notify_all();
            }
            let wait_start = Instant::now();
            self.not_empty.wait(&mut state);
            let woke_at = Instant::now();
            // Clamp to the epoch so idle time accrued before the most recent
            // start_workers is excluded.
            let accounted_from = cmp::max(wait_start, state.start_time);
            state.total_wait_time += woke_at.saturating_duration_since(accounted_from);
            state.waiting_count -= 1;
        }
        None
    }

    /// Non-blocking dequeue.
    pub(crate) fn try_get_task(&self) -> Option<T> {
        let mut state = self.state.lock();
        Self::pop_locked(&mut state)
    }

    fn pop_locked(state: &mut State<T>) -> Option<T> {
        if state.started {
            state.tasks.pop_front()
        } else {
            None
        }
    }

    /// Blocks until the pool is quiescent (queue empty and every worker
    /// waiting) or shutting down. With `do_work`, the calling thread first
    /// drains the queue itself, executing tasks to completion.
    ///
    /// The caller is not a pool worker and never counts toward
    /// `waiting_count`; by the time it blocks here its own draining is done.
    pub(crate) fn wait(&self, ctx: &WorkerContext, do_work: bool) {
        if do_work {
            while let Some(mut task) = self.try_get_task() {
                task.run(ctx);
                task.finalize();
            }
        }

        let mut state = self.state.lock();
        while !state.shutting_down
            && (state.waiting_count != self.worker_count || !state.tasks.is_empty())
        {
            self.all_idle.wait(&mut state);
        }
    }

    /// Snapshot of the number of queued tasks.
    pub(crate) fn task_count(&self) -> usize {
        self.state.lock().tasks.len()
    }

    /// Cumulative worker idle time within the current accounting epoch.
    pub(crate) fn total_wait_time(&self) -> Duration {
        self.state.lock().total_wait_time
    }

    /// Enters the terminal shutting-down state and wakes every blocked
    /// thread. Tasks still queued are dropped without running.
    pub(crate) fn shutdown(&self) {
        let mut state = self.state.lock();
        state.shutting_down = true;
        self.not_empty.notify_all();
        self.all_idle.notify_all();
        debug!(queued = state.tasks.len(), "pool shutting down");
    }
}

/// Joins a drained worker set, reporting how many panicked.
pub(crate) fn join_workers(workers: Vec<Worker>) -> Result<(), PoolError> {
    let mut panicked = 0;
    for worker in workers {
        let name = worker.name().to_string();
        if worker.join().is_err() {
            panicked += 1;
            error!(worker = %name, "worker panicked before shutdown");
        }
    }
    if panicked == 0 {
        Ok(())
    } else {
        Err(PoolError::WorkerPanicked { count: panicked })
    }
}

/// A fixed set of worker threads consuming tasks from one shared FIFO queue.
///
/// Workers are spawned by the constructor but dequeue nothing until
/// [`start_workers`](ThreadPool::start_workers); tasks submitted before that
/// simply queue up. Dropping the pool (or calling
/// [`shutdown`](ThreadPool::shutdown)) wakes and joins every worker.
///
/// # Example
///
/// ```no_run
/// use taskmill::ThreadPool;
///
/// let pool = ThreadPool::new(2);
/// for i in 0..10 {
///     pool.submit_fn(move |_ctx| println!("task {i}"));
/// }
/// pool.start_workers();
/// pool.wait(false);
/// assert_eq!(pool.task_count(), 0);
/// ```
pub struct ThreadPool {
    shared: Arc<Shared<Box<dyn Task>>>,
    workers: Vec<Worker>,
}

impl ThreadPool {
    /// Creates a pool with `num_workers` workers and default configuration.
    pub fn new(num_workers: usize) -> Self {
        Self::with_config(PoolConfig::new(num_workers))
    }

    /// Creates a pool from an explicit configuration.
    pub fn with_config(config: PoolConfig) -> Self {
        let shared: Arc<Shared<Box<dyn Task>>> = Arc::new(Shared::new(config.workers));
        let cores = config.core_assignments();

        let workers = (0..config.workers)
            .map(|index| {
                let shared = Arc::clone(&shared);
                Worker::spawn(&config, index, cores[index], move |ctx| {
                    while let Some(mut task) = shared.get_task() {
                        task.run(ctx);
                        task.finalize();
                    }
                })
            })
            .collect();

        ThreadPool { shared, workers }
    }

    /// Submits a task. Never blocks; the queue is unbounded.
    pub fn submit(&self, task: impl Task) {
        self.shared.submit(Box::new(task));
    }

    /// Submits a closure as a task.
    pub fn submit_fn(&self, work: impl FnOnce(&WorkerContext) + Send + 'static) {
        self.submit(ClosureTask::new(work));
    }

    /// Submits a batch of tasks under a single lock acquisition.
    pub fn submit_all(&self, tasks: impl IntoIterator<Item = Box<dyn Task>>) {
        self.shared.submit_all(tasks);
    }

    /// Lets workers dequeue and opens a new idle-time accounting epoch.
    /// Safe to call repeatedly.
    pub fn start_workers(&self) {
        self.shared.start_workers();
    }

    /// Stops dequeuing without discarding queued tasks. In-flight tasks run
    /// to completion. Does not wake blocked workers.
    pub fn stop_workers(&self) {
        self.shared.stop_workers();
    }

    /// Blocks until the pool is quiescent or shutting down. With `do_work`,
    /// the calling thread helps by draining the queue first.
    pub fn wait(&self, do_work: bool) {
        self.shared.wait(&WorkerContext::external(), do_work);
    }

    /// Snapshot of the number of queued tasks.
    pub fn task_count(&self) -> usize {
        self.shared.task_count()
    }

    /// Cumulative worker idle time since the most recent
    /// [`start_workers`](ThreadPool::start_workers).
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

impl Drop for ThreadPool {
    fn drop(&mut self) {
        let _ = self.shutdown_inner();
    }
}
