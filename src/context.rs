//! Execution context handed to running tasks.

use std::thread;

/// Identifies the thread a task is executing on.
///
/// Pool workers carry their slot index and stable thread name. An external
/// caller draining the queue through [`wait`](crate::ThreadPool::wait) gets a
/// context without an index.
#[derive(Debug, Clone)]
pub struct WorkerContext {
    name: String,
    index: Option<usize>,
}

impl WorkerContext {
    pub(crate) fn worker(index: usize, name: String) -> Self {
        WorkerContext {
            name,
            index: Some(index),
        }
    }

    /// Context for a non-worker thread that executes tasks (the `wait` drain).
    pub(crate) fn external() -> Self {
        let name = thread::current().name().unwrap_or("external").to_string();
        WorkerContext { name, index: None }
    }

    /// Name of the executing thread.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Slot index of the executing worker, or `None` when the task runs on a
    /// caller thread instead of a pool worker.
    pub fn worker_index(&self) -> Option<usize> {
        self.index
    }

    /// Whether this context belongs to a pool-owned worker thread.
    pub fn is_pool_worker(&self) -> bool {
        self.index.is_some()
    }
}
