//! Pool construction options.

use std::fmt;
use std::sync::Arc;

use core_affinity::CoreId;

use crate::runtime::{NoopRuntime, Runtime};

/// Default per-worker stack size (1 MiB).
pub const DEFAULT_STACK_SIZE: usize = 1024 * 1024;

/// Configuration for a [`ThreadPool`](crate::ThreadPool) or
/// [`StealingPool`](crate::StealingPool).
///
/// # Example
///
/// ```
/// use taskmill::PoolConfig;
///
/// let config = PoolConfig::new(8)
///     .stack_size(2 * 1024 * 1024)
///     .thread_name("render-worker")
///     .pin_workers(true);
/// ```
#[derive(Clone)]
pub struct PoolConfig {
    pub(crate) workers: usize,
    pub(crate) stack_size: usize,
    pub(crate) thread_name: String,
    pub(crate) pin_workers: bool,
    pub(crate) runtime: Arc<dyn Runtime>,
}

impl PoolConfig {
    /// Creates a configuration for `workers` worker threads.
    ///
    /// # Panics
    ///
    /// Panics if `workers` is zero.
    pub fn new(workers: usize) -> Self {
        assert!(workers > 0, "pool needs at least one worker");
        PoolConfig {
            workers,
            stack_size: DEFAULT_STACK_SIZE,
            thread_name: "pool-worker".to_string(),
            pin_workers: false,
            runtime: Arc::new(NoopRuntime),
        }
    }

    /// Stack size in bytes for each worker thread.
    pub fn stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = bytes;
        self
    }

    /// Thread-name prefix; workers are named `<prefix>-<index>`.
    pub fn thread_name(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name = prefix.into();
        self
    }

    /// Pin each worker to a CPU core (round-robin over the available cores)
    /// for better cache locality.
    pub fn pin_workers(mut self, pin: bool) -> Self {
        self.pin_workers = pin;
        self
    }

    /// Host runtime each worker attaches to at startup and detaches from at
    /// exit. Defaults to [`NoopRuntime`].
    pub fn runtime(mut self, runtime: Arc<dyn Runtime>) -> Self {
        self.runtime = runtime;
        self
    }

    /// Per-worker core assignment, round-robin when pinning is enabled.
    pub(crate) fn core_assignments(&self) -> Vec<Option<CoreId>> {
        let core_ids = if self.pin_workers {
            core_affinity::get_core_ids().unwrap_or_default()
        } else {
            Vec::new()
        };

        (0..self.workers)
            .map(|i| {
                if core_ids.is_empty() {
                    None
                } else {
                    Some(core_ids[i % core_ids.len()])
                }
            })
            .collect()
    }
}

impl fmt::Debug for PoolConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolConfig")
            .field("workers", &self.workers)
            .field("stack_size", &self.stack_size)
            .field("thread_name", &self.thread_name)
            .field("pin_workers", &self.pin_workers)
            .finish_non_exhaustive()
    }
}
