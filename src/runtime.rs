//! Host runtime hook for worker thread registration.
//!
//! Embedders that track threads (VMs, engines, profilers) can observe worker
//! lifecycles by installing a [`Runtime`] via
//! [`PoolConfig::runtime`](crate::PoolConfig::runtime). The pool itself only
//! registers and deregisters; it never calls back into the runtime while
//! executing tasks.

use crate::error::AttachError;

/// Ambient runtime a worker thread registers with at startup.
pub trait Runtime: Send + Sync + 'static {
    /// Called once on the worker thread before it consumes any task.
    ///
    /// An `Err` is fatal for the worker: the thread panics and the loss is
    /// reported by [`shutdown`](crate::ThreadPool::shutdown).
    fn attach(&self, thread_name: &str) -> Result<(), AttachError>;

    /// Called once on the worker thread right before it exits.
    fn detach(&self);
}

/// Default runtime hook that performs no registration.
#[derive(Debug, Default)]
pub struct NoopRuntime;

impl Runtime for NoopRuntime {
    fn attach(&self, _thread_name: &str) -> Result<(), AttachError> {
        Ok(())
    }

    fn detach(&self) {}
}
