//! Error types surfaced by the pool.

use thiserror::Error;

/// Errors reported when tearing a pool down.
#[derive(Debug, Error)]
pub enum PoolError {
    /// One or more worker threads panicked before shutdown completed.
    ///
    /// A worker panics when its task panics or when it fails to attach to the
    /// host runtime; the pool does not restart lost workers.
    #[error("{count} worker thread(s) panicked")]
    WorkerPanicked { count: usize },
}

/// Failure to attach a worker thread to the host runtime.
///
/// Attach failures are fatal for the affected worker: the pool does not
/// operate below its configured worker count.
#[derive(Debug, Clone, Error)]
#[error("failed to attach to host runtime: {reason}")]
pub struct AttachError {
    reason: String,
}

impl AttachError {
    pub fn new(reason: impl Into<String>) -> Self {
        AttachError {
            reason: reason.into(),
        }
    }
}
