//! Worker thread implementation.
//!
//! A worker is one long-lived OS thread owned by a pool. It attaches to the
//! host runtime under its stable name, consumes tasks until the pool shuts
//! down, then detaches and exits. The pool joins every worker when it is
//! destroyed.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use core_affinity::CoreId;
use tracing::trace;

use crate::config::PoolConfig;
use crate::context::WorkerContext;

pub(crate) struct Worker {
    name: String,
    handle: Option<JoinHandle<()>>,
}

impl Worker {
    /// Spawns a worker thread running `run_loop` between runtime attach and
    /// detach. The thread starts immediately; whether it may dequeue is
    /// governed by the pool's `started` flag, not by construction order.
    pub(crate) fn spawn<F>(config: &PoolConfig, index: usize, core_id: Option<CoreId>, run_loop: F) -> Self
    where
        F: FnOnce(&WorkerContext) + Send + 'static,
    {
        let name = format!("{}-{}", config.thread_name, index);
        let runtime = Arc::clone(&config.runtime);

        let thread_name = name.clone();
        let handle = thread::Builder::new()
            .name(name.clone())
            .stack_size(config.stack_size)
            .spawn(move || {
                if let Some(core_id) = core_id {
                    core_affinity::set_for_current(core_id);
                }

                // Attach failure is fatal: the pool does not operate below
                // its configured worker count.
                if let Err(err) = runtime.attach(&thread_name) {
                    panic!("worker {thread_name}: {err}");
                }
                trace!(worker = %thread_name, "attached");

                let ctx = WorkerContext::worker(index, thread_name.clone());
                run_loop(&ctx);

                trace!(worker = %thread_name, "detaching");
                runtime.detach();
            })
            .expect("failed to spawn worker thread");

        Worker {
            name,
            handle: Some(handle),
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    /// Waits for the worker thread to finish.
    pub(crate) fn join(mut self) -> thread::Result<()> {
        if let Some(handle) = self.handle.take() {
            handle.join()
        } else {
            Ok(())
        }
    }
}
