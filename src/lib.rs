//! # TaskMill - Worker-Pool Execution Engine
//!
//! A worker-pool execution engine that runs submitted units of work ("tasks")
//! on a fixed set of OS worker threads. Two pool variants share a common core:
//!
//! - [`ThreadPool`]: workers dequeue tasks from a single shared FIFO queue.
//! - [`StealingPool`]: tasks are internally divisible, and idle workers help
//!   execute the unfinished portion of a peer's currently-running task.
//!
//! ## Architecture
//!
//! Both pools are built from the same pieces:
//!
//! - **Tasks**: opaque units of work with a `run` + `finalize` contract
//! - **Shared queue**: an unbounded FIFO guarded by a mutex and a pair of
//!   condition variables (`not_empty` for dequeuers, `all_idle` for waiters)
//! - **Workers**: long-lived named OS threads that consume tasks until the
//!   pool shuts down
//! - **Steal protocol**: a reference-counted handshake that lets helpers run
//!   subranges of a live task and guarantees `finalize` fires exactly once
//!
//! Workers only dequeue while the pool is started; submissions are accepted
//! at any time before shutdown and simply queue up while the pool is stopped.
//!
//! ## Example
//!
//! ```no_run
//! use taskmill::ThreadPool;
//!
//! let pool = ThreadPool::new(4); // 4 worker threads
//!
//! pool.submit_fn(|_ctx| {
//!     println!("Hello from a pool worker!");
//! });
//!
//! pool.start_workers();
//! pool.wait(false);
//! pool.shutdown().expect("clean shutdown");
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod pool;
pub mod runtime;
pub mod stealing;
pub mod task;
pub mod worker;

pub use config::{PoolConfig, DEFAULT_STACK_SIZE};
pub use context::WorkerContext;
pub use error::{AttachError, PoolError};
pub use pool::ThreadPool;
pub use runtime::{NoopRuntime, Runtime};
pub use stealing::StealingPool;
pub use task::{StealableTask, Task};

#[cfg(test)]
mod tests;
