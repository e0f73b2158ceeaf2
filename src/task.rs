//! Task definitions and the shared-ownership wrapper for stealable tasks.
//!
//! Tasks are opaque units of work; the pool never inspects their contents.
//! Building a task, releasing its resources in `finalize`, and partitioning
//! its work for stealing are all task responsibilities.

use std::any::Any;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::context::WorkerContext;

/// A unit of work executed by a [`ThreadPool`](crate::ThreadPool).
///
/// The pool queue owns a submitted task until a worker dequeues it; the
/// worker then calls `run` followed by `finalize`, exactly once each.
pub trait Task: Send + 'static {
    /// Executes the work.
    fn run(&mut self, ctx: &WorkerContext);

    /// Releases task-owned resources. Invoked exactly once, after `run`
    /// returns, by whichever thread executed the task.
    fn finalize(self: Box<Self>) {}
}

/// Adapter that lets plain closures run as tasks.
pub(crate) struct ClosureTask<F> {
    work: Option<F>,
}

impl<F> ClosureTask<F> {
    pub(crate) fn new(work: F) -> Self {
        ClosureTask { work: Some(work) }
    }
}

impl<F> Task for ClosureTask<F>
where
    F: FnOnce(&WorkerContext) + Send + 'static,
{
    fn run(&mut self, ctx: &WorkerContext) {
        if let Some(work) = self.work.take() {
            work(ctx);
        }
    }
}

/// A divisible unit of work executed by a [`StealingPool`](crate::StealingPool).
///
/// While one worker drives `run`, idle peers may call `steal_from` on their
/// own most recent task with this task as the victim, executing part of its
/// remaining work. `run` and any number of `steal_from` calls targeting the
/// same task may execute concurrently, so implementations synchronise their
/// internal state themselves (typically with atomics).
pub trait StealableTask: Send + Sync + 'static {
    /// Executes the task's own share of the work.
    fn run(&self, ctx: &WorkerContext);

    /// Executes part of `victim`'s remaining work on behalf of `victim`.
    ///
    /// Called on the helper's own task object. Implementations downcast
    /// `victim` through [`as_any`](Self::as_any) to reach its work state and
    /// must tolerate victims of unknown type by returning without effect.
    fn steal_from(&self, ctx: &WorkerContext, victim: &dyn StealableTask);

    /// Releases task-owned resources. Invoked exactly once, after `run` and
    /// every in-flight `steal_from` targeting this task have returned - on
    /// whichever thread withdrew the last reference.
    fn finalize(&self) {}

    /// Concrete-type escape hatch for `steal_from` implementations.
    fn as_any(&self) -> &dyn Any;
}

/// Pool-internal wrapper giving a stealable task shared ownership.
///
/// The queue, the executing worker, and every active helper jointly keep the
/// task alive through `refs`. The count is only ever mutated under the pool's
/// steal lock; the atomic is the shared-access vehicle, not a lock-free
/// protocol. `finalize` is the last owner's responsibility: it fires on the
/// 1 -> 0 transition, wherever that happens.
pub(crate) struct SharedTask {
    task: Box<dyn StealableTask>,
    refs: AtomicUsize,
}

impl SharedTask {
    pub(crate) fn new(task: Box<dyn StealableTask>) -> Self {
        SharedTask {
            task,
            refs: AtomicUsize::new(0),
        }
    }

    pub(crate) fn task(&self) -> &dyn StealableTask {
        self.task.as_ref()
    }

    /// Adds an owner. Caller must hold the steal lock.
    pub(crate) fn acquire(&self) {
        let refs = self.refs.load(Ordering::Relaxed);
        self.refs.store(refs + 1, Ordering::Relaxed);
    }

    /// Withdraws an owner; returns true when the count hit zero and the
    /// caller must finalize (outside the lock). Caller must hold the steal
    /// lock.
    pub(crate) fn release(&self) -> bool {
        let refs = self.refs.load(Ordering::Relaxed);
        assert!(refs > 0, "stealable task reference count underflow");
        self.refs.store(refs - 1, Ordering::Relaxed);
        refs == 1
    }

    #[cfg(test)]
    pub(crate) fn refs(&self) -> usize {
        self.refs.load(Ordering::Relaxed)
    }
}
