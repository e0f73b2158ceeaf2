//! Integration tests for the pool core: submission, lifecycle, draining.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use crate::{PoolConfig, ThreadPool};

#[test]
fn tasks_queue_until_started() {
    let pool = ThreadPool::new(2);
    for _ in 0..5 {
        pool.submit_fn(|_ctx| {});
    }

    // Workers are running but must not dequeue before start.
    thread::sleep(Duration::from_millis(50));
    assert_eq!(pool.task_count(), 5);

    pool.start_workers();
    pool.wait(false);
    assert_eq!(pool.task_count(), 0);
    pool.shutdown().expect("shutdown failed");
}

#[test]
fn every_submission_runs_exactly_once() {
    let pool = ThreadPool::new(2);
    let seen = Arc::new(Mutex::new(Vec::new()));

    for i in 0..100 {
        let seen = seen.clone();
        pool.submit_fn(move |_ctx| {
            seen.lock().unwrap().push(i);
        });
    }

    pool.start_workers();
    pool.wait(false);

    let mut seen = seen.lock().unwrap().clone();
    seen.sort_unstable();
    let expected: Vec<usize> = (0..100).collect();
    assert_eq!(seen, expected);
    pool.shutdown().expect("shutdown failed");
}

#[test]
fn finalize_runs_after_run() {
    struct Recorded {
        ran: Arc<AtomicUsize>,
        finalized: Arc<AtomicUsize>,
    }

    impl crate::Task for Recorded {
        fn run(&mut self, _ctx: &crate::WorkerContext) {
            self.ran.fetch_add(1, Ordering::SeqCst);
        }

        fn finalize(self: Box<Self>) {
            // run must have happened by now.
            assert_eq!(self.ran.load(Ordering::SeqCst), 1);
            self.finalized.fetch_add(1, Ordering::SeqCst);
        }
    }

    let pool = ThreadPool::new(1);
    let ran = Arc::new(AtomicUsize::new(0));
    let finalized = Arc::new(AtomicUsize::new(0));
    pool.submit(Recorded {
        ran: ran.clone(),
        finalized: finalized.clone(),
    });

    pool.start_workers();
    pool.wait(false);
    assert_eq!(ran.load(Ordering::SeqCst), 1);
    assert_eq!(finalized.load(Ordering::SeqCst), 1);
    pool.shutdown().expect("shutdown failed");
}

#[test]
fn caller_participates_in_drain() {
    let pool = ThreadPool::new(1);
    let executors = Arc::new(Mutex::new(Vec::new()));

    for _ in 0..50 {
        let executors = executors.clone();
        pool.submit_fn(move |_ctx| {
            thread::sleep(Duration::from_millis(2));
            executors.lock().unwrap().push(thread::current().id());
        });
    }

    pool.start_workers();
    pool.wait(true);

    let executors = executors.lock().unwrap();
    assert_eq!(executors.len(), 50);
    // With a single worker competing against the caller over slow tasks,
    // the caller must have drained at least one itself.
    assert!(executors.contains(&thread::current().id()));
    pool.shutdown().expect("shutdown failed");
}

#[test]
fn caller_drain_reports_external_context() {
    let pool = ThreadPool::new(1);
    let from_worker = Arc::new(AtomicUsize::new(0));
    let from_caller = Arc::new(AtomicUsize::new(0));

    for _ in 0..20 {
        let from_worker = from_worker.clone();
        let from_caller = from_caller.clone();
        pool.submit_fn(move |ctx| {
            thread::sleep(Duration::from_millis(2));
            if ctx.is_pool_worker() {
                from_worker.fetch_add(1, Ordering::SeqCst);
            } else {
                from_caller.fetch_add(1, Ordering::SeqCst);
            }
        });
    }

    pool.start_workers();
    pool.wait(true);

    assert_eq!(
        from_worker.load(Ordering::SeqCst) + from_caller.load(Ordering::SeqCst),
        20
    );
    assert!(from_caller.load(Ordering::SeqCst) > 0);
    pool.shutdown().expect("shutdown failed");
}

#[test]
fn repeated_start_stop_cycles_stay_idle() {
    let pool = ThreadPool::new(4);
    for _ in 0..3 {
        pool.start_workers();
        pool.stop_workers();
    }

    // No submissions: the pool settles with the queue empty and every
    // worker blocked.
    pool.start_workers();
    pool.wait(false);
    assert_eq!(pool.task_count(), 0);
    pool.shutdown().expect("shutdown failed");
}

#[test]
fn submit_all_drains_like_individual_submissions() {
    let pool = ThreadPool::new(4);
    let counter = Arc::new(AtomicUsize::new(0));

    let tasks: Vec<Box<dyn crate::Task>> = (0..64)
        .map(|_| {
            let counter = counter.clone();
            Box::new(crate::task::ClosureTask::new(move |_ctx: &crate::WorkerContext| {
                counter.fetch_add(1, Ordering::SeqCst);
            })) as Box<dyn crate::Task>
        })
        .collect();

    pool.submit_all(tasks);
    pool.start_workers();
    pool.wait(false);
    assert_eq!(counter.load(Ordering::SeqCst), 64);
    pool.shutdown().expect("shutdown failed");
}

#[test]
fn named_workers_use_configured_prefix() {
    let pool = ThreadPool::with_config(PoolConfig::new(1).thread_name("unit-worker"));
    let name = Arc::new(Mutex::new(String::new()));

    let seen = name.clone();
    pool.submit_fn(move |ctx| {
        *seen.lock().unwrap() = ctx.name().to_string();
    });

    pool.start_workers();
    pool.wait(false);
    assert_eq!(&*name.lock().unwrap(), "unit-worker-0");
    pool.shutdown().expect("shutdown failed");
}
