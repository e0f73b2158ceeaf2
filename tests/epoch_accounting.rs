use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use taskmill::ThreadPool;

fn submit_counting(pool: &ThreadPool, counter: &Arc<AtomicUsize>, n: usize) {
    for _ in 0..n {
        let counter = counter.clone();
        pool.submit_fn(move |_ctx| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
    }
}

#[test]
fn stopped_pool_keeps_tasks_queued() {
    let pool = ThreadPool::new(2);
    let counter = Arc::new(AtomicUsize::new(0));

    submit_counting(&pool, &counter, 10);
    pool.start_workers();
    pool.wait(false);
    assert_eq!(counter.load(Ordering::SeqCst), 10);

    pool.stop_workers();
    submit_counting(&pool, &counter, 10);

    // Workers get signalled by the submissions but must not dequeue while
    // stopped.
    thread::sleep(Duration::from_millis(50));
    assert_eq!(pool.task_count(), 10);
    assert_eq!(counter.load(Ordering::SeqCst), 10);

    pool.start_workers();
    pool.wait(false);
    assert_eq!(pool.task_count(), 0);
    assert_eq!(counter.load(Ordering::SeqCst), 20);
    pool.shutdown().expect("shutdown failed");
}

#[test]
fn wait_time_epoch_excludes_idle_before_restart() {
    let pool = ThreadPool::new(2);
    let counter = Arc::new(AtomicUsize::new(0));

    submit_counting(&pool, &counter, 10);
    pool.start_workers();
    pool.wait(false);

    pool.stop_workers();
    submit_counting(&pool, &counter, 10);

    // Let the workers sit blocked well past what the second epoch will
    // tolerate, then restart. The restart resets the accounting epoch, so
    // the idle time accrued during this gap must not be counted.
    thread::sleep(Duration::from_millis(300));

    pool.start_workers();
    pool.wait(false);
    assert_eq!(counter.load(Ordering::SeqCst), 20);

    // Both workers woke right after the restart; their accounted idle time
    // is clamped to the new epoch and stays far below the 300ms gap.
    assert!(
        pool.total_wait_time() < Duration::from_millis(150),
        "accounted {:?}, expected the pre-epoch gap to be excluded",
        pool.total_wait_time()
    );
    pool.shutdown().expect("shutdown failed");
}

#[test]
fn wait_time_accrues_within_an_epoch() {
    let pool = ThreadPool::new(1);
    let counter = Arc::new(AtomicUsize::new(0));

    pool.start_workers();
    // The worker blocks on the empty queue; idle time accrues once it is
    // woken within the same epoch.
    thread::sleep(Duration::from_millis(100));

    submit_counting(&pool, &counter, 1);
    pool.wait(false);
    assert_eq!(counter.load(Ordering::SeqCst), 1);

    assert!(
        pool.total_wait_time() >= Duration::from_millis(50),
        "accounted {:?}, expected the in-epoch idle gap to be counted",
        pool.total_wait_time()
    );
    pool.shutdown().expect("shutdown failed");
}
