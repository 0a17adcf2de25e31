//! Coalescing guarantees of the thread-backed scheduler under contention.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use rescheduler::{FailurePolicy, RunState, Rescheduler, SchedulerConfig};

use crate::common::{gated_work, init_tracing, probed_work};

fn burst_while_running(requests: usize) -> usize {
    let (gate, probe, work) = gated_work();
    let scheduler = Rescheduler::new(work);

    scheduler.request_run();
    gate.started.recv().unwrap();
    for _ in 0..requests {
        scheduler.request_run();
    }
    gate.release.send(()).unwrap();
    scheduler.wait();

    assert!(scheduler.is_idle());
    probe.finished()
}

#[test]
fn single_request_single_run() {
    init_tracing();
    let (probe, work) = probed_work(Duration::ZERO);
    let scheduler = Rescheduler::new(work);

    scheduler.run_and_wait();

    assert_eq!(probe.finished(), 1);
    assert_eq!(scheduler.stats().runs, 1);
}

#[test]
fn bursts_of_any_size_run_exactly_twice() {
    init_tracing();
    for requests in [1, 2, 5, 50, 500] {
        assert_eq!(burst_while_running(requests), 2, "burst of {requests}");
    }
}

#[test]
fn concurrent_requesters_never_overlap_runs() {
    init_tracing();
    let (probe, work) = probed_work(Duration::from_micros(200));
    let scheduler = Rescheduler::new(work);

    let callers: Vec<_> = (0..16)
        .map(|_| {
            let handle = scheduler.clone();
            thread::spawn(move || {
                for _ in 0..100 {
                    handle.request_run();
                }
            })
        })
        .collect();
    for caller in callers {
        caller.join().unwrap();
    }
    scheduler.wait();

    assert_eq!(probe.max_in_flight(), 1);
    let stats = scheduler.stats();
    assert_eq!(stats.requests, 1600);
    assert_eq!(stats.runs as usize, probe.finished());
    assert!(stats.runs <= stats.requests);
}

#[test]
fn every_request_is_covered_by_a_later_run() {
    init_tracing();
    let requested = Arc::new(AtomicUsize::new(0));
    let covered = Arc::new(AtomicUsize::new(0));
    let (seen_requested, seen_covered) = (Arc::clone(&requested), Arc::clone(&covered));
    let scheduler = Rescheduler::new(move || {
        // Everything requested before this run starts is covered by it.
        let snapshot = seen_requested.load(Ordering::SeqCst);
        thread::sleep(Duration::from_micros(100));
        seen_covered.fetch_max(snapshot, Ordering::SeqCst);
    });

    let callers: Vec<_> = (0..8)
        .map(|_| {
            let handle = scheduler.clone();
            let requested = Arc::clone(&requested);
            thread::spawn(move || {
                for _ in 0..200 {
                    requested.fetch_add(1, Ordering::SeqCst);
                    handle.request_run();
                }
            })
        })
        .collect();
    for caller in callers {
        caller.join().unwrap();
    }
    scheduler.wait();

    assert_eq!(covered.load(Ordering::SeqCst), 1600);
}

#[test]
fn request_then_wait_sees_finished_work() {
    init_tracing();
    let (probe, work) = probed_work(Duration::from_millis(20));
    let scheduler = Rescheduler::new(work);

    for _ in 0..3 {
        scheduler.request_run();
        scheduler.wait();
        assert_eq!(probe.started(), probe.finished());
    }
    assert_eq!(probe.finished(), 3);
}

#[test]
fn idle_wait_is_repeatable() {
    init_tracing();
    let (_probe, work) = probed_work(Duration::ZERO);
    let scheduler = Rescheduler::new(work);

    for _ in 0..10 {
        scheduler.wait();
        assert!(scheduler.wait_timeout(Duration::from_millis(1)));
    }
    assert_eq!(scheduler.state(), RunState::Idle);
}

#[test]
fn panicking_work_never_wedges_the_instance() {
    init_tracing();
    for policy in [FailurePolicy::Continue, FailurePolicy::Propagate] {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&attempts);
        let config = SchedulerConfig::default().with_failure_policy(policy);
        let scheduler = Rescheduler::with_config(config, move || {
            counter.fetch_add(1, Ordering::SeqCst);
            panic!("always fails");
        });

        for _ in 0..3 {
            scheduler.request_run();
            let waited = panic::catch_unwind(AssertUnwindSafe(|| {
                scheduler.wait_timeout(Duration::from_secs(5))
            }));
            match policy {
                FailurePolicy::Continue => {
                    assert!(waited.unwrap(), "{policy:?} left the instance running");
                }
                FailurePolicy::Propagate => {
                    let payload = waited.unwrap_err();
                    assert_eq!(payload.downcast_ref::<&str>(), Some(&"always fails"));
                }
            }
        }

        assert!(scheduler.is_idle());
        assert_eq!(scheduler.stats().failures as usize, attempts.load(Ordering::SeqCst));
        assert_eq!(scheduler.last_failure().unwrap().message(), "always fails");
    }
}
