//! Timed end-to-end scenarios on the thread-backed scheduler.

use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use rescheduler::Rescheduler;

use crate::common::{init_tracing, probed_work};

#[test]
fn single_request_runs_once_within_window() {
    init_tracing();
    let (probe, work) = probed_work(Duration::from_millis(50));
    let scheduler = Rescheduler::new(work);

    scheduler.request_run();
    thread::sleep(Duration::from_millis(100));

    assert_eq!(probe.started(), 1);
    scheduler.wait();
    assert_eq!(probe.finished(), 1);
}

#[test]
fn three_immediate_requests_run_twice() {
    init_tracing();
    let (probe, work) = probed_work(Duration::from_millis(50));
    let scheduler = Rescheduler::new(work);

    scheduler.request_run();
    scheduler.request_run();
    scheduler.request_run();
    thread::sleep(Duration::from_millis(150));

    assert_eq!(probe.started(), 2);
    scheduler.wait();
    assert_eq!(probe.finished(), 2);
    assert_eq!(scheduler.stats().cycles, 1);
}

#[test]
fn wait_does_not_return_before_work_completes() {
    init_tracing();
    let (probe, work) = probed_work(Duration::from_millis(50));
    let scheduler = Rescheduler::new(work);

    scheduler.request_run();
    scheduler.wait();

    assert!(probe.finished() >= 1);
}

#[test]
fn wait_without_any_request_returns_promptly() {
    init_tracing();
    let (probe, work) = probed_work(Duration::from_millis(50));
    let scheduler = Rescheduler::new(work);

    let (done_tx, done_rx) = mpsc::channel();
    let handle = scheduler.clone();
    thread::spawn(move || {
        handle.wait();
        let _ = done_tx.send(());
    });

    done_rx
        .recv_timeout(Duration::from_secs(1))
        .expect("wait on an idle scheduler must not hang");
    assert_eq!(probe.started(), 0);
}
