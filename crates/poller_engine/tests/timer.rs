use std::sync::mpsc;
use std::time::Duration;

use poller_engine::{EngineEvent, PollTimer};

#[test]
fn timer_ticks_until_cancelled() {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let (tx, rx) = mpsc::channel();

    let timer = PollTimer::spawn(runtime.handle(), 9, Duration::from_millis(20), tx);
    for _ in 0..3 {
        let event = rx.recv_timeout(Duration::from_secs(2)).expect("tick");
        assert_eq!(event, EngineEvent::PollTick { job_id: 9 });
    }

    timer.cancel();
    assert!(timer.is_cancelled());
    // Drain a tick that may have raced with cancellation.
    std::thread::sleep(Duration::from_millis(60));
    while rx.try_recv().is_ok() {}
    assert!(rx.recv_timeout(Duration::from_millis(120)).is_err());
}

#[test]
fn dropping_the_timer_stops_ticks() {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let (tx, rx) = mpsc::channel();

    let timer = PollTimer::spawn(runtime.handle(), 1, Duration::from_millis(20), tx);
    assert_eq!(timer.job_id(), 1);
    rx.recv_timeout(Duration::from_secs(2)).expect("tick");
    drop(timer);

    std::thread::sleep(Duration::from_millis(60));
    while rx.try_recv().is_ok() {}
    assert!(rx.recv_timeout(Duration::from_millis(120)).is_err());
}

#[test]
fn first_tick_waits_one_period() {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let (tx, rx) = mpsc::channel();

    let _timer = PollTimer::spawn(runtime.handle(), 2, Duration::from_millis(300), tx);
    assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
    assert!(rx.recv_timeout(Duration::from_secs(2)).is_ok());
}
