//! # Vsync Backend Tests
//!
//! Exercises the real backends against the waiter:
//!
//! 1. **Timer**: fires on the fixed-refresh grid from the scheduler thread
//! 2. **Compositor**: embedder signals from another thread
//! 3. **Config**: `build_waiter` wiring for both backend kinds
//!
//! Run with: cargo test --test backend_tests

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use xian_vsync::engine::config::build_waiter_with_scheduler;
use xian_vsync::{
    BackendHandle, FireOutcome, FixedRefreshClock, FrameClock, FrameScheduler, FrameTimePoint,
    FrameTimings, NoopTaskGate, TimerBackend, VsyncConfig, VsyncWaiter, build_waiter,
};

const WAIT: Duration = Duration::from_secs(5);

fn timings(start: u64, target: u64) -> FrameTimings {
    FrameTimings::new(
        FrameTimePoint::from_nanos(start),
        FrameTimePoint::from_nanos(target),
    )
    .unwrap()
}

// ============================================================================
// TIMER BACKEND
// ============================================================================

#[test]
fn timer_backend_fires_on_the_refresh_grid() {
    let interval = Duration::from_millis(4);
    let clock = FixedRefreshClock::new(interval, Duration::ZERO).unwrap();
    let scheduler = FrameScheduler::new().unwrap();
    let waiter = VsyncWaiter::new(
        Box::new(TimerBackend::new(scheduler, clock)),
        Arc::new(NoopTaskGate),
    );

    let (tx, rx) = crossbeam_channel::unbounded();
    let requested = FrameTimePoint::now();
    waiter.async_wait_for_vsync(move |start, target| {
        tx.send((start, target, FrameTimePoint::now())).unwrap();
    });

    let (start, target, fired_at) = rx.recv_timeout(WAIT).unwrap();
    let interval_ns = interval.as_nanos() as u64;
    assert_eq!(start.as_nanos() % interval_ns, 0);
    assert_eq!(target.as_nanos() - start.as_nanos(), interval_ns);
    assert!(start >= requested);
    assert!(fired_at >= start);
}

#[test]
fn timer_backend_never_reuses_a_frame_start() {
    let clock = FixedRefreshClock::from_fps(240, Duration::ZERO).unwrap();
    let scheduler = FrameScheduler::new().unwrap();
    let waiter = VsyncWaiter::new(
        Box::new(TimerBackend::new(scheduler, clock)),
        Arc::new(NoopTaskGate),
    );

    let mut starts = Vec::new();
    for _ in 0..4 {
        let (tx, rx) = crossbeam_channel::unbounded();
        waiter.async_wait_for_vsync(move |start, _| tx.send(start).unwrap());
        starts.push(rx.recv_timeout(WAIT).unwrap());
    }

    for pair in starts.windows(2) {
        assert!(pair[1] > pair[0], "frame starts must strictly increase: {starts:?}");
    }
}

#[test]
fn waiters_can_share_one_scheduler() {
    let scheduler = FrameScheduler::new().unwrap();
    let config = VsyncConfig {
        target_fps: 120,
        ..VsyncConfig::default()
    };

    let (first, first_handle) =
        build_waiter_with_scheduler(&config, Arc::new(NoopTaskGate), Some(scheduler.clone()))
            .unwrap();
    let (second, _) =
        build_waiter_with_scheduler(&config, Arc::new(NoopTaskGate), Some(scheduler.clone()))
            .unwrap();
    match first_handle {
        BackendHandle::Timer(shared) => assert!(Arc::ptr_eq(&shared, &scheduler)),
        BackendHandle::CompositorSignal(_) => panic!("expected a timer backend"),
    }

    let (tx, rx) = crossbeam_channel::unbounded();
    let tx_second = tx.clone();
    first.async_wait_for_vsync(move |_, _| tx.send("first").unwrap());
    second.async_wait_for_vsync(move |_, _| tx_second.send("second").unwrap());

    let mut seen = vec![rx.recv_timeout(WAIT).unwrap(), rx.recv_timeout(WAIT).unwrap()];
    seen.sort_unstable();
    assert_eq!(seen, vec!["first", "second"]);
}

#[test]
fn timer_fire_after_waiter_drop_is_harmless() {
    let clock = FixedRefreshClock::new(Duration::from_millis(2), Duration::ZERO).unwrap();
    let scheduler = FrameScheduler::new().unwrap();
    let waiter = VsyncWaiter::new(
        Box::new(TimerBackend::new(scheduler.clone(), clock)),
        Arc::new(NoopTaskGate),
    );
    waiter.async_wait_for_vsync(|_, _| panic!("callback of a dropped waiter must not run"));
    drop(waiter);

    let (tx, rx) = crossbeam_channel::unbounded();
    scheduler.schedule(Duration::from_millis(20), move || tx.send(()).unwrap());
    rx.recv_timeout(WAIT).unwrap();
}

#[test]
fn fixed_clock_applies_vsync_offset() {
    let clock =
        FixedRefreshClock::new(Duration::from_nanos(100), Duration::from_nanos(30)).unwrap();
    let next = clock.next_frame(FrameTimePoint::from_nanos(131));
    assert_eq!(next.start(), FrameTimePoint::from_nanos(230));
    assert_eq!(next.target(), FrameTimePoint::from_nanos(330));

    let on_boundary = clock.next_frame(FrameTimePoint::from_nanos(130));
    assert_eq!(on_boundary.start(), FrameTimePoint::from_nanos(130));
}

// ============================================================================
// COMPOSITOR BACKEND
// ============================================================================

#[test]
fn compositor_signal_from_another_thread() {
    let (waiter, handle) = build_waiter(&VsyncConfig::default(), Arc::new(NoopTaskGate)).unwrap();
    let signal = handle.compositor_signal().unwrap().clone();

    let (tx, rx) = crossbeam_channel::unbounded();
    waiter.async_wait_for_vsync(move |start, target| {
        tx.send((start.as_nanos(), target.as_nanos())).unwrap();
    });
    assert!(signal.is_awaiting());

    let outcome = thread::spawn(move || signal.signal(timings(1_000, 17_666)))
        .join()
        .unwrap();
    assert!(outcome.delivered());
    assert_eq!(rx.recv_timeout(WAIT).unwrap(), (1_000, 17_666));
}

#[test]
fn compositor_signal_after_dispose_is_a_noop() {
    let (waiter, handle) = build_waiter(&VsyncConfig::default(), Arc::new(NoopTaskGate)).unwrap();
    let signal = handle.compositor_signal().unwrap().clone();

    waiter.async_wait_for_vsync(|_, _| panic!("disposed waiter must not deliver"));
    waiter.dispose();

    assert_eq!(signal.signal(timings(0, 16)), FireOutcome::Disposed);
    assert_eq!(signal.signal(timings(16, 32)), FireOutcome::Empty);
}

#[test]
fn compositor_signal_after_direct_fire_delivers_the_next_wait() {
    let (waiter, handle) = build_waiter(&VsyncConfig::default(), Arc::new(NoopTaskGate)).unwrap();
    let signal = handle.compositor_signal().unwrap().clone();

    let (tx, rx) = crossbeam_channel::unbounded();
    let first = tx.clone();
    waiter.async_wait_for_vsync(move |start, _| first.send(("a", start.as_nanos())).unwrap());
    waiter.fire_callback(
        FrameTimePoint::from_nanos(100),
        FrameTimePoint::from_nanos(116),
        true,
    );
    assert_eq!(rx.try_recv().unwrap(), ("a", 100));
    assert!(signal.is_awaiting());

    waiter.async_wait_for_vsync(move |start, _| tx.send(("b", start.as_nanos())).unwrap());
    assert!(signal.signal(timings(116, 132)).delivered());
    assert_eq!(rx.try_recv().unwrap(), ("b", 116));
    assert!(!signal.is_awaiting());
    assert_eq!(signal.signal(timings(132, 148)), FireOutcome::Empty);
}

#[test]
fn invalid_config_is_rejected() {
    let err = VsyncConfig::from_toml_str("target_fps = -1").unwrap_err();
    assert!(err.to_string().contains("config"), "unexpected error: {err}");
}
