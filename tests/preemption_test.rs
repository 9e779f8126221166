/*!
 * Preemption Tests
 * Real SIGALRM ticks against spinning threads
 *
 * Green threads here touch only atomics and the monotonic clock: anything
 * that allocates or locks could be interrupted mid-operation by the timer.
 */

#![cfg(feature = "preemptive")]

use gthreads::{Runtime, RuntimeConfig, ThreadState};
use serial_test::serial;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

const TICK: Duration = Duration::from_millis(2);
const GIVE_UP: Duration = Duration::from_secs(2);
const SPIN: Duration = Duration::from_millis(60);
const MAX_WINDOWS: usize = 256;

#[allow(clippy::declare_interior_mutable_const)]
const NO_WINDOW: AtomicUsize = AtomicUsize::new(usize::MAX);

static PARTNER_STARTED: AtomicBool = AtomicBool::new(false);
static SAW_PARTNER: AtomicBool = AtomicBool::new(false);
static WINDOW_COUNT: AtomicUsize = AtomicUsize::new(0);
static WINDOWS: [AtomicUsize; MAX_WINDOWS] = [NO_WINDOW; MAX_WINDOWS];
static SLEPT_MICROS: AtomicU64 = AtomicU64::new(0);
static RAN: AtomicBool = AtomicBool::new(false);

fn config() -> RuntimeConfig {
    RuntimeConfig::new()
        .with_timer(true)
        .with_tick_period(TICK)
        .with_stack_size(256 * 1024)
}

fn reset() {
    PARTNER_STARTED.store(false, Ordering::SeqCst);
    SAW_PARTNER.store(false, Ordering::SeqCst);
    WINDOW_COUNT.store(0, Ordering::SeqCst);
    for window in &WINDOWS {
        window.store(usize::MAX, Ordering::SeqCst);
    }
    SLEPT_MICROS.store(0, Ordering::SeqCst);
    RAN.store(false, Ordering::SeqCst);
}

/// Never yields: only the timer can take the processor away
fn hog() {
    let start = Instant::now();
    while !PARTNER_STARTED.load(Ordering::SeqCst) && start.elapsed() < GIVE_UP {
        std::hint::spin_loop();
    }
    SAW_PARTNER.store(PARTNER_STARTED.load(Ordering::SeqCst), Ordering::SeqCst);
}

fn partner() {
    PARTNER_STARTED.store(true, Ordering::SeqCst);
}

#[test]
#[serial]
fn test_timer_preempts_a_spinning_thread() {
    reset();
    let runtime = Runtime::init(config()).unwrap();
    assert!(runtime.is_preemptive());
    {
        let _cs = runtime.no_preempt();
        runtime.spawn(hog, "hog", 0, 1).unwrap();
        runtime.spawn(partner, "partner", 0, 1).unwrap();
    }

    runtime.run_until_quiescent().unwrap();

    assert!(SAW_PARTNER.load(Ordering::SeqCst));
    assert!(runtime.stats().preemptions > 0);
}

/// Record that `slot` started a new run window
fn record_window(slot: usize) {
    let index = WINDOW_COUNT.fetch_add(1, Ordering::SeqCst);
    if let Some(window) = WINDOWS.get(index) {
        window.store(slot, Ordering::SeqCst);
    }
}

/// Spin for `SPIN` of wall time. A gap of more than half a tick between two
/// iterations means another thread ran in between: a new window starts.
fn alternate() {
    let me = gthreads::current_id().unwrap_or_default();
    let start = Instant::now();
    let mut last = start;
    record_window(me);
    while start.elapsed() < SPIN {
        let now = Instant::now();
        if now - last > TICK / 2 {
            record_window(me);
        }
        last = now;
        std::hint::spin_loop();
    }
}

#[test]
#[serial]
fn test_quota_of_one_alternates_spinners() {
    reset();
    let runtime = Runtime::init(config()).unwrap();
    {
        let _cs = runtime.no_preempt();
        runtime.spawn(alternate, "left", 0, 1).unwrap();
        runtime.spawn(alternate, "right", 0, 1).unwrap();
    }

    runtime.run_until_quiescent().unwrap();

    let count = WINDOW_COUNT.load(Ordering::SeqCst).min(MAX_WINDOWS);
    let windows: Vec<usize> = WINDOWS[..count]
        .iter()
        .map(|window| window.load(Ordering::SeqCst))
        .collect();

    // One window per tick while both spin, and never the same spinner twice
    // in a row.
    let expected = (SPIN.as_micros() / TICK.as_micros()) as usize;
    assert!(
        (expected / 2..=expected * 2).contains(&count),
        "{count} windows, expected about {expected}"
    );
    for pair in windows.windows(2) {
        assert_ne!(pair[0], pair[1], "windows: {windows:?}");
    }
}

fn timed_nap() {
    let start = Instant::now();
    let _ = gthreads::sleep_ticks(5);
    SLEPT_MICROS.store(start.elapsed().as_micros() as u64, Ordering::SeqCst);
}

#[test]
#[serial]
fn test_sleep_ticks_follows_the_timer() {
    reset();
    let runtime = Runtime::init(config()).unwrap();
    runtime.spawn(timed_nap, "napper", 0, 1).unwrap();

    runtime.run_until_quiescent().unwrap();

    // The first tick may land right away; the remaining four are full periods.
    let slept = Duration::from_micros(SLEPT_MICROS.load(Ordering::SeqCst));
    assert!(slept >= TICK * 4, "slept only {slept:?}");
    assert!(runtime.stats().ticks >= 5);
}

fn mark_ran() {
    RAN.store(true, Ordering::SeqCst);
}

#[test]
#[serial]
fn test_no_preempt_defers_ticks_until_dropped() {
    reset();
    let runtime = Runtime::init(config()).unwrap();
    let guard = runtime.no_preempt();
    assert!(guard.is_outermost());
    let id = runtime.spawn(mark_ran, "waiting", 0, 1).unwrap();

    let start = Instant::now();
    while start.elapsed() < TICK * 10 {
        std::hint::spin_loop();
    }
    assert!(!RAN.load(Ordering::SeqCst));
    assert!(runtime.stats().deferred_ticks > 0);

    // Replaying the deferred ticks exhausts the bootstrap quota and runs
    // the waiting thread.
    drop(guard);
    assert!(RAN.load(Ordering::SeqCst));
    assert_eq!(runtime.state(id), Some(ThreadState::Unused));
}

#[test]
#[serial]
fn test_timer_can_be_disabled() {
    let runtime = Runtime::init(config().with_timer(false)).unwrap();
    assert!(!runtime.is_preemptive());
    assert!(!runtime.stats().preemptive);
}
