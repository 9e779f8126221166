/*!
 * Scheduler Tests
 * Round-robin dispatch order, idle outcomes and the driver loop
 */

use gthreads::{Outcome, Runtime, RuntimeConfig, SlotId, ThreadState};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::cell::{Cell, RefCell};

thread_local! {
    static LOG: RefCell<Vec<SlotId>> = const { RefCell::new(Vec::new()) };
    static ROUNDS: Cell<usize> = const { Cell::new(3) };
}

fn config() -> RuntimeConfig {
    RuntimeConfig::cooperative()
        .with_capacity(8)
        .with_stack_size(256 * 1024)
}

fn take_log() -> Vec<SlotId> {
    LOG.with(|log| log.take())
}

/// Log the current slot once per round, yielding in between
fn round_robin_worker() {
    for _ in 0..ROUNDS.with(Cell::get) {
        let id = gthreads::current_id().unwrap();
        LOG.with(|log| log.borrow_mut().push(id));
        gthreads::yield_now();
    }
}

#[test]
fn test_round_robin_order() {
    take_log();
    ROUNDS.with(|r| r.set(3));
    let runtime = Runtime::init(config()).unwrap();
    for name in ["a", "b", "c"] {
        runtime.spawn(round_robin_worker, name, 0, 1).unwrap();
    }

    runtime.run_until_quiescent().unwrap();

    assert_eq!(take_log(), vec![1, 2, 3, 1, 2, 3, 1, 2, 3]);
}

#[test]
fn test_yield_with_nothing_ready_is_idle() {
    let runtime = Runtime::init(config()).unwrap();
    assert_eq!(runtime.yield_now(), Outcome::Idle { waiting: 0 });

    let id = runtime.spawn(round_robin_worker, "parked", 0, 1).unwrap();
    runtime.suspend(id).unwrap();
    assert_eq!(runtime.yield_now(), Outcome::Idle { waiting: 1 });
    assert_eq!(i64::from(runtime.yield_now()), -1);

    // The bootstrap thread keeps running after an idle dispatch.
    assert_eq!(runtime.state(0), Some(ThreadState::Running));
}

fn yield_and_record() {
    let outcome = gthreads::yield_now();
    LOG.with(|log| log.borrow_mut().push(i64::from(outcome) as SlotId));
}

#[test]
fn test_yield_from_green_thread_switches_to_bootstrap() {
    take_log();
    let runtime = Runtime::init(config()).unwrap();
    runtime.spawn(yield_and_record, "solo", 0, 1).unwrap();

    runtime.run_until_quiescent().unwrap();

    // The only other ready thread was the bootstrap; the yield switched
    // there and came back.
    assert_eq!(take_log(), vec![1]);
}

#[test]
fn test_run_until_quiescent_with_no_threads_returns() {
    let runtime = Runtime::init(config()).unwrap();
    runtime.run_until_quiescent().unwrap();
    assert_eq!(runtime.stats().context_switches, 0);
}

#[test]
fn test_driver_reports_stall_on_suspended_threads() {
    let runtime = Runtime::init(config()).unwrap();
    let id = runtime.spawn(round_robin_worker, "sleeper", 0, 1).unwrap();
    runtime.suspend(id).unwrap();

    assert_eq!(
        runtime.run_until_quiescent(),
        Err(gthreads::SchedulerError::Stalled { suspended: 1 })
    );

    ROUNDS.with(|r| r.set(1));
    take_log();
    runtime.resume(id).unwrap();
    runtime.run_until_quiescent().unwrap();
    assert_eq!(take_log(), vec![id]);
}

#[test]
fn test_stats_count_switches_and_exits() {
    ROUNDS.with(|r| r.set(2));
    let runtime = Runtime::init(config()).unwrap();
    runtime.spawn(round_robin_worker, "a", 0, 1).unwrap();
    runtime.spawn(round_robin_worker, "b", 0, 1).unwrap();

    runtime.run_until_quiescent().unwrap();
    take_log();

    let stats = runtime.stats();
    assert_eq!(stats.spawned, 2);
    assert_eq!(stats.exited, 2);
    assert_eq!(stats.active_threads, 1);
    assert!(stats.context_switches >= 6);
    assert!(!stats.preemptive);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_ready_threads_run_in_slot_order(threads in 1usize..=5, rounds in 1usize..=4) {
        take_log();
        ROUNDS.with(|r| r.set(rounds));
        let runtime = Runtime::init(config()).unwrap();
        for _ in 0..threads {
            runtime.spawn(round_robin_worker, "worker", 0, 1).unwrap();
        }

        runtime.run_until_quiescent().unwrap();

        let expected: Vec<SlotId> = (0..rounds).flat_map(|_| 1..=threads).collect();
        prop_assert_eq!(take_log(), expected);
    }
}
