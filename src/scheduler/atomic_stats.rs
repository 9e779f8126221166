/*!
 * Lock-Free Scheduler Statistics
 * Atomic counters that the timer signal handler can bump without locking
 */

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

/// Point-in-time copy of the scheduler counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerStats {
    pub context_switches: u64,
    /// Switches forced by an exhausted quota
    pub preemptions: u64,
    pub ticks: u64,
    /// Ticks that arrived inside a critical section and ran on its exit
    pub deferred_ticks: u64,
    pub spawned: u64,
    pub exited: u64,
    pub active_threads: usize,
    pub capacity: usize,
    pub tick_period_micros: u64,
    pub preemptive: bool,
}

/// Atomic scheduler statistics
///
/// # Performance
/// - Cache-line aligned to prevent false sharing
/// - Relaxed ordering throughout; only one OS thread ever writes
/// - Async-signal-safe: no allocation, no locks
#[repr(C, align(64))]
pub struct AtomicSchedulerStats {
    context_switches: AtomicU64,
    preemptions: AtomicU64,
    ticks: AtomicU64,
    deferred_ticks: AtomicU64,
    spawned: AtomicU64,
    exited: AtomicU64,
    active_threads: AtomicUsize,
    capacity: usize,
    tick_period: Duration,
    preemptive: bool,
}

impl AtomicSchedulerStats {
    #[inline]
    pub fn new(capacity: usize, tick_period: Duration, preemptive: bool) -> Self {
        Self {
            context_switches: AtomicU64::new(0),
            preemptions: AtomicU64::new(0),
            ticks: AtomicU64::new(0),
            deferred_ticks: AtomicU64::new(0),
            spawned: AtomicU64::new(0),
            exited: AtomicU64::new(0),
            // the bootstrap thread
            active_threads: AtomicUsize::new(1),
            capacity,
            tick_period,
            preemptive,
        }
    }

    /// # Performance
    /// Hot path - called on every context switch
    #[inline(always)]
    pub fn inc_context_switches(&self) {
        self.context_switches.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn inc_preemptions(&self) {
        self.preemptions.fetch_add(1, Ordering::Relaxed);
    }

    /// # Performance
    /// Hot path - called from the timer signal handler
    #[inline(always)]
    pub fn inc_ticks(&self) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn inc_deferred_ticks(&self) {
        self.deferred_ticks.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_spawn(&self) {
        self.spawned.fetch_add(1, Ordering::Relaxed);
        self.active_threads.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_exit(&self) {
        self.exited.fetch_add(1, Ordering::Relaxed);
        self.active_threads.fetch_sub(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    /// # Note
    /// Counters are read one by one and may be off by one tick relative to
    /// each other. That is acceptable for monitoring.
    #[inline]
    pub fn snapshot(&self) -> SchedulerStats {
        SchedulerStats {
            context_switches: self.context_switches.load(Ordering::Relaxed),
            preemptions: self.preemptions.load(Ordering::Relaxed),
            ticks: self.ticks.load(Ordering::Relaxed),
            deferred_ticks: self.deferred_ticks.load(Ordering::Relaxed),
            spawned: self.spawned.load(Ordering::Relaxed),
            exited: self.exited.load(Ordering::Relaxed),
            active_threads: self.active_threads.load(Ordering::Relaxed),
            capacity: self.capacity,
            tick_period_micros: self.tick_period.as_micros() as u64,
            preemptive: self.preemptive,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_reflects_counters() {
        let stats = AtomicSchedulerStats::new(5, Duration::from_millis(10), false);
        stats.record_spawn();
        stats.record_spawn();
        stats.record_exit();
        stats.inc_context_switches();
        stats.inc_ticks();
        stats.inc_deferred_ticks();

        let snap = stats.snapshot();
        assert_eq!(snap.spawned, 2);
        assert_eq!(snap.exited, 1);
        assert_eq!(snap.active_threads, 2);
        assert_eq!(snap.context_switches, 1);
        assert_eq!(snap.ticks, 1);
        assert_eq!(snap.deferred_ticks, 1);
        assert_eq!(snap.tick_period_micros, 10_000);
    }

    #[test]
    fn test_snapshot_serializes() {
        let stats = AtomicSchedulerStats::new(3, Duration::from_millis(1), true);
        let json = serde_json::to_value(stats.snapshot()).unwrap();
        assert_eq!(json["capacity"], 3);
        assert_eq!(json["preemptive"], true);
    }
}
