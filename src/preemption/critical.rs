/*!
 * Critical Sections
 *
 * Mainline scheduler code and the timer signal handler share one OS thread,
 * so a lock would self-deadlock. Instead a flag marks "scheduler state is
 * being mutated": a tick that lands while it is set only records itself, and
 * the code leaving the section replays the recorded ticks.
 *
 * The flag travels with control across a switch. Whoever switches away holds
 * it, and the thread that resumes is the one that releases it.
 */

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

#[derive(Debug, Default)]
pub struct CriticalSection {
    held: AtomicBool,
    deferred: AtomicU32,
}

impl CriticalSection {
    pub const fn new() -> Self {
        Self {
            held: AtomicBool::new(false),
            deferred: AtomicU32::new(0),
        }
    }

    /// Set the flag. Returns false if it was already held (nested entry).
    #[inline]
    pub fn try_enter(&self) -> bool {
        !self.held.swap(true, Ordering::SeqCst)
    }

    /// Clear the flag without replaying deferred ticks
    #[inline]
    pub fn release(&self) {
        self.held.store(false, Ordering::SeqCst);
    }

    #[inline]
    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::SeqCst)
    }

    /// Record a tick that could not run. Async-signal-safe.
    #[inline]
    pub fn defer_tick(&self) {
        self.deferred.fetch_add(1, Ordering::SeqCst);
    }

    /// Take every recorded tick
    #[inline]
    pub fn take_deferred(&self) -> u32 {
        self.deferred.swap(0, Ordering::SeqCst)
    }

    #[inline]
    pub fn has_deferred(&self) -> bool {
        self.deferred.load(Ordering::SeqCst) > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_entry_is_reported() {
        let cs = CriticalSection::new();
        assert!(cs.try_enter());
        assert!(!cs.try_enter());
        cs.release();
        assert!(!cs.is_held());
        assert!(cs.try_enter());
    }

    #[test]
    fn test_deferred_ticks_accumulate() {
        let cs = CriticalSection::new();
        cs.defer_tick();
        cs.defer_tick();
        assert!(cs.has_deferred());
        assert_eq!(cs.take_deferred(), 2);
        assert!(!cs.has_deferred());
    }
}
