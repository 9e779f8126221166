/*!
 * Timer Tick
 *
 * One tick: charge the elapsed slice to the current thread, count down every
 * delay, and force a dispatch when the current thread's quota runs out.
 * Runs in signal context, so nothing here allocates, locks or logs.
 */

use crate::core::types::Outcome;
use crate::scheduler::Scheduler;
use std::time::Instant;

impl Scheduler {
    /// Account one tick. Returns true when the current thread's quota ran out.
    /// Requires the critical section.
    pub(crate) fn tick_locked(&self) -> bool {
        self.stats().inc_ticks();
        let now = Instant::now();
        let me = self.current();

        // SAFETY: critical section held by the caller; no switch below.
        let table = unsafe { self.table_mut() };
        let live = table[me].state().is_live();
        if live {
            table[me].charge(now);
        }
        table.sweep_delays();
        live && table[me].consume_quota()
    }

    /// A full tick, including the forced switch on quota expiry
    pub(crate) fn preempt_locked(&self) {
        if self.tick_locked() && self.dispatch_locked() == Outcome::Switched {
            self.stats().inc_preemptions();
        }
    }

    /// Entry point of the timer signal. A tick that lands inside a critical
    /// section is deferred to the code holding it.
    pub(crate) fn on_timer_signal(&self) {
        if !self.critical().try_enter() {
            self.critical().defer_tick();
            self.stats().inc_deferred_ticks();
            return;
        }
        self.preempt_locked();
        self.leave();
    }

    /// Deliver one tick synchronously, exactly as the timer would
    pub(crate) fn tick_now(&self) {
        let _cs = self.no_preempt();
        self.preempt_locked();
    }
}

#[cfg(test)]
mod tests {
    use crate::core::config::RuntimeConfig;
    use crate::core::types::ThreadState;
    use crate::scheduler::Runtime;

    fn idle() {}

    /// Quota high enough that the bootstrap thread is never forced off
    fn config() -> RuntimeConfig {
        RuntimeConfig::cooperative()
            .with_stack_size(64 * 1024)
            .with_default_quota(1_000)
    }

    #[test]
    fn test_tick_counts_down_delays() {
        let runtime = Runtime::init(config()).unwrap();
        let id = runtime.spawn(idle, "sleeper", 0, 1).unwrap();
        runtime.delay(id, 2).unwrap();

        runtime.tick();
        assert_eq!(runtime.state(id), Some(ThreadState::Blocked));
        runtime.tick();
        assert_eq!(runtime.state(id), Some(ThreadState::Ready));
    }

    #[test]
    fn test_tick_charges_current_thread() {
        let runtime = Runtime::init(config()).unwrap();
        runtime.tick();
        runtime.tick();
        let main = &runtime.snapshot()[0];
        assert_eq!(main.tick_count, 2);
        assert_eq!(runtime.stats().ticks, 2);
    }
}
