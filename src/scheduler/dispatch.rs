/*!
 * Round-Robin Dispatch
 * Ready scan, state hand-off and parking of the current thread
 */

use super::{fatal, Scheduler};
use crate::context::Context;
use crate::core::errors::{Result, SchedulerError};
use crate::core::types::{Outcome, SlotId, ThreadState};
use crate::core::wait::sleep_uninterruptible;
use crate::thread::Scan;
use std::sync::atomic::Ordering;
use std::time::Instant;
use tracing::warn;

impl Scheduler {
    /// Switch to the next ready thread after the current one.
    ///
    /// Requires the critical section and returns still holding it: the thread
    /// that runs next releases it, and whoever switches back here re-acquires
    /// it first.
    pub(crate) fn dispatch_locked(&self) -> Outcome {
        debug_assert!(self.critical.is_held());
        let me = self.current();

        let (target, old, new) = {
            // SAFETY: critical section held; the borrow ends before the switch.
            let table = unsafe { self.table_mut() };
            let target = match table.scan_ready(me) {
                Scan::Found(id) => id,
                Scan::Idle { waiting } => {
                    // A tick may have made the current thread ready while it waited.
                    if table[me].state() == ThreadState::Ready {
                        table[me].state = ThreadState::Running;
                    }
                    return Outcome::Idle { waiting };
                }
            };

            let outgoing = &mut table[me];
            if outgoing.stack().is_some_and(|stack| !stack.canary_intact()) {
                fatal("stack overflow: canary overwritten", me);
            }
            if outgoing.state() == ThreadState::Running {
                outgoing.state = ThreadState::Ready;
            }

            let incoming = &mut table[target];
            incoming.state = ThreadState::Running;
            incoming.slice_started = Some(Instant::now());

            let old = table.context_ptr(me);
            let new = table.context_ptr(target).cast_const();
            (target, old, new)
        };

        self.current.store(target, Ordering::SeqCst);
        self.stats.inc_context_switches();

        // SAFETY: both save areas live in the table's fixed slice. `new` was
        // fabricated over a live stack or saved by an earlier switch away from
        // a thread that is still live.
        unsafe { Context::switch(old, new) };

        if self.current() != me {
            fatal("resumed thread is not the current thread", me);
        }
        Outcome::Switched
    }

    /// Keep dispatching until the current thread is runnable again.
    ///
    /// Used after the current thread suspended or delayed itself. When nothing
    /// else is ready the OS thread sleeps one tick period at a time so the
    /// timer (or a simulated tick) can wake a delayed thread.
    pub(crate) fn park_locked(&self, me: SlotId) -> Result<()> {
        loop {
            match self.dispatch_locked() {
                Outcome::Switched => return Ok(()),
                Outcome::Idle { .. } => {
                    // SAFETY: critical section held.
                    let table = unsafe { self.table_mut() };
                    match table[me].state() {
                        ThreadState::Running | ThreadState::Ready => {
                            table[me].state = ThreadState::Running;
                            return Ok(());
                        }
                        // Only a delayed thread can come back and resume us.
                        ThreadState::Suspended if !table.can_wake() => {
                            warn!(slot = me, "suspended with nothing left to resume it");
                            table[me].state = ThreadState::Running;
                            return Err(SchedulerError::Deadlock(me));
                        }
                        _ => self.idle_wait_locked(),
                    }
                }
            }
        }
    }

    /// Sleep one tick period with the critical section released, then
    /// re-acquire it. Without an armed timer the tick is simulated here.
    pub(crate) fn idle_wait_locked(&self) {
        self.leave();
        let slept = sleep_uninterruptible(self.config.tick_period);
        let entered = self.critical.try_enter();
        debug_assert!(entered, "critical section leaked by a timer tick");

        if let Err(e) = slept {
            warn!(error = %e, "idle wait cut short");
        }
        if !self.timer_armed() {
            self.tick_locked();
        }
    }
}
