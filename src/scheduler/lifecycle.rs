/*!
 * Thread Lifecycle
 * Spawn, exit, suspend, resume, delay and the start trampolines
 */

use super::{fatal, with_active, Scheduler};
use crate::context::{Context, Stack};
use crate::core::errors::{Result, SchedulerError};
use crate::core::types::{Entry, Outcome, SlotId, ThreadArg, ThreadState, BOOTSTRAP_SLOT};
use crate::thread::tcb::Launch;
use crate::thread::ThreadName;
use std::panic;
use tracing::{debug, info, warn};

/// Exit code recorded for a thread whose entry function panicked
pub const PANIC_EXIT_CODE: i32 = -1;

impl Scheduler {
    pub(crate) fn spawn(
        &self,
        entry: Entry,
        name: &str,
        argument: ThreadArg,
        quota: u32,
    ) -> Result<SlotId> {
        if quota == 0 {
            return Err(SchedulerError::InvalidQuota(quota));
        }

        let _cs = self.no_preempt();
        // SAFETY: critical section held; nothing below switches.
        let table = unsafe { self.table_mut() };
        let id = table.first_unused().ok_or(SchedulerError::TableFull {
            capacity: table.capacity(),
        })?;

        let stack = match table[id].take_retired() {
            Some(stack) if stack.size() >= self.config.stack_size && stack.canary_intact() => stack,
            _ => Stack::new(self.config.stack_size)?,
        };
        let context = Context::fabricate(&stack, thread_start, thread_return);

        table[id].occupy(Launch {
            name: ThreadName::new(name),
            entry,
            argument,
            quota,
            stack,
            context,
        });
        self.stats.record_spawn();

        info!(slot = id, name = %table[id].name(), quota, "thread spawned");
        Ok(id)
    }

    /// Terminate the current thread with `code`. Returns only when called
    /// from the bootstrap thread, where it does nothing.
    pub(crate) fn exit_current(&self, code: i32) {
        let cs = self.no_preempt();
        let me = self.current();
        if me == BOOTSTRAP_SLOT {
            debug!("exit on the bootstrap thread ignored");
            return;
        }

        {
            // SAFETY: critical section held.
            let table = unsafe { self.table_mut() };
            info!(slot = me, name = %table[me].name(), code, "thread exited");
            table[me].release(code);
        }
        self.stats.record_exit();

        // Whichever thread runs next releases the section.
        std::mem::forget(cs);
        loop {
            match self.dispatch_locked() {
                Outcome::Switched => fatal("exited thread was resumed", me),
                Outcome::Idle { .. } => {
                    // SAFETY: critical section held.
                    if !unsafe { self.table_mut() }.can_wake() {
                        fatal("no runnable thread after exit", me);
                    }
                    self.idle_wait_locked();
                }
            }
        }
    }

    /// Suspend `id`. Suspending the current thread parks it until `resume`.
    pub(crate) fn suspend(&self, id: SlotId) -> Result<()> {
        let _cs = self.no_preempt();
        {
            // SAFETY: critical section held.
            let table = unsafe { self.table_mut() };
            let tcb = table.get_mut(id)?;
            tcb.suspend();
            info!(slot = id, name = %tcb.name(), "thread suspended");
        }

        if id == self.current() {
            self.park_locked(id)?;
        }
        Ok(())
    }

    /// Make a suspended thread ready. Threads in any other state are left alone.
    pub(crate) fn resume(&self, id: SlotId) -> Result<()> {
        self.with_table(|table| {
            let tcb = table.get_mut(id)?;
            if tcb.resume() {
                info!(slot = id, name = %tcb.name(), "thread resumed");
            } else {
                debug!(slot = id, state = %tcb.state(), "resume ignored");
            }
            Ok(())
        })
    }

    /// Block `id` for `ticks` timer ticks. Does not dispatch, even when `id`
    /// is the current thread; see `sleep_ticks`.
    pub(crate) fn delay(&self, id: SlotId, ticks: u32) -> Result<()> {
        self.with_table(|table| {
            let tcb = table.get_mut(id)?;
            tcb.block(ticks);
            debug!(slot = id, ticks, "thread delayed");
            Ok(())
        })
    }

    /// Block the current thread for `ticks` ticks and park until it wakes
    pub(crate) fn sleep_ticks(&self, ticks: u32) -> Result<()> {
        let _cs = self.no_preempt();
        let me = self.current();
        {
            // SAFETY: critical section held.
            let table = unsafe { self.table_mut() };
            table[me].block(ticks);
        }
        self.park_locked(me)
    }

    pub(crate) fn set_quota(&self, id: SlotId, quota: u32) -> Result<()> {
        if quota == 0 {
            return Err(SchedulerError::InvalidQuota(quota));
        }
        self.with_table(|table| {
            table.get_mut(id)?.set_quota(quota);
            debug!(slot = id, quota, "quota changed");
            Ok(())
        })
    }

    pub(crate) fn yield_now(&self) -> Outcome {
        let _cs = self.no_preempt();
        self.dispatch_locked()
    }

    pub(crate) fn state_of(&self, id: SlotId) -> Option<ThreadState> {
        self.with_table(|table| table.slot(id).map(|tcb| tcb.state()))
    }

    /// Free the stacks of exited threads. Only called from synchronous points
    /// where no exited thread can still be running on its stack.
    pub(crate) fn reap_locked(&self) -> usize {
        // SAFETY: critical section held by the caller.
        let table = unsafe { self.table_mut() };
        let reaped = table
            .iter_mut()
            .filter_map(|tcb| tcb.take_retired())
            .count();
        if reaped > 0 {
            debug!(reaped, "released stacks of exited threads");
        }
        reaped
    }
}

/// First code a new thread runs. Entered by a switch, so the critical
/// section is held on arrival.
extern "C" fn thread_start() -> ! {
    with_active(run_thread);
    std::process::abort()
}

fn run_thread(scheduler: &Scheduler) {
    let me = scheduler.current();
    // SAFETY: critical section handed over by the switch into this thread.
    let entry = unsafe { scheduler.table_mut() }[me].entry();
    scheduler.leave();

    let code = match entry {
        Some(entry) => match panic::catch_unwind(entry) {
            Ok(()) => 0,
            Err(_) => {
                let _cs = scheduler.no_preempt();
                warn!(slot = me, "thread panicked");
                PANIC_EXIT_CODE
            }
        },
        None => fatal("started a slot without an entry function", me),
    };

    scheduler.exit_current(code);
    fatal("exit returned on a green thread", me)
}

/// Return address planted below `thread_start`. `thread_start` diverges, so
/// this only runs if a start frame is ever unwound by a plain `ret`.
extern "C" fn thread_return() -> ! {
    with_active(|scheduler| scheduler.exit_current(0));
    std::process::abort()
}
