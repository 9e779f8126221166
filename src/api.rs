/*!
 * Thread API
 *
 * Free functions for code running on a green thread, which has no handle to
 * the `Runtime`. Each one acts on the runtime of the calling OS thread.
 */

use crate::core::errors::{Result, SchedulerError};
use crate::core::types::{Entry, Outcome, SlotId, ThreadArg};
use crate::scheduler::with_active;
use crate::thread::ThreadName;

/// Give up the processor to the next ready thread.
/// Without a runtime there is nothing to switch to: `Idle { waiting: 0 }`.
pub fn yield_now() -> Outcome {
    with_active(|scheduler| scheduler.yield_now()).unwrap_or(Outcome::Idle { waiting: 0 })
}

/// Terminate the calling green thread with `code`. Does not return, except
/// on the bootstrap thread or without a runtime, where it does nothing.
pub fn exit(code: i32) {
    with_active(|scheduler| scheduler.exit_current(code));
}

/// Slot of the calling thread
pub fn current_id() -> Result<SlotId> {
    with_active(|scheduler| scheduler.current()).ok_or(SchedulerError::NotInitialized)
}

/// Name of the calling thread
pub fn current_name() -> Result<ThreadName> {
    with_active(|scheduler| {
        scheduler.with_table(|table| *table[scheduler.current()].name())
    })
    .ok_or(SchedulerError::NotInitialized)
}

/// Argument the calling thread was spawned with
pub fn current_argument() -> Result<ThreadArg> {
    with_active(|scheduler| scheduler.with_table(|table| table[scheduler.current()].argument()))
        .ok_or(SchedulerError::NotInitialized)
}

/// Ticks the calling thread may run before the timer forces a switch
pub fn current_quota() -> Result<u32> {
    with_active(|scheduler| scheduler.with_table(|table| table[scheduler.current()].quota()))
        .ok_or(SchedulerError::NotInitialized)
}

pub fn spawn(entry: Entry, name: &str, argument: ThreadArg, quota: u32) -> Result<SlotId> {
    with_active(|scheduler| scheduler.spawn(entry, name, argument, quota))
        .ok_or(SchedulerError::NotInitialized)?
}

/// Suspend `id`; suspending yourself parks until another thread resumes you
pub fn suspend(id: SlotId) -> Result<()> {
    with_active(|scheduler| scheduler.suspend(id)).ok_or(SchedulerError::NotInitialized)?
}

pub fn resume(id: SlotId) -> Result<()> {
    with_active(|scheduler| scheduler.resume(id)).ok_or(SchedulerError::NotInitialized)?
}

/// Mark `id` blocked for `ticks` ticks. Does not dispatch.
pub fn delay(id: SlotId, ticks: u32) -> Result<()> {
    with_active(|scheduler| scheduler.delay(id, ticks)).ok_or(SchedulerError::NotInitialized)?
}

/// Block the calling thread for `ticks` ticks and run others meanwhile
pub fn sleep_ticks(ticks: u32) -> Result<()> {
    with_active(|scheduler| scheduler.sleep_ticks(ticks)).ok_or(SchedulerError::NotInitialized)?
}

pub fn set_quota(id: SlotId, quota: u32) -> Result<()> {
    with_active(|scheduler| scheduler.set_quota(id, quota)).ok_or(SchedulerError::NotInitialized)?
}

/// Table dump of the calling thread's runtime
pub fn list() -> Result<String> {
    with_active(|scheduler| crate::diagnostics::render(&scheduler.snapshot()))
        .ok_or(SchedulerError::NotInitialized)
}

/// Run `f` with preemption held off. Ticks that fire meanwhile run when it
/// returns. Without a runtime `f` simply runs.
///
/// Wrap allocation, locking and stdio in this when the timer is armed.
pub fn with_preemption_disabled<R>(f: impl FnOnce() -> R) -> R {
    struct Reenable;

    impl Drop for Reenable {
        fn drop(&mut self) {
            with_active(|scheduler| scheduler.leave());
        }
    }

    let acquired = with_active(|scheduler| scheduler.critical().try_enter()).unwrap_or(false);
    let _reenable = acquired.then_some(Reenable);
    f()
}
