/*!
 * Runtime Handle
 *
 * Owns the scheduler of the OS thread that created it. That thread becomes
 * the bootstrap thread in slot 0. Dropping the handle disarms the timer and
 * frees every stack.
 */

use super::{fatal, is_registered, register, NoPreempt, Scheduler, SchedulerStats};
use crate::core::config::RuntimeConfig;
use crate::core::errors::{Result, SchedulerError};
use crate::core::types::{Entry, Outcome, SlotId, ThreadArg, ThreadState, BOOTSTRAP_SLOT};
use crate::diagnostics::{self, ThreadInfo};
#[cfg(feature = "preemptive")]
use crate::preemption::PreemptionTimer;
use std::marker::PhantomData;
use std::ptr;
use tracing::{info, warn};

/// Green thread runtime bound to the current OS thread
///
/// # Example
/// ```no_run
/// use gthreads::{Runtime, RuntimeConfig};
///
/// fn worker() {
///     for _ in 0..3 {
///         gthreads::yield_now();
///     }
/// }
///
/// let runtime = Runtime::init(RuntimeConfig::cooperative())?;
/// runtime.spawn(worker, "worker", 0, 1)?;
/// runtime.run_until_quiescent()?;
/// # Ok::<(), gthreads::SchedulerError>(())
/// ```
pub struct Runtime {
    scheduler: Box<Scheduler>,
    #[cfg(feature = "preemptive")]
    timer: Option<PreemptionTimer>,
    _not_send: PhantomData<*const ()>,
}

impl Runtime {
    /// Reset the table, register the calling OS thread as the bootstrap
    /// thread and, in preemptive mode, arm the tick timer.
    pub fn init(config: RuntimeConfig) -> Result<Self> {
        config.validate()?;
        if is_registered() {
            return Err(SchedulerError::AlreadyInitialized);
        }

        let scheduler = Box::new(Scheduler::new(config));
        register(&*scheduler);

        let mut runtime = Self {
            scheduler,
            #[cfg(feature = "preemptive")]
            timer: None,
            _not_send: PhantomData,
        };
        // On failure `runtime` drops here and unregisters itself.
        runtime.arm_timer()?;

        let config = runtime.scheduler.config();
        info!(
            capacity = config.capacity,
            stack_size = config.stack_size,
            tick_period_ms = config.tick_period.as_millis() as u64,
            preemptive = runtime.scheduler.timer_armed(),
            "runtime initialized"
        );
        Ok(runtime)
    }

    #[inline]
    pub fn config(&self) -> &RuntimeConfig {
        self.scheduler.config()
    }

    /// Whether a tick timer is armed
    #[inline]
    pub fn is_preemptive(&self) -> bool {
        self.scheduler.timer_armed()
    }

    /// Place a new thread in the lowest unused slot. It first runs when a
    /// dispatch reaches it.
    pub fn spawn(
        &self,
        entry: Entry,
        name: &str,
        argument: ThreadArg,
        quota: u32,
    ) -> Result<SlotId> {
        self.scheduler.spawn(entry, name, argument, quota)
    }

    /// Give up the processor to the next ready thread
    pub fn yield_now(&self) -> Outcome {
        self.scheduler.yield_now()
    }

    pub fn suspend(&self, id: SlotId) -> Result<()> {
        self.scheduler.suspend(id)
    }

    pub fn resume(&self, id: SlotId) -> Result<()> {
        self.scheduler.resume(id)
    }

    pub fn delay(&self, id: SlotId, ticks: u32) -> Result<()> {
        self.scheduler.delay(id, ticks)
    }

    /// Block the calling thread for `ticks` ticks, running others meanwhile
    pub fn sleep_ticks(&self, ticks: u32) -> Result<()> {
        self.scheduler.sleep_ticks(ticks)
    }

    pub fn set_quota(&self, id: SlotId, quota: u32) -> Result<()> {
        self.scheduler.set_quota(id, quota)
    }

    #[inline]
    pub fn current_id(&self) -> SlotId {
        self.scheduler.current()
    }

    /// State of any slot; `None` when out of range
    pub fn state(&self, id: SlotId) -> Option<ThreadState> {
        self.scheduler.state_of(id)
    }

    /// Deliver one tick synchronously, as if the timer had fired
    pub fn tick(&self) {
        self.scheduler.tick_now()
    }

    /// Run every other thread to completion. Must be called from the
    /// bootstrap thread.
    pub fn run_until_quiescent(&self) -> Result<()> {
        self.scheduler.run_until_quiescent()
    }

    /// Keep the timer from switching threads until the guard drops
    pub fn no_preempt(&self) -> NoPreempt<'_> {
        self.scheduler.no_preempt()
    }

    /// Table dump in the `list` text format
    pub fn list(&self) -> String {
        diagnostics::render(&self.snapshot())
    }

    /// Per-slot view of the table, bootstrap slot included
    pub fn snapshot(&self) -> Vec<ThreadInfo> {
        self.scheduler.snapshot()
    }

    pub fn stats(&self) -> SchedulerStats {
        self.scheduler.stats().snapshot()
    }

    #[cfg(feature = "preemptive")]
    fn arm_timer(&mut self) -> Result<()> {
        if self.scheduler.config().preemptive() {
            self.timer = Some(PreemptionTimer::arm(self.scheduler.config().tick_period)?);
            self.scheduler.set_timer_armed(true);
        }
        Ok(())
    }

    #[cfg(not(feature = "preemptive"))]
    fn arm_timer(&mut self) -> Result<()> {
        Ok(())
    }

    #[cfg(feature = "preemptive")]
    fn disarm_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            self.scheduler.set_timer_armed(false);
            drop(timer);
        }
    }

    #[cfg(not(feature = "preemptive"))]
    fn disarm_timer(&mut self) {}
}

impl Drop for Runtime {
    fn drop(&mut self) {
        let current = self.scheduler.current();
        if current != BOOTSTRAP_SLOT {
            // Freeing the table would pull the stack out from under us.
            fatal("runtime dropped from a green thread", current);
        }

        // Held until the scheduler is gone; late ticks are only recorded,
        // never replayed.
        self.scheduler.critical().try_enter();

        self.disarm_timer();

        let live = self.scheduler.with_table(|table| table.live_count());
        if live > 1 {
            warn!(threads = live - 1, "runtime dropped with threads still live");
        }
        self.scheduler.reap_locked();
        info!("runtime shut down");

        register(ptr::null());
        self.scheduler.critical().release();
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("config", self.scheduler.config())
            .field("current", &self.scheduler.current())
            .finish_non_exhaustive()
    }
}
