/*!
 * Scheduler Module
 *
 * Owns the thread table and the current-thread indicator of one OS thread.
 * Every operation runs inside the preemption critical section; the round-robin
 * dispatch hands that section to the thread it resumes.
 */

mod atomic_stats;
mod dispatch;
mod driver;
mod lifecycle;
mod runtime;

pub use atomic_stats::{AtomicSchedulerStats, SchedulerStats};
pub use lifecycle::PANIC_EXIT_CODE;
pub use runtime::Runtime;

use crate::core::config::RuntimeConfig;
use crate::core::types::{SlotId, BOOTSTRAP_SLOT};
use crate::preemption::CriticalSection;
use crate::thread::ThreadTable;
use std::cell::{Cell, UnsafeCell};
use std::marker::PhantomData;
use std::ptr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tracing::error;

thread_local! {
    /// Scheduler of this OS thread, read by the API functions and the timer
    /// signal handler. Const-initialized without a destructor, so reading it
    /// from a signal handler never allocates.
    static ACTIVE: Cell<*const Scheduler> = const { Cell::new(ptr::null()) };
}

/// Run `f` against this OS thread's scheduler, if a runtime is initialized
pub(crate) fn with_active<R>(f: impl FnOnce(&Scheduler) -> R) -> Option<R> {
    let scheduler = ACTIVE.with(Cell::get);
    // SAFETY: registered by Runtime::init and cleared by Runtime::drop before
    // the boxed scheduler is freed. Only this OS thread ever reads it.
    unsafe { scheduler.as_ref() }.map(f)
}

pub(crate) fn is_registered() -> bool {
    !ACTIVE.with(Cell::get).is_null()
}

fn register(scheduler: *const Scheduler) {
    ACTIVE.with(|active| active.set(scheduler));
}

/// Scheduler state of one OS thread
pub(crate) struct Scheduler {
    config: RuntimeConfig,
    table: UnsafeCell<ThreadTable>,
    current: AtomicUsize,
    critical: CriticalSection,
    stats: AtomicSchedulerStats,
    timer_armed: AtomicBool,
}

impl Scheduler {
    fn new(config: RuntimeConfig) -> Self {
        let table = ThreadTable::new(config.capacity, config.default_quota);
        let stats =
            AtomicSchedulerStats::new(config.capacity, config.tick_period, config.preemptive());
        Self {
            table: UnsafeCell::new(table),
            current: AtomicUsize::new(BOOTSTRAP_SLOT),
            critical: CriticalSection::new(),
            stats,
            timer_armed: AtomicBool::new(false),
            config,
        }
    }

    #[inline]
    pub(crate) fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    #[inline]
    pub(crate) fn stats(&self) -> &AtomicSchedulerStats {
        &self.stats
    }

    #[inline]
    pub(crate) fn current(&self) -> SlotId {
        self.current.load(Ordering::SeqCst)
    }

    #[inline]
    pub(crate) fn critical(&self) -> &CriticalSection {
        &self.critical
    }

    #[inline]
    pub(crate) fn timer_armed(&self) -> bool {
        self.timer_armed.load(Ordering::SeqCst)
    }

    fn set_timer_armed(&self, armed: bool) {
        self.timer_armed.store(armed, Ordering::SeqCst);
    }

    /// # Safety
    /// The caller holds the critical section and keeps no other reference
    /// into the table alive, in particular not across a context switch.
    #[allow(clippy::mut_from_ref)]
    #[inline]
    pub(crate) unsafe fn table_mut(&self) -> &mut ThreadTable {
        &mut *self.table.get()
    }

    /// Enter the critical section for the lifetime of the guard
    #[inline]
    pub(crate) fn no_preempt(&self) -> NoPreempt<'_> {
        NoPreempt {
            acquired: self.critical.try_enter(),
            scheduler: self,
            _not_send: PhantomData,
        }
    }

    /// Run `f` on the table inside the critical section
    pub(crate) fn with_table<R>(&self, f: impl FnOnce(&mut ThreadTable) -> R) -> R {
        let _cs = self.no_preempt();
        // SAFETY: critical section held; `f` cannot switch contexts.
        f(unsafe { self.table_mut() })
    }

    /// Leave the critical section, first replaying any ticks that arrived
    /// while it was held.
    pub(crate) fn leave(&self) {
        loop {
            let deferred = self.critical.take_deferred();
            if deferred > 0 {
                for _ in 0..deferred {
                    self.preempt_locked();
                }
                continue;
            }

            self.critical.release();
            // A tick deferred between the take and the release would be lost
            // until the next exit; pick it up now.
            if !self.critical.has_deferred() || !self.critical.try_enter() {
                return;
            }
        }
    }
}

/// Guard that keeps the preemption timer from switching threads.
///
/// Ticks arriving while any guard is alive are recorded and replayed when
/// the outermost guard drops. Nested guards are free.
///
/// In preemptive mode, code that allocates, locks or writes to stdio must run
/// under a guard: a switch in the middle of `malloc` or a `println!` would
/// leave its lock held by a thread that is not running.
#[must_use = "preemption is re-enabled as soon as the guard is dropped"]
pub struct NoPreempt<'a> {
    scheduler: &'a Scheduler,
    acquired: bool,
    _not_send: PhantomData<*const ()>,
}

impl NoPreempt<'_> {
    /// Whether this guard is the outermost one
    #[inline]
    pub fn is_outermost(&self) -> bool {
        self.acquired
    }
}

impl Drop for NoPreempt<'_> {
    fn drop(&mut self) {
        if self.acquired {
            self.scheduler.leave();
        }
    }
}

/// Abort the process after a scheduler invariant was broken
#[cold]
pub(crate) fn fatal(reason: &'static str, slot: SlotId) -> ! {
    error!(slot, reason, "fatal scheduler invariant violation");
    std::process::abort()
}
