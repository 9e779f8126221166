/*!
 * GThreads Library
 * Preemptive green threads in user space: one runtime per OS thread, a
 * fixed thread table and a round-robin scheduler driven by a SIGALRM tick
 *
 * Build features:
 * - `preemptive` (default): periodic timer plus the preemption-safe switch
 * - without it: threads switch only on `yield_now`, `suspend`,
 *   `sleep_ticks` and `exit`
 */

#[cfg(not(all(target_arch = "x86_64", target_os = "linux")))]
compile_error!("gthreads supports x86_64 Linux only");

pub mod api;
pub mod context;
pub mod core;
pub mod diagnostics;
pub mod logging;
pub mod preemption;
pub mod scheduler;
pub mod thread;

// Re-exports
pub use api::{
    current_argument, current_id, current_name, current_quota, delay, exit, list, resume,
    set_quota, sleep_ticks, spawn, suspend, with_preemption_disabled, yield_now,
};
pub use crate::core::{
    Entry, Outcome, Result, RuntimeConfig, SchedulerError, SlotId, ThreadArg, ThreadState,
    BOOTSTRAP_SLOT,
};
pub use diagnostics::ThreadInfo;
pub use scheduler::{NoPreempt, Runtime, SchedulerStats, PANIC_EXIT_CODE};
pub use thread::ThreadName;
