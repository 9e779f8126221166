/*!
 * Preemption Module
 *
 * Tick accounting, the critical section shared with the signal handler and,
 * with the `preemptive` feature, the SIGALRM timer that drives it.
 */

pub mod critical;
mod tick;

#[cfg(feature = "preemptive")]
mod handler;
#[cfg(feature = "preemptive")]
pub mod timer;

pub use critical::CriticalSection;

#[cfg(feature = "preemptive")]
pub use timer::{PreemptionTimer, TICK_SIGNAL};
