/*!
 * Preemption Timer
 *
 * A periodic POSIX timer per runtime, delivering SIGALRM to the OS thread
 * that owns the runtime (`SIGEV_THREAD_ID`). Runtimes on different OS
 * threads therefore tick independently.
 */

use super::handler::on_timer_signal;
use crate::core::errors::Result;
use nix::sys::signal::{sigaction, SaFlags, SigAction, SigEvent, SigHandler, SigSet, SigevNotify, Signal};
use nix::sys::time::TimeSpec;
use nix::sys::timer::{Expiration, Timer, TimerSetTimeFlags};
use nix::time::ClockId;
use nix::unistd::gettid;
use parking_lot::Mutex;
use std::fmt;
use std::time::Duration;
use tracing::{debug, info};

/// Signal used for ticks
pub const TICK_SIGNAL: Signal = Signal::SIGALRM;

/// The handler is process-wide; install it once and leave it in place.
/// Ticks that arrive after a runtime is gone find no scheduler and are ignored.
static HANDLER_INSTALLED: Mutex<bool> = parking_lot::const_mutex(false);

fn install_handler() -> Result<()> {
    let mut installed = HANDLER_INSTALLED.lock();
    if !*installed {
        let action = SigAction::new(
            SigHandler::Handler(on_timer_signal),
            SaFlags::SA_RESTART,
            SigSet::empty(),
        );
        // SAFETY: the handler touches only atomics, the const thread-local
        // scheduler pointer and the context switch primitive.
        unsafe { sigaction(TICK_SIGNAL, &action) }?;
        *installed = true;
        debug!(signal = %TICK_SIGNAL, "tick handler installed");
    }
    Ok(())
}

/// Signal set holding only the tick signal
pub(crate) fn tick_mask() -> SigSet {
    let mut mask = SigSet::empty();
    mask.add(TICK_SIGNAL);
    mask
}

/// Armed periodic timer. Dropping it deletes the timer.
pub struct PreemptionTimer {
    timer: Timer,
    period: Duration,
}

impl PreemptionTimer {
    /// Install the handler and start ticking every `period` on the calling
    /// OS thread
    pub fn arm(period: Duration) -> Result<Self> {
        install_handler()?;

        let sigevent = SigEvent::new(SigevNotify::SigevThreadId {
            signal: TICK_SIGNAL,
            thread_id: gettid().as_raw(),
            si_value: 0,
        });
        let mut timer = Timer::new(ClockId::CLOCK_MONOTONIC, sigevent)?;
        timer.set(
            Expiration::Interval(TimeSpec::from_duration(period)),
            TimerSetTimeFlags::empty(),
        )?;
        tick_mask().thread_unblock()?;

        info!(period_us = period.as_micros() as u64, "preemption timer armed");
        Ok(Self { timer, period })
    }

    #[inline]
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Ticks the kernel could not deliver because one was still pending
    pub fn overruns(&self) -> i32 {
        self.timer.overruns()
    }
}

impl fmt::Debug for PreemptionTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreemptionTimer")
            .field("period", &self.period)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_mask_holds_only_the_tick_signal() {
        let mask = tick_mask();
        assert!(mask.contains(TICK_SIGNAL));
        assert_eq!(mask.iter().count(), 1);
    }

    #[test]
    fn test_unblocking_the_tick_signal_succeeds() {
        // The signal handler runs this and cannot report a failure.
        assert!(tick_mask().thread_unblock().is_ok());
        assert!(tick_mask().thread_unblock().is_ok());
    }
}
