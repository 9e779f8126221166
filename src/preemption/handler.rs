/*!
 * Tick Signal Handler
 */

use super::timer::tick_mask;
use crate::scheduler::with_active;
use nix::libc;

/// SIGALRM handler. May switch to another green thread and only return once
/// the interrupted thread is dispatched again.
pub(crate) extern "C" fn on_timer_signal(_signal: libc::c_int) {
    // errno belongs to the OS thread, which every green thread shares.
    // SAFETY: __errno_location always returns this thread's errno slot.
    let errno = unsafe { *libc::__errno_location() };

    // The kernel blocks SIGALRM while the handler runs. If this handler
    // switches away, the next thread must still be preemptible.
    // pthread_sigmask only fails on an invalid `how`, and nothing can be
    // logged from signal context.
    let unblocked = tick_mask().thread_unblock();
    debug_assert!(unblocked.is_ok());

    with_active(|scheduler| scheduler.on_timer_signal());

    // SAFETY: as above.
    unsafe { *libc::__errno_location() = errno };
}
