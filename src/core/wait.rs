/*!
 * Uninterruptible Wait
 *
 * Sleeps for the full requested duration even when the preemption timer keeps
 * interrupting `nanosleep` with SIGALRM.
 */

use super::errors::{Result, SchedulerError};
use nix::errno::Errno;
use nix::libc;
use nix::sys::time::TimeSpec;
use std::time::Duration;

/// Sleep for `duration`, restarting with the remaining time after every
/// `EINTR`. Any other failure is returned as `WaitFailed`.
pub fn sleep_uninterruptible(duration: Duration) -> Result<()> {
    let mut request = TimeSpec::from_duration(duration);
    loop {
        let mut remaining = TimeSpec::new(0, 0);
        // SAFETY: both pointers refer to live, properly initialized timespecs.
        let res = unsafe { libc::nanosleep(request.as_ref(), remaining.as_mut()) };
        match Errno::result(res) {
            Ok(_) => return Ok(()),
            Err(Errno::EINTR) => {
                if remaining.tv_sec() <= 0 && remaining.tv_nsec() <= 0 {
                    return Ok(());
                }
                request = remaining;
            }
            Err(errno) => return Err(SchedulerError::WaitFailed(errno.desc().to_string())),
        }
    }
}
