/*!
 * Driver Loop
 * Runs the bootstrap thread's share of the schedule until nothing is left
 */

use super::Scheduler;
use crate::core::errors::{Result, SchedulerError};
use crate::core::types::Outcome;
use tracing::{info, warn};

impl Scheduler {
    /// Dispatch repeatedly until every slot except the bootstrap one is
    /// unused. Backs off one tick period whenever only waiting threads remain.
    ///
    /// Without an armed timer, one tick is simulated per round so delays
    /// still count down.
    pub(crate) fn run_until_quiescent(&self) -> Result<()> {
        let _cs = self.no_preempt();
        info!(preemptive = self.timer_armed(), "driver loop started");

        loop {
            let outcome = self.dispatch_locked();
            self.reap_locked();

            match outcome {
                Outcome::Switched => {
                    if !self.timer_armed() {
                        self.tick_locked();
                    }
                }
                Outcome::Idle { waiting: 0 } => break,
                Outcome::Idle { waiting } => {
                    // SAFETY: critical section held.
                    let table = unsafe { self.table_mut() };
                    if !table.can_wake() {
                        warn!(suspended = waiting, "driver stalled on suspended threads");
                        return Err(SchedulerError::Stalled { suspended: waiting });
                    }
                    self.idle_wait_locked();
                }
            }
        }

        let stats = self.stats.snapshot();
        info!(
            switches = stats.context_switches,
            ticks = stats.ticks,
            exited = stats.exited,
            "all threads finished"
        );
        Ok(())
    }
}
