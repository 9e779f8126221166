/*!
 * Diagnostics
 * Read-only views of the thread table: structured snapshots and the text listing
 */

use crate::core::types::{SlotId, ThreadState, BOOTSTRAP_SLOT};
use crate::scheduler::Scheduler;
use crate::thread::Tcb;
use serde::Serialize;
use std::fmt::Write;
use std::time::Duration;

/// Copy of one slot's observable fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThreadInfo {
    pub id: SlotId,
    pub name: String,
    pub state: ThreadState,
    /// Running time charged by ticks
    pub elapsed: Duration,
    pub tick_count: u64,
    pub delay_ticks: u32,
    pub quota: u32,
    pub quota_remaining: u32,
    /// Exit code of the slot's last thread; `-1` after a panic
    pub exit_code: Option<i32>,
}

impl From<&Tcb> for ThreadInfo {
    fn from(tcb: &Tcb) -> Self {
        Self {
            id: tcb.id(),
            name: tcb.name().as_str().to_owned(),
            state: tcb.state(),
            elapsed: tcb.accumulated(),
            tick_count: tcb.tick_count(),
            delay_ticks: tcb.delay_ticks(),
            quota: tcb.quota(),
            quota_remaining: tcb.quota_remaining(),
            exit_code: tcb.exit_code(),
        }
    }
}

impl Scheduler {
    pub(crate) fn snapshot(&self) -> Vec<ThreadInfo> {
        self.with_table(|table| table.iter().map(ThreadInfo::from).collect())
    }
}

/// Text listing of every slot except the bootstrap one
///
/// ```text
/// ID  | Name                | State     |     Time (s) | Ticks
/// ----+---------------------+-----------+--------------+-------
/// 1   | First thread        | Suspended |     0.000000 | 0
/// ```
pub fn render(threads: &[ThreadInfo]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<3} | {:<19} | {:<9} | {:>12} | {}",
        "ID", "Name", "State", "Time (s)", "Ticks"
    );
    let _ = writeln!(out, "----+---------------------+-----------+--------------+-------");

    for info in threads.iter().filter(|info| info.id != BOOTSTRAP_SLOT) {
        let _ = writeln!(
            out,
            "{:<3} | {:<19} | {:<9} | {:>12.6} | {}",
            info.id,
            info.name,
            info.state,
            info.elapsed.as_secs_f64(),
            info.tick_count
        );
    }
    out
}
