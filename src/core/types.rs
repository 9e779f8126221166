/*!
 * Core Types
 * Common types shared by the thread table, scheduler and preemption timer
 */

use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of a thread slot in the thread table
pub type SlotId = usize;

/// Opaque value handed to a thread's entry function.
///
/// The runtime never dereferences or frees it; callers that smuggle a pointer
/// through it keep ownership of the referent.
pub type ThreadArg = usize;

/// Entry function of a green thread
pub type Entry = fn();

/// Slot reserved for the bootstrap ("main") thread
pub const BOOTSTRAP_SLOT: SlotId = 0;

/// Lifecycle state of a thread slot
///
/// `Unused -> Ready -> Running <-> Ready`, `Running -> Blocked -> Ready`
/// (timer countdown), `Running/Ready -> Suspended -> Ready` (resume) and
/// `Running -> Unused` (exit).
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ThreadState {
    #[default]
    Unused,
    Running,
    Ready,
    Blocked,
    Suspended,
}

impl ThreadState {
    /// Human readable name used by diagnostics
    #[inline(always)]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Unused => "Unused",
            Self::Running => "Running",
            Self::Ready => "Ready",
            Self::Blocked => "Blocked",
            Self::Suspended => "Suspended",
        }
    }

    /// Waiting on a timer or an explicit resume
    #[inline(always)]
    pub const fn is_waiting(&self) -> bool {
        matches!(self, Self::Blocked | Self::Suspended)
    }

    /// Holds a stack and a saved context
    #[inline(always)]
    pub const fn is_live(&self) -> bool {
        !matches!(self, Self::Unused)
    }
}

impl fmt::Display for ThreadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Result of a dispatch attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Control went to another thread and has since come back
    Switched,
    /// No other thread was ready. `waiting` counts the threads that are
    /// blocked or suspended; zero means every other slot is unused.
    Idle { waiting: usize },
}

impl Outcome {
    /// Nothing is ready, blocked or suspended anymore
    #[inline]
    pub const fn is_quiescent(&self) -> bool {
        matches!(self, Self::Idle { waiting: 0 })
    }

    #[inline]
    pub const fn is_idle(&self) -> bool {
        matches!(self, Self::Idle { .. })
    }
}

/// Legacy integer encoding: `1` after a switch, `-waiting` when idle
impl From<Outcome> for i64 {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Switched => 1,
            Outcome::Idle { waiting } => -(waiting as i64),
        }
    }
}
