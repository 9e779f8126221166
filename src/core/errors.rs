/*!
 * Error Types
 * Centralized error handling with thiserror, miette, and serde support
 */

use super::types::SlotId;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Scheduler errors with serialization support
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum SchedulerError {
    #[error("Thread table full: all {capacity} slots are in use")]
    #[diagnostic(
        code(scheduler::table_full),
        help("Wait for a thread to exit or raise the table capacity.")
    )]
    TableFull { capacity: usize },

    #[error("Stack allocation of {size} bytes failed")]
    #[diagnostic(
        code(scheduler::allocation_failed),
        help("System may be low on memory. Consider a smaller stack size.")
    )]
    AllocationFailed { size: usize },

    #[error("Slot {0} is out of range or unused")]
    #[diagnostic(
        code(scheduler::invalid_slot),
        help("The thread may have exited or never existed. Check the slot id.")
    )]
    InvalidSlot(SlotId),

    #[error("Quota must be at least one tick, got {0}")]
    #[diagnostic(code(scheduler::invalid_quota))]
    InvalidQuota(u32),

    #[error("No runtime is initialized on this OS thread")]
    #[diagnostic(
        code(scheduler::not_initialized),
        help("Call Runtime::init before using the thread API.")
    )]
    NotInitialized,

    #[error("A runtime is already initialized on this OS thread")]
    #[diagnostic(code(scheduler::already_initialized))]
    AlreadyInitialized,

    #[error("Slot {0} suspended itself with no other thread left to resume it")]
    #[diagnostic(
        code(scheduler::deadlock_detected),
        help("Spawn the thread that will call resume before suspending.")
    )]
    Deadlock(SlotId),

    #[error("All {suspended} remaining threads are suspended and nothing can resume them")]
    #[diagnostic(
        code(scheduler::stalled),
        help("Resume suspended threads before running the driver loop.")
    )]
    Stalled { suspended: usize },

    #[error("Preemption timer error: {0}")]
    #[diagnostic(code(scheduler::timer))]
    Timer(String),

    #[error("Wait failed: {0}")]
    #[diagnostic(code(scheduler::wait_failed))]
    WaitFailed(String),

    #[error("Invalid configuration: {0}")]
    #[diagnostic(
        code(scheduler::invalid_config),
        help("Review capacity, stack size, tick period and default quota.")
    )]
    InvalidConfig(String),
}

impl From<nix::Error> for SchedulerError {
    fn from(errno: nix::Error) -> Self {
        SchedulerError::Timer(errno.desc().to_string())
    }
}

/// Result type for scheduler operations
pub type Result<T> = std::result::Result<T, SchedulerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheduler_error_serialization() {
        let error = SchedulerError::TableFull { capacity: 5 };
        let json = serde_json::to_string(&error).unwrap();
        let deserialized: SchedulerError = serde_json::from_str(&json).unwrap();
        assert_eq!(error, deserialized);
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            SchedulerError::InvalidSlot(7).to_string(),
            "Slot 7 is out of range or unused"
        );
        assert_eq!(
            SchedulerError::AllocationFailed { size: 4096 }.to_string(),
            "Stack allocation of 4096 bytes failed"
        );
    }

    #[test]
    fn test_from_errno() {
        let error: SchedulerError = nix::Error::EINVAL.into();
        assert!(matches!(error, SchedulerError::Timer(_)));
    }
}
