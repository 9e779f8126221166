/*!
 * System Limits and Constants
 *
 * Centralized location for the scheduler's compile-time defaults.
 * Every value can be overridden through `RuntimeConfig` except the name
 * buffer, which is part of the control block layout.
 */

use std::time::Duration;

// =============================================================================
// THREAD TABLE
// =============================================================================

/// Default number of slots, including the bootstrap slot
pub const DEFAULT_CAPACITY: usize = 5;

/// Smallest usable table: the bootstrap slot plus one green thread
pub const MIN_CAPACITY: usize = 2;

/// Thread name buffer, including the terminating NUL
pub const NAME_CAPACITY: usize = 20;

// =============================================================================
// STACKS
// =============================================================================

/// Default stack size per green thread (4MB)
pub const DEFAULT_STACK_SIZE: usize = 0x40_0000;

/// Smallest accepted stack (16KB)
/// Formatting and tracing frames need a few KB on their own
pub const MIN_STACK_SIZE: usize = 16 * 1024;

/// Stack alignment required by the System V ABI
pub const STACK_ALIGN: usize = 16;

/// Written at the lowest address of every stack and checked on each switch
pub const STACK_CANARY: u64 = 0x6774_6872_5f63_616e;

// =============================================================================
// PREEMPTION
// =============================================================================

/// Default timer period (10ms)
pub const DEFAULT_TICK_PERIOD: Duration = Duration::from_millis(10);

/// Shortest accepted timer period (1ms)
pub const MIN_TICK_PERIOD: Duration = Duration::from_millis(1);

/// Default preemption quota in ticks
pub const DEFAULT_QUOTA: u32 = 1;
