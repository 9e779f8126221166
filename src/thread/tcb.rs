/*!
 * Thread Control Block
 * Per-slot record: state, saved context, stack, name and time accounting
 */

use super::name::ThreadName;
use crate::context::{Context, Stack};
use crate::core::types::{Entry, SlotId, ThreadArg, ThreadState};
use std::time::{Duration, Instant};

/// One slot of the thread table.
///
/// The context must stay at a fixed address while the slot is live, so
/// control blocks only ever live inside the table's boxed slice.
#[derive(Debug)]
pub struct Tcb {
    id: SlotId,
    pub(crate) state: ThreadState,
    pub(crate) context: Context,
    name: ThreadName,
    argument: ThreadArg,
    entry: Option<Entry>,
    stack: Option<Stack>,
    /// Stack of an exited thread, released at the next synchronous point
    retired: Option<Stack>,
    accumulated: Duration,
    tick_count: u64,
    pub(crate) delay_ticks: u32,
    quota: u32,
    quota_remaining: u32,
    pub(crate) slice_started: Option<Instant>,
    exit_code: Option<i32>,
}

/// Everything `occupy` needs to turn an unused slot into a ready thread
pub(crate) struct Launch {
    pub name: ThreadName,
    pub entry: Entry,
    pub argument: ThreadArg,
    pub quota: u32,
    pub stack: Stack,
    pub context: Context,
}

impl Tcb {
    pub(crate) fn unused(id: SlotId) -> Self {
        Self {
            id,
            state: ThreadState::Unused,
            context: Context::default(),
            name: ThreadName::empty(),
            argument: 0,
            entry: None,
            stack: None,
            retired: None,
            accumulated: Duration::ZERO,
            tick_count: 0,
            delay_ticks: 0,
            quota: 0,
            quota_remaining: 0,
            slice_started: None,
            exit_code: None,
        }
    }

    /// The slot of the thread that called `Runtime::init`
    pub(crate) fn bootstrap(id: SlotId, quota: u32) -> Self {
        Self {
            state: ThreadState::Running,
            context: Context::bootstrap(),
            name: ThreadName::new("main"),
            quota,
            quota_remaining: quota,
            slice_started: Some(Instant::now()),
            ..Self::unused(id)
        }
    }

    #[inline]
    pub fn id(&self) -> SlotId {
        self.id
    }

    #[inline]
    pub fn state(&self) -> ThreadState {
        self.state
    }

    #[inline]
    pub fn name(&self) -> &ThreadName {
        &self.name
    }

    #[inline]
    pub fn argument(&self) -> ThreadArg {
        self.argument
    }

    #[inline]
    pub fn entry(&self) -> Option<Entry> {
        self.entry
    }

    /// Running time charged by timer ticks
    #[inline]
    pub fn accumulated(&self) -> Duration {
        self.accumulated
    }

    /// Timer ticks that landed while this thread was current
    #[inline]
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    #[inline]
    pub fn delay_ticks(&self) -> u32 {
        self.delay_ticks
    }

    #[inline]
    pub fn quota(&self) -> u32 {
        self.quota
    }

    #[inline]
    pub fn quota_remaining(&self) -> u32 {
        self.quota_remaining
    }

    /// Exit code of the last thread that occupied this slot
    #[inline]
    pub fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }

    #[inline]
    pub fn stack(&self) -> Option<&Stack> {
        self.stack.as_ref()
    }

    /// Turn an unused slot into a ready thread
    pub(crate) fn occupy(&mut self, launch: Launch) {
        debug_assert_eq!(self.state, ThreadState::Unused);
        self.state = ThreadState::Ready;
        self.context = launch.context;
        self.name = launch.name;
        self.entry = Some(launch.entry);
        self.argument = launch.argument;
        self.stack = Some(launch.stack);
        self.accumulated = Duration::ZERO;
        self.tick_count = 0;
        self.delay_ticks = 0;
        self.quota = launch.quota;
        self.quota_remaining = launch.quota;
        self.slice_started = None;
        self.exit_code = None;
    }

    /// Mark the slot unused. The stack is still in use by the exiting thread,
    /// so it moves to the retired spot instead of being freed.
    pub(crate) fn release(&mut self, code: i32) {
        self.state = ThreadState::Unused;
        self.entry = None;
        self.delay_ticks = 0;
        self.slice_started = None;
        self.exit_code = Some(code);
        if let Some(stack) = self.stack.take() {
            self.retired = Some(stack);
        }
    }

    /// Take the retired stack of an unused slot, if any
    pub(crate) fn take_retired(&mut self) -> Option<Stack> {
        if self.state == ThreadState::Unused {
            self.retired.take()
        } else {
            None
        }
    }

    pub(crate) fn suspend(&mut self) {
        self.state = ThreadState::Suspended;
        self.delay_ticks = 0;
    }

    /// Suspended -> Ready. Returns false for any other state.
    pub(crate) fn resume(&mut self) -> bool {
        if self.state == ThreadState::Suspended {
            self.state = ThreadState::Ready;
            true
        } else {
            false
        }
    }

    pub(crate) fn block(&mut self, ticks: u32) {
        self.state = ThreadState::Blocked;
        self.delay_ticks = ticks;
    }

    /// Count one tick off the delay. Returns true when a blocked thread
    /// becomes ready on this tick.
    pub(crate) fn age(&mut self) -> bool {
        self.delay_ticks = self.delay_ticks.saturating_sub(1);
        if self.state == ThreadState::Blocked && self.delay_ticks == 0 {
            self.state = ThreadState::Ready;
            true
        } else {
            false
        }
    }

    /// Charge the time since the slice mark and count the tick
    pub(crate) fn charge(&mut self, now: Instant) {
        if let Some(started) = self.slice_started {
            self.accumulated += now.saturating_duration_since(started);
        }
        self.slice_started = Some(now);
        self.tick_count += 1;
    }

    /// Use up one tick of quota. Returns true (and refills) when it ran out.
    pub(crate) fn consume_quota(&mut self) -> bool {
        self.quota_remaining = self.quota_remaining.saturating_sub(1);
        if self.quota_remaining == 0 {
            self.quota_remaining = self.quota;
            true
        } else {
            false
        }
    }

    pub(crate) fn set_quota(&mut self, quota: u32) {
        self.quota = quota;
        self.quota_remaining = quota;
    }
}
