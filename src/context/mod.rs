/*!
 * Context Switch Primitive
 *
 * The only place in the crate that touches raw machine state. Everything above
 * this module works on `Context` save areas and `Stack` regions owned by thread
 * control blocks.
 *
 * Two variants exist, selected at build time:
 * - cooperative: saves rsp, rbp and the callee-saved set into the save area;
 *   only ever called from ordinary code
 * - preemptive (`preemptive` feature): saves rsp and rbp in the save area and
 *   pushes the rest onto the thread's stack, so a switch issued from inside
 *   the timer signal handler resumes the interrupted thread untouched
 */

mod stack;
mod x86_64;

pub use stack::Stack;

use std::ptr;
use x86_64 as arch;

/// Exclusively owned save area of one thread
#[repr(transparent)]
#[derive(Debug, Default)]
pub struct Context {
    regs: arch::Registers,
}

impl Context {
    /// Save area for a thread that is already running on its own stack.
    /// It is filled in by the first switch away from it.
    pub fn bootstrap() -> Self {
        Self::default()
    }

    /// Fabricate the context of a thread that has never run: the first switch
    /// into it starts executing `start` at the top of `stack`, and a plain
    /// return from `start` continues in `on_return`.
    pub fn fabricate(
        stack: &Stack,
        start: extern "C" fn() -> !,
        on_return: extern "C" fn() -> !,
    ) -> Self {
        // SAFETY: top() is 16-aligned and the stack is at least 16KB.
        let regs = unsafe { arch::initial_frame(stack.top(), start as u64, on_return as u64) };
        Self { regs }
    }

    /// Saved stack pointer (diagnostics and tests)
    #[inline]
    pub fn stack_pointer(&self) -> u64 {
        self.regs.rsp
    }

    /// Transfer control from the running thread to the thread saved in `new`.
    /// Returns when some later switch targets `old` again.
    ///
    /// # Safety
    /// - `old` must be the save area of the thread executing this call
    /// - `new` must come from `fabricate` over a still-allocated stack, or from
    ///   an earlier switch away from a thread whose stack is still allocated
    /// - both save areas must stay at the same address until they are
    ///   switched into again
    #[inline(never)]
    pub unsafe fn switch(old: *mut Context, new: *const Context) {
        arch::switch(ptr::addr_of_mut!((*old).regs), ptr::addr_of!((*new).regs));
    }
}
