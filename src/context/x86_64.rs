/*!
 * x86-64 Context Switch (System V ABI)
 *
 * Both routines take `rdi = *mut Context` (save area of the running thread)
 * and `rsi = *const Context` (save area of the target) and finish with `ret`,
 * which lands either after the target's own switch call or, for a fresh
 * thread, on the start trampoline planted by `fabricate`.
 */

use std::arch::global_asm;

/// Saved registers, cooperative build. Everything not listed is
/// caller-saved and already spilled by the compiler at the call site.
#[cfg(not(feature = "preemptive"))]
#[repr(C)]
#[derive(Debug, Default, Clone, Copy)]
pub struct Registers {
    pub rsp: u64,
    pub rbp: u64,
    pub r15: u64,
    pub r14: u64,
    pub r13: u64,
    pub r12: u64,
    pub rbx: u64,
}

/// Saved registers, preemptive build. The remaining callee-saved registers
/// and the MXCSR / x87 control words are pushed onto the thread's own stack;
/// everything else live at an asynchronous interruption sits in the kernel's
/// signal frame on that same stack.
#[cfg(feature = "preemptive")]
#[repr(C)]
#[derive(Debug, Default, Clone, Copy)]
pub struct Registers {
    pub rsp: u64,
    pub rbp: u64,
}

/// Default MXCSR (all exceptions masked, round to nearest)
#[cfg(feature = "preemptive")]
const DEFAULT_MXCSR: u64 = 0x1f80;

/// Default x87 control word
#[cfg(feature = "preemptive")]
const DEFAULT_FPU_CW: u64 = 0x037f;

#[cfg(not(feature = "preemptive"))]
global_asm!(
    ".text",
    ".global gthreads_switch_cooperative",
    ".p2align 4",
    "gthreads_switch_cooperative:",
    "mov [rdi + 0x00], rsp",
    "mov [rdi + 0x08], rbp",
    "mov [rdi + 0x10], r15",
    "mov [rdi + 0x18], r14",
    "mov [rdi + 0x20], r13",
    "mov [rdi + 0x28], r12",
    "mov [rdi + 0x30], rbx",
    "mov rsp, [rsi + 0x00]",
    "mov rbp, [rsi + 0x08]",
    "mov r15, [rsi + 0x10]",
    "mov r14, [rsi + 0x18]",
    "mov r13, [rsi + 0x20]",
    "mov r12, [rsi + 0x28]",
    "mov rbx, [rsi + 0x30]",
    "ret",
);

#[cfg(feature = "preemptive")]
global_asm!(
    ".text",
    ".global gthreads_switch_preemptive",
    ".p2align 4",
    "gthreads_switch_preemptive:",
    "push rbx",
    "push r12",
    "push r13",
    "push r14",
    "push r15",
    "sub rsp, 8",
    "stmxcsr dword ptr [rsp]",
    "fnstcw word ptr [rsp + 4]",
    "mov [rdi + 0x00], rsp",
    "mov [rdi + 0x08], rbp",
    "mov rsp, [rsi + 0x00]",
    "mov rbp, [rsi + 0x08]",
    "ldmxcsr dword ptr [rsp]",
    "fldcw word ptr [rsp + 4]",
    "add rsp, 8",
    "pop r15",
    "pop r14",
    "pop r13",
    "pop r12",
    "pop rbx",
    "ret",
);

extern "C" {
    #[cfg(not(feature = "preemptive"))]
    fn gthreads_switch_cooperative(old: *mut Registers, new: *const Registers);

    #[cfg(feature = "preemptive")]
    fn gthreads_switch_preemptive(old: *mut Registers, new: *const Registers);
}

/// Save the running context into `old` and resume `new`.
///
/// # Safety
/// `old` must be writable, and `new` must hold a context produced either by
/// an earlier switch away from a still-live stack or by [`initial_frame`].
#[inline(always)]
pub(super) unsafe fn switch(old: *mut Registers, new: *const Registers) {
    #[cfg(not(feature = "preemptive"))]
    gthreads_switch_cooperative(old, new);
    #[cfg(feature = "preemptive")]
    gthreads_switch_preemptive(old, new);
}

/// push_stack builds a new thread's stack one value at a time; the values
/// are popped again by the switch routine on the first dispatch.
#[inline(always)]
unsafe fn push_stack(mut rsp: *mut u64, value: u64) -> *mut u64 {
    rsp = rsp.sub(1);
    rsp.write(value);
    rsp
}

/// Lay out the first frame below `top` so that the switch routine "returns"
/// into `start`, and a return from `start` lands in `on_return`.
///
/// # Safety
/// `top` must be 16-byte aligned and have at least 64 writable bytes below it.
pub(super) unsafe fn initial_frame(top: *mut u64, start: u64, on_return: u64) -> Registers {
    // At entry to `start` rsp points at `on_return`, i.e. rsp % 16 == 8,
    // exactly as after a `call`.
    let mut rsp = push_stack(top, on_return);
    rsp = push_stack(rsp, start);

    #[cfg(feature = "preemptive")]
    {
        // rbx, r12, r13, r14, r15
        for _ in 0..5 {
            rsp = push_stack(rsp, 0);
        }
        rsp = push_stack(rsp, DEFAULT_MXCSR | (DEFAULT_FPU_CW << 32));
    }

    Registers {
        rsp: rsp as u64,
        ..Registers::default()
    }
}
