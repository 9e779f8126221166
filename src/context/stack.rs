/*!
 * Green Thread Stacks
 * Fixed-size, exclusively owned stack regions with a bottom canary
 */

use crate::core::errors::{Result, SchedulerError};
use crate::core::limits::{STACK_ALIGN, STACK_CANARY};
use std::alloc::{self, Layout};
use std::fmt;
use std::ptr::NonNull;

/// A heap-allocated stack. The lowest eight bytes hold a canary that a
/// runaway thread overwrites before it reaches foreign memory.
pub struct Stack {
    base: NonNull<u8>,
    layout: Layout,
}

impl Stack {
    /// Allocate a zeroed stack of `size` bytes (rounded up to the ABI alignment)
    pub fn new(size: usize) -> Result<Self> {
        let rounded = size
            .checked_add(STACK_ALIGN - 1)
            .map(|s| s & !(STACK_ALIGN - 1))
            .ok_or(SchedulerError::AllocationFailed { size })?;
        let layout = Layout::from_size_align(rounded, STACK_ALIGN)
            .map_err(|_| SchedulerError::AllocationFailed { size })?;
        if layout.size() < 2 * std::mem::size_of::<u64>() {
            return Err(SchedulerError::AllocationFailed { size });
        }

        // SAFETY: layout has a non-zero size.
        let raw = unsafe { alloc::alloc_zeroed(layout) };
        let base = NonNull::new(raw).ok_or(SchedulerError::AllocationFailed { size })?;

        // SAFETY: base is valid for layout.size() bytes and 16-aligned.
        unsafe { base.as_ptr().cast::<u64>().write(STACK_CANARY) };

        Ok(Self { base, layout })
    }

    /// Usable size in bytes
    #[inline]
    pub fn size(&self) -> usize {
        self.layout.size()
    }

    /// One past the highest address, 16-byte aligned
    #[inline]
    pub(crate) fn top(&self) -> *mut u64 {
        // SAFETY: the offset stays within (one past) the allocation.
        unsafe { self.base.as_ptr().add(self.layout.size()).cast::<u64>() }
    }

    /// Whether the bottom canary still holds its original value
    #[inline]
    pub fn canary_intact(&self) -> bool {
        // SAFETY: base is valid and aligned for a u64 read.
        unsafe { self.base.as_ptr().cast::<u64>().read_volatile() == STACK_CANARY }
    }

    /// Whether `addr` lies inside this stack
    pub fn contains(&self, addr: usize) -> bool {
        let start = self.base.as_ptr() as usize;
        (start..start + self.layout.size()).contains(&addr)
    }
}

impl Drop for Stack {
    fn drop(&mut self) {
        // SAFETY: allocated in `new` with the same layout.
        unsafe { alloc::dealloc(self.base.as_ptr(), self.layout) };
    }
}

impl fmt::Debug for Stack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stack")
            .field("base", &self.base)
            .field("size", &self.layout.size())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stack_rounding_and_alignment() {
        let stack = Stack::new(16 * 1024 + 3).unwrap();
        assert_eq!(stack.size(), 16 * 1024 + 16);
        assert_eq!(stack.top() as usize % STACK_ALIGN, 0);
        assert!(stack.canary_intact());
    }

    #[test]
    fn test_canary_detects_overwrite() {
        let stack = Stack::new(4096).unwrap();
        unsafe { stack.base.as_ptr().write(0) };
        assert!(!stack.canary_intact());
    }

    #[test]
    fn test_impossible_size_fails() {
        assert_eq!(
            Stack::new(usize::MAX).unwrap_err(),
            SchedulerError::AllocationFailed { size: usize::MAX }
        );
    }

    #[test]
    fn test_contains() {
        let stack = Stack::new(4096).unwrap();
        let top = stack.top() as usize;
        assert!(stack.contains(top - 1));
        assert!(!stack.contains(top));
    }
}
