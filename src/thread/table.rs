/*!
 * Thread Table
 * Fixed-capacity slot array with the round-robin ready scan
 */

use super::tcb::Tcb;
use crate::context::Context;
use crate::core::errors::{Result, SchedulerError};
use crate::core::types::{SlotId, ThreadState, BOOTSTRAP_SLOT};
use std::ops::{Index, IndexMut};

/// Result of scanning for the next ready slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scan {
    Found(SlotId),
    /// No other slot is ready; `waiting` counts blocked and suspended slots,
    /// the scanning slot included.
    Idle { waiting: usize },
}

/// Fixed array of control blocks. Slot 0 is the bootstrap thread.
///
/// The slice is allocated once and never resized, so saved contexts keep
/// their addresses for the table's lifetime.
#[derive(Debug)]
pub struct ThreadTable {
    slots: Box<[Tcb]>,
}

impl ThreadTable {
    pub fn new(capacity: usize, bootstrap_quota: u32) -> Self {
        let slots = (0..capacity)
            .map(|id| {
                if id == BOOTSTRAP_SLOT {
                    Tcb::bootstrap(id, bootstrap_quota)
                } else {
                    Tcb::unused(id)
                }
            })
            .collect();
        Self { slots }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Any slot, whatever its state
    #[inline]
    pub fn slot(&self, id: SlotId) -> Option<&Tcb> {
        self.slots.get(id)
    }

    #[inline]
    pub(crate) fn slot_mut(&mut self, id: SlotId) -> Option<&mut Tcb> {
        self.slots.get_mut(id)
    }

    /// A live slot; `InvalidSlot` when out of range or unused
    pub fn get(&self, id: SlotId) -> Result<&Tcb> {
        self.slots
            .get(id)
            .filter(|tcb| tcb.state().is_live())
            .ok_or(SchedulerError::InvalidSlot(id))
    }

    pub(crate) fn get_mut(&mut self, id: SlotId) -> Result<&mut Tcb> {
        self.slots
            .get_mut(id)
            .filter(|tcb| tcb.state().is_live())
            .ok_or(SchedulerError::InvalidSlot(id))
    }

    /// Lowest-numbered unused slot above the bootstrap slot
    pub fn first_unused(&self) -> Option<SlotId> {
        self.slots
            .iter()
            .skip(BOOTSTRAP_SLOT + 1)
            .find(|tcb| tcb.state() == ThreadState::Unused)
            .map(Tcb::id)
    }

    /// Look for the next ready slot after `current`, wrapping around and
    /// never selecting `current` itself.
    pub fn scan_ready(&self, current: SlotId) -> Scan {
        let n = self.slots.len();
        let mut waiting = usize::from(self.slots[current].state().is_waiting());

        for step in 1..n {
            let id = (current + step) % n;
            match self.slots[id].state() {
                ThreadState::Ready => return Scan::Found(id),
                ThreadState::Blocked | ThreadState::Suspended => waiting += 1,
                ThreadState::Unused | ThreadState::Running => {}
            }
        }
        Scan::Idle { waiting }
    }

    /// Age every slot's delay by one tick. Returns the number of threads woken.
    pub(crate) fn sweep_delays(&mut self) -> usize {
        self.slots.iter_mut().map(Tcb::age).filter(|&woke| woke).count()
    }

    /// Address of a slot's save area. Stable because the slice never moves.
    #[inline]
    pub(crate) fn context_ptr(&mut self, id: SlotId) -> *mut Context {
        &mut self.slots[id].context
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tcb> {
        self.slots.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Tcb> {
        self.slots.iter_mut()
    }

    /// Slots that are not unused
    pub fn live_count(&self) -> usize {
        self.slots.iter().filter(|tcb| tcb.state().is_live()).count()
    }

    /// Whether a later tick can make some slot ready without outside help.
    /// Only delayed threads wake on their own; a suspended one needs a
    /// running thread to resume it.
    pub fn can_wake(&self) -> bool {
        self.slots
            .iter()
            .any(|tcb| tcb.state() == ThreadState::Blocked)
    }
}

/// Panics on an out-of-range id; callers index with the current slot or an
/// id already checked by `get`.
impl Index<SlotId> for ThreadTable {
    type Output = Tcb;

    #[inline]
    fn index(&self, id: SlotId) -> &Tcb {
        &self.slots[id]
    }
}

impl IndexMut<SlotId> for ThreadTable {
    #[inline]
    fn index_mut(&mut self, id: SlotId) -> &mut Tcb {
        &mut self.slots[id]
    }
}
