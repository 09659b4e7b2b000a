/*!
 * Process Table
 *
 * Fixed-capacity arena of process control blocks behind one lock. Every read
 * or write of process state goes through `TableInner`, which can only be
 * reached through a `TableGuard`, so holding the lock is enforced by types.
 */

use super::pcb::Pcb;
use super::types::ProcState;
use crate::core::errors::{ProcError, ProcResult};
use crate::core::types::{Pid, Priority, Slot, Tick};
use crate::scheduler::Policy;
use parking_lot::lock_api::ArcMutexGuard;
use parking_lot::{Mutex, RawMutex};
use std::sync::Arc;

/// Owned guard of the table lock
///
/// `Send`, so the lock can stay held across a context switch and be released
/// by whichever flow resumes.
pub(crate) type TableGuard = ArcMutexGuard<RawMutex, TableInner>;

pub(crate) struct ProcessTable {
    inner: Arc<Mutex<TableInner>>,
}

impl ProcessTable {
    pub fn new(nproc: usize, policy: Policy) -> Self {
        Self {
            inner: Arc::new(Mutex::new(TableInner::new(nproc, policy))),
        }
    }

    #[inline]
    pub fn lock(&self) -> TableGuard {
        self.inner.lock_arc()
    }
}

pub(crate) struct TableInner {
    slots: Vec<Pcb>,
    next_pid: Pid,
    pub root: Option<Slot>,
    pub policy: Policy,
}

impl TableInner {
    pub fn new(nproc: usize, policy: Policy) -> Self {
        Self {
            slots: (0..nproc).map(|_| Pcb::default()).collect(),
            next_pid: 1,
            root: None,
            policy,
        }
    }

    /// Claim the first UNUSED slot as EMBRYO with the next pid
    pub fn allocate(&mut self, now: Tick, priority: Priority) -> ProcResult<Slot> {
        let index = self
            .slots
            .iter()
            .position(|p| p.state == ProcState::Unused)
            .ok_or_else(|| {
                ProcError::AllocFailure(format!("no free slot among {}", self.slots.len()))
            })?;

        let pid = self.next_pid;
        self.next_pid += 1;
        self.slots[index].init_embryo(pid, now, priority);
        Ok(Slot(index))
    }

    /// Return a slot to UNUSED, handing back whatever it still owned
    pub fn release(&mut self, slot: Slot) -> Pcb {
        std::mem::take(&mut self.slots[slot.0])
    }

    pub fn find(&self, pid: Pid) -> Option<Slot> {
        if pid == 0 {
            return None;
        }
        self.slots
            .iter()
            .position(|p| p.state.is_live() && p.pid == pid)
            .map(Slot)
    }

    #[inline]
    pub fn pcb(&self, slot: Slot) -> &Pcb {
        &self.slots[slot.0]
    }

    #[inline]
    pub fn pcb_mut(&mut self, slot: Slot) -> &mut Pcb {
        &mut self.slots[slot.0]
    }

    /// All slots in slot order
    pub fn iter(&self) -> impl Iterator<Item = (Slot, &Pcb)> + '_ {
        self.slots.iter().enumerate().map(|(i, p)| (Slot(i), p))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Slot, &mut Pcb)> + '_ {
        self.slots.iter_mut().enumerate().map(|(i, p)| (Slot(i), p))
    }

    /// RUNNABLE slots in slot order
    pub fn runnable(&self) -> impl Iterator<Item = (Slot, &Pcb)> + '_ {
        self.iter().filter(|(_, p)| p.state == ProcState::Runnable)
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn next_pid(&self) -> Pid {
        self.next_pid
    }

    /// Flip a process to RUNNABLE, clearing its channel and re-queueing it
    /// into its tier under the feedback policy
    pub fn make_runnable(&mut self, slot: Slot, now: Tick) {
        let feedback = self.policy.is_feedback();
        let p = &mut self.slots[slot.0];
        p.state = ProcState::Runnable;
        p.chan = None;
        if feedback {
            p.requeue_home(now);
        }
    }
}
