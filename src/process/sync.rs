/*!
 * Sleep and Wakeup
 *
 * Channel-keyed blocking. A sleeper records its channel and gives up the CPU
 * while the table lock stays held, so a wakeup issued under the lock can
 * never slip in between the check and the sleep.
 */

use super::proc::Proc;
use super::table::{TableGuard, TableInner};
use super::types::{Channel, ProcState};
use crate::core::errors::{ProcError, ProcResult};
use crate::core::types::{Slot, Tick};
use crate::kernel::Shared;

impl TableInner {
    /// Make every process sleeping on `chan` RUNNABLE; returns how many woke
    pub fn wakeup(&mut self, chan: Channel, now: Tick) -> usize {
        let mut woken = 0;
        for index in 0..self.capacity() {
            let slot = Slot(index);
            let p = self.pcb(slot);
            if p.state == ProcState::Sleeping && p.chan == Some(chan) {
                self.make_runnable(slot, now);
                woken += 1;
            }
        }
        woken
    }
}

impl Shared {
    pub(crate) fn wakeup(&self, chan: Channel) -> usize {
        let mut table = self.table.lock();
        let now = self.clock.now();
        table.wakeup(chan, now)
    }
}

impl Proc {
    /// Sleep on `chan`, entered and left with the table lock held
    pub(crate) fn sleep(&self, chan: Channel, mut table: TableGuard) -> TableGuard {
        let p = table.pcb_mut(self.slot);
        p.chan = Some(chan);
        p.state = ProcState::Sleeping;

        let mut table = self.sched(table);
        table.pcb_mut(self.slot).chan = None;
        table
    }

    /// Block until someone wakes `chan`
    ///
    /// Returns `Interrupted` if the process was killed before or while blocked.
    pub fn block_on(&self, chan: Channel) -> ProcResult<()> {
        let table = self.shared.table.lock();
        if table.pcb(self.slot).killed {
            return Err(ProcError::Interrupted);
        }
        let table = self.sleep(chan, table);
        if table.pcb(self.slot).killed {
            return Err(ProcError::Interrupted);
        }
        Ok(())
    }

    /// Sleep until `ticks` timer ticks have elapsed
    pub fn sleep_ticks(&self, ticks: Tick) -> ProcResult<()> {
        let mut table = self.shared.table.lock();
        let start = self.shared.clock.now();
        while self.shared.clock.now() - start < ticks {
            if table.pcb(self.slot).killed {
                return Err(ProcError::Interrupted);
            }
            table = self.sleep(Channel::TICKS, table);
        }
        Ok(())
    }

    /// Wake every process sleeping on `chan`
    pub fn wakeup(&self, chan: Channel) -> usize {
        self.shared.wakeup(chan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::Policy;

    #[test]
    fn test_wakeup_only_matching_sleepers() {
        let mut table = TableInner::new(4, Policy::RoundRobin);
        let chans = [Some(Channel::TICKS), Some(Channel::io(7)), Some(Channel::TICKS)];
        for chan in chans {
            let slot = table.allocate(0, 60).unwrap();
            let p = table.pcb_mut(slot);
            p.state = ProcState::Sleeping;
            p.chan = chan;
        }
        let runnable = table.allocate(0, 60).unwrap();
        table.pcb_mut(runnable).state = ProcState::Runnable;

        assert_eq!(table.wakeup(Channel::TICKS, 3), 2);
        assert_eq!(table.pcb(Slot(0)).state, ProcState::Runnable);
        assert_eq!(table.pcb(Slot(0)).chan, None);
        assert_eq!(table.pcb(Slot(1)).state, ProcState::Sleeping);
        assert_eq!(table.pcb(Slot(2)).state, ProcState::Runnable);

        assert_eq!(table.wakeup(Channel::io(8), 4), 0);
    }
}
