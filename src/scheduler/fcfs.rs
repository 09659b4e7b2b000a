/*!
 * First-Come-First-Served Policy
 * Oldest last-scheduled timestamp wins; ties go to the lowest slot
 */

use super::{Policy, SchedPolicy};
use crate::core::types::{Slot, Tick};
use crate::process::pcb::Pcb;
use crate::process::table::TableInner;

pub(crate) struct Fcfs;

impl SchedPolicy for Fcfs {
    fn kind(&self) -> Policy {
        Policy::Fcfs
    }

    fn select_next(&mut self, table: &TableInner) -> Option<Slot> {
        table
            .runnable()
            .min_by_key(|(slot, p)| (p.sched.last_scheduled, *slot))
            .map(|(slot, _)| slot)
    }

    fn on_dispatch(&mut self, pcb: &mut Pcb, now: Tick) {
        pcb.sched.last_scheduled = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::types::ProcState;

    #[test]
    fn test_oldest_first_then_lowest_slot() {
        let mut table = TableInner::new(4, Policy::Fcfs);
        for stamp in [7, 3, 3, 1] {
            let slot = table.allocate(0, 60).unwrap();
            let p = table.pcb_mut(slot);
            p.state = ProcState::Runnable;
            p.sched.last_scheduled = stamp;
        }
        table.pcb_mut(Slot(3)).state = ProcState::Sleeping;

        let mut fcfs = Fcfs;
        assert_eq!(fcfs.select_next(&table), Some(Slot(1)));

        let p = table.pcb_mut(Slot(1));
        fcfs.on_dispatch(p, 12);
        assert_eq!(p.sched.last_scheduled, 12);
        assert_eq!(fcfs.select_next(&table), Some(Slot(2)));
    }
}
