/*!
 * Tick Accounting
 *
 * Per-tick bookkeeping for every live process. These are the only writers of
 * the time-derived fields, and they run with the table lock held.
 */

use super::table::TableInner;
use super::types::ProcState;
use crate::core::types::{Slot, Tick};
use tracing::debug;

impl TableInner {
    /// Charge one elapsed tick to every process according to its state
    pub fn update_times(&mut self, now: Tick) {
        for (_, p) in self.iter_mut() {
            match p.state {
                ProcState::Running => p.times.run += 1,
                ProcState::Sleeping => {
                    p.times.io += 1;
                    p.sched.queue_wait += 1;
                    // sleeping forfeits a place in the FCFS order
                    p.sched.last_scheduled = now;
                }
                ProcState::Runnable => p.sched.queue_wait += 1,
                _ => {}
            }
        }
    }

    /// Charge the running process one tick of its current queue pass
    ///
    /// Returns the ticks consumed so far in this pass.
    pub fn charge_queue_tick(&mut self, slot: Slot) -> Tick {
        let sched = &mut self.pcb_mut(slot).sched;
        sched.slice_ticks += 1;
        sched.queue_ticks[usize::from(sched.home_queue)] += 1;
        sched.slice_ticks
    }

    /// Move a process one tier down; false when it is already at the bottom
    pub fn demote(&mut self, slot: Slot, now: Tick) -> bool {
        let p = self.pcb_mut(slot);
        let from = p.sched.home_queue;
        if !p.demote() {
            return false;
        }
        debug!(
            target: "proc_sched::queue",
            tick = now,
            pid = p.pid,
            from,
            to = p.sched.home_queue,
            "demoted"
        );
        true
    }
}
