/*!
 * Multi-Level Feedback Queue Policy
 *
 * Five queues, 0 most favorable. Processes that exhaust their allotment sink
 * one queue; processes that wait past their queue's aging threshold rise one.
 * The bottom queue is served oldest-join first, the others in slot order.
 */

use super::{Policy, SchedPolicy, TimerVerdict};
use crate::core::config::SchedConfig;
use crate::core::limits::{BOTTOM_QUEUE, NQUEUE};
use crate::core::types::{Slot, Tick};
use crate::process::pcb::Pcb;
use crate::process::table::TableInner;
use crate::process::types::ProcState;
use tracing::debug;

pub(crate) struct FeedbackQueue {
    aging: [Tick; NQUEUE],
}

impl FeedbackQueue {
    pub fn new(aging: [Tick; NQUEUE]) -> Self {
        Self { aging }
    }
}

impl SchedPolicy for FeedbackQueue {
    fn kind(&self) -> Policy {
        Policy::Feedback
    }

    fn prepare(&mut self, table: &mut TableInner, now: Tick) -> u64 {
        let mut promoted = 0;
        for (_, p) in table.iter_mut() {
            if p.state != ProcState::Runnable {
                continue;
            }
            let Some(level) = p.sched.queue else {
                continue;
            };
            if p.sched.queue_wait < self.aging[usize::from(level)] {
                continue;
            }
            if p.promote(now) {
                debug!(
                    target: "proc_sched::queue",
                    tick = now,
                    pid = p.pid,
                    from = level,
                    to = level - 1,
                    "aged"
                );
                promoted += 1;
            }
        }
        promoted
    }

    fn select_next(&mut self, table: &TableInner) -> Option<Slot> {
        (0..=BOTTOM_QUEUE).find_map(|level| {
            let mut queued = table
                .runnable()
                .filter(|(_, p)| p.sched.queue == Some(level));
            let found = if level == BOTTOM_QUEUE {
                queued.min_by_key(|(slot, p)| (p.sched.queue_joined, *slot))
            } else {
                queued.next()
            };
            found.map(|(slot, _)| slot)
        })
    }

    fn on_dispatch(&mut self, pcb: &mut Pcb, _now: Tick) {
        pcb.sched.queue = None;
    }

    fn after_dispatch(&mut self, pcb: &mut Pcb, now: Tick) {
        match pcb.state {
            ProcState::Runnable => pcb.requeue_home(now),
            ProcState::Sleeping => {
                pcb.sched.slice_ticks = 0;
                pcb.sched.queue_wait = 0;
                pcb.sched.queue_joined = now;
            }
            _ => {}
        }
    }
}

/// Charge the running process and decide whether it keeps the processor
///
/// Exhausting the allotment demotes and yields; otherwise the process yields
/// only when something sits in a more favorable queue.
pub(crate) fn on_timer_tick(
    config: &SchedConfig,
    table: &mut TableInner,
    slot: Slot,
    now: Tick,
) -> TimerVerdict {
    let home = table.pcb(slot).sched.home_queue;
    let used = table.charge_queue_tick(slot);

    if used >= config.queue_allotments[usize::from(home)] {
        return TimerVerdict {
            yield_cpu: true,
            demoted: table.demote(slot, now),
        };
    }

    let better_waiting = table
        .runnable()
        .any(|(_, p)| p.sched.queue.is_some_and(|level| level < home));
    TimerVerdict {
        yield_cpu: better_waiting,
        demoted: false,
    }
}
