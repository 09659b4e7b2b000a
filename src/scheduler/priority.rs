/*!
 * Static-Priority Policy
 *
 * The numerically smallest priority wins. Processes sharing the best
 * priority rotate in slot order, so equals cannot starve one another.
 */

use super::{Policy, SchedPolicy};
use crate::core::types::{Priority, Slot};
use crate::process::table::TableInner;

/// Position within the rotation of one priority level
#[derive(Debug, Clone, Copy)]
struct Sweep {
    level: Priority,
    next: usize,
}

pub(crate) struct StaticPriority {
    sweep: Option<Sweep>,
}

impl StaticPriority {
    pub fn new() -> Self {
        Self { sweep: None }
    }
}

impl SchedPolicy for StaticPriority {
    fn kind(&self) -> Policy {
        Policy::Priority
    }

    fn select_next(&mut self, table: &TableInner) -> Option<Slot> {
        let best = table.runnable().map(|(_, p)| p.sched.priority).min()?;
        let start = match self.sweep {
            Some(sweep) if sweep.level == best => sweep.next,
            _ => 0,
        };

        let at_best = || {
            table
                .runnable()
                .filter(move |(_, p)| p.sched.priority == best)
                .map(|(slot, _)| slot)
        };
        let found = at_best()
            .find(|slot| slot.index() >= start)
            .or_else(|| at_best().next())?;

        self.sweep = Some(Sweep {
            level: best,
            next: found.index() + 1,
        });
        Some(found)
    }
}
