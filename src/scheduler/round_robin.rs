/*!
 * Round-Robin Policy
 * Sweep the table in slot order, dispatching every RUNNABLE process once per sweep
 */

use super::{Policy, SchedPolicy};
use crate::core::types::Slot;
use crate::process::table::TableInner;

pub(crate) struct RoundRobin {
    /// First slot the current sweep has not visited yet
    cursor: usize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self { cursor: 0 }
    }
}

impl SchedPolicy for RoundRobin {
    fn kind(&self) -> Policy {
        Policy::RoundRobin
    }

    fn select_next(&mut self, table: &TableInner) -> Option<Slot> {
        let start = self.cursor.min(table.capacity());
        let found = table
            .runnable()
            .find(|(slot, _)| slot.index() >= start)
            // sweep finished, begin the next one
            .or_else(|| table.runnable().next())
            .map(|(slot, _)| slot)?;

        self.cursor = found.index() + 1;
        Some(found)
    }
}
