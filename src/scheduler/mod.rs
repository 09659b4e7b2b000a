/*!
 * Scheduler Module
 *
 * Per-CPU selection policies and the dispatch loop. Exactly one policy is
 * chosen at startup; every CPU gets its own instance so policy cursors never
 * need the table lock to be shared beyond a selection round.
 */

pub mod atomic_stats;
mod cpu;
mod fcfs;
mod feedback;
mod priority;
mod round_robin;
pub mod types;

pub(crate) use cpu::Cpu;
pub use types::{Policy, SchedStats};

use crate::core::config::SchedConfig;
use crate::core::types::{Slot, Tick};
use crate::process::pcb::Pcb;
use crate::process::table::TableInner;

/// Selection capability shared by all four policies
///
/// Every method runs with the table lock held.
pub(crate) trait SchedPolicy: Send {
    fn kind(&self) -> Policy;

    /// Housekeeping before each selection; returns the number of promotions
    fn prepare(&mut self, _table: &mut TableInner, _now: Tick) -> u64 {
        0
    }

    /// Pick at most one RUNNABLE slot
    fn select_next(&mut self, table: &TableInner) -> Option<Slot>;

    /// Called on the chosen process just before it is marked RUNNING
    fn on_dispatch(&mut self, _pcb: &mut Pcb, _now: Tick) {}

    /// Called once the process has handed the processor back
    fn after_dispatch(&mut self, _pcb: &mut Pcb, _now: Tick) {}
}

/// Instantiate the configured policy for one CPU
pub(crate) fn build(config: &SchedConfig) -> Box<dyn SchedPolicy> {
    match config.policy {
        Policy::RoundRobin => Box::new(round_robin::RoundRobin::new()),
        Policy::Fcfs => Box::new(fcfs::Fcfs),
        Policy::Priority => Box::new(priority::StaticPriority::new()),
        Policy::Feedback => Box::new(feedback::FeedbackQueue::new(config.aging_thresholds)),
    }
}

/// What the timer trap decided for the process it interrupted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct TimerVerdict {
    pub yield_cpu: bool,
    pub demoted: bool,
}

/// Per-tick decision for the RUNNING process in `slot`
pub(crate) fn on_timer_tick(
    config: &SchedConfig,
    table: &mut TableInner,
    slot: Slot,
    now: Tick,
) -> TimerVerdict {
    match config.policy {
        Policy::RoundRobin | Policy::Priority => TimerVerdict {
            yield_cpu: true,
            demoted: false,
        },
        Policy::Fcfs => TimerVerdict::default(),
        Policy::Feedback => feedback::on_timer_tick(config, table, slot, now),
    }
}
