/*!
 * Control Surface
 * Priority changes, process listings and diagnostic dumps
 */

use super::types::ProcessRecord;
use crate::core::errors::{ProcError, ProcResult};
use crate::core::limits::{MAX_PRIORITY, MIN_PRIORITY, NQUEUE};
use crate::core::types::{Pid, Priority};
use crate::kernel::Shared;
use tracing::info;

impl Shared {
    /// Replace `pid`'s static priority; returns the previous value
    pub(crate) fn set_priority(&self, new_priority: i32, pid: Pid) -> ProcResult<Priority> {
        if !(MIN_PRIORITY..=MAX_PRIORITY).contains(&new_priority) {
            return Err(ProcError::InvalidPriority(new_priority));
        }
        let new = Priority::try_from(new_priority)
            .map_err(|_| ProcError::InvalidPriority(new_priority))?;

        let mut table = self.table.lock();
        let slot = table.find(pid).ok_or(ProcError::NoSuchProcess(pid))?;
        let old = std::mem::replace(&mut table.pcb_mut(slot).sched.priority, new);
        info!(pid, old, new, "priority changed");
        Ok(old)
    }

    /// Snapshot of every live process in slot order
    pub(crate) fn list_processes(&self) -> Vec<ProcessRecord> {
        let table = self.table.lock();
        let feedback = table.policy.is_feedback();
        table
            .iter()
            .filter(|(_, p)| p.state.is_live())
            .map(|(_, p)| p.record(feedback))
            .collect()
    }

    pub(crate) fn process(&self, pid: Pid) -> Option<ProcessRecord> {
        let table = self.table.lock();
        let feedback = table.policy.is_feedback();
        table.find(pid).map(|slot| table.pcb(slot).record(feedback))
    }

    /// Log one line per live process
    pub(crate) fn dump(&self) {
        let table = self.table.lock();
        info!(
            tick = self.clock.now(),
            next_pid = table.next_pid(),
            policy = %table.policy,
            "procdump"
        );
        for (slot, p) in table.iter().filter(|(_, p)| p.state.is_live()) {
            info!(
                slot = %slot,
                pid = p.pid,
                state = %p.state,
                name = %p.name,
                chan = p.chan.map(|c| c.raw()),
                "procdump"
            );
        }
    }
}

/// Render records as a ps-style table
///
/// Feedback columns are included when any record carries them.
pub fn render_table(records: &[ProcessRecord]) -> String {
    let feedback = records.iter().any(|r| r.feedback.is_some());

    let mut header = format!(
        "{:<6}{:<10}{:<10}{:<8}{:<8}{:<7}",
        "PID", "Priority", "State", "r_time", "w_time", "n_run"
    );
    if feedback {
        header.push_str(&format!("{:<7}", "cur_q"));
        for level in 0..NQUEUE {
            header.push_str(&format!("{:<6}", format!("q{level}")));
        }
    }

    let mut out = String::new();
    push_line(&mut out, &header);
    for record in records {
        let mut line = format!(
            "{:<6}{:<10}{:<10}{:<8}{:<8}{:<7}",
            record.pid,
            record.priority,
            record.state.label(),
            record.run_ticks,
            record.wait_ticks,
            record.run_count
        );
        if let Some(fb) = &record.feedback {
            line.push_str(&format!("{:<7}", fb.queue));
            for ticks in fb.queue_ticks {
                line.push_str(&format!("{ticks:<6}"));
            }
        }
        push_line(&mut out, &line);
    }
    out
}

fn push_line(out: &mut String, line: &str) {
    out.push_str(line.trim_end_matches(' '));
    out.push('\n');
}
