/*!
 * Process Handle
 *
 * What a process body sees of itself. Every method runs on the process's own
 * thread while it holds a CPU.
 */

use super::context::Context;
use super::machine::FileHandle;
use super::table::TableGuard;
use super::types::{ProcState, ProcessRecord};
use crate::core::errors::{ProcError, ProcResult};
use crate::core::types::{Pid, Priority, Slot, Tick};
use crate::kernel::{Kernel, Shared};
use crate::scheduler;
use std::fmt;
use std::panic;
use std::sync::Arc;
use tracing::trace;

/// Unwound through the body by `exit`, caught by the process entry
pub(crate) struct ExitRequest;

pub struct Proc {
    pub(crate) shared: Arc<Shared>,
    pub(crate) slot: Slot,
    pub(crate) pid: Pid,
}

impl Proc {
    pub(crate) fn new(shared: Arc<Shared>, slot: Slot, pid: Pid) -> Self {
        Self { shared, slot, pid }
    }

    #[inline]
    pub fn pid(&self) -> Pid {
        self.pid
    }

    /// Kernel handle, for inspection from inside a process
    pub fn kernel(&self) -> Kernel {
        Kernel {
            shared: Arc::clone(&self.shared),
        }
    }

    #[inline]
    pub fn now(&self) -> Tick {
        self.shared.clock.now()
    }

    /// Whether another process has asked this one to terminate
    pub fn killed(&self) -> bool {
        self.shared.table.lock().pcb(self.slot).killed
    }

    /// Create a child running `body`; returns the child's pid
    pub fn fork<F>(&self, body: F) -> ProcResult<Pid>
    where
        F: FnOnce(&Proc) + Send + 'static,
    {
        self.shared.fork(self.slot, body)
    }

    /// Terminate; never returns
    ///
    /// # Panics
    /// When called by the root process.
    pub fn exit(&self) -> ! {
        panic::resume_unwind(Box::new(ExitRequest))
    }

    /// Exit if killed; the safe point checked around every trap
    pub fn checkpoint(&self) {
        if self.killed() {
            self.exit();
        }
    }

    /// Give up the processor, staying RUNNABLE
    pub fn yield_now(&self) {
        self.shared.stats.inc_voluntary_yields();
        self.reschedule();
    }

    fn reschedule(&self) {
        let mut table = self.shared.table.lock();
        table.pcb_mut(self.slot).state = ProcState::Runnable;
        drop(self.sched(table));
    }

    /// Switch back to this CPU's scheduler, the lock held across the switch
    ///
    /// The caller must already have moved the process out of RUNNING.
    pub(crate) fn sched(&self, table: TableGuard) -> TableGuard {
        let p = table.pcb(self.slot);
        if p.state == ProcState::Running {
            panic!("sched: process {} is still RUNNING", self.pid);
        }
        let (Some(cpu), Some(own)) = (p.cpu, p.context.clone()) else {
            panic!("sched: process {} is not on a CPU", self.pid);
        };
        Context::switch(&own, &self.shared.cpus[cpu].context, table)
    }

    /// Timer trap taken while this process runs
    ///
    /// Checks the killed flag, lets the policy decide whether to keep the
    /// processor, and checks the flag again on the way out.
    pub fn on_timer(&self) {
        self.checkpoint();
        let verdict = {
            let mut table = self.shared.table.lock();
            let now = self.shared.clock.now();
            scheduler::on_timer_tick(&self.shared.config, &mut table, self.slot, now)
        };
        if verdict.demoted {
            self.shared.stats.inc_demotions();
        }
        if verdict.yield_cpu {
            trace!(pid = self.pid, "timer preemption");
            self.shared.stats.inc_timer_preemptions();
            self.reschedule();
        }
        self.checkpoint();
    }

    /// Compute for `ticks` timer ticks, taking the trap after each one
    pub fn run_for(&self, ticks: Tick) {
        for _ in 0..ticks {
            self.shared.clock_interrupt();
            self.on_timer();
        }
    }

    /// Change `pid`'s priority; returns the previous value
    ///
    /// Yields when the priority was lowered numerically, so the scheduler can
    /// re-evaluate right away.
    pub fn set_priority(&self, new_priority: i32, pid: Pid) -> ProcResult<Priority> {
        let old = self.shared.set_priority(new_priority, pid)?;
        if new_priority < i32::from(old) {
            self.yield_now();
        }
        Ok(old)
    }

    pub fn kill(&self, pid: Pid) -> ProcResult<()> {
        self.shared.kill(pid)
    }

    pub fn list_processes(&self) -> Vec<ProcessRecord> {
        self.shared.list_processes()
    }

    /// Install `file` at the lowest free descriptor
    pub fn install_file(&self, file: FileHandle) -> ProcResult<usize> {
        let mut table = self.shared.table.lock();
        let p = table.pcb_mut(self.slot);
        let fd = p
            .free_fd()
            .ok_or_else(|| ProcError::AllocFailure("descriptor table full".into()))?;
        p.resources.files[fd] = Some(file);
        Ok(fd)
    }

    /// Descriptors currently open, in descriptor order
    pub fn open_files(&self) -> Vec<(usize, FileHandle)> {
        let table = self.shared.table.lock();
        table
            .pcb(self.slot)
            .resources
            .files
            .iter()
            .enumerate()
            .filter_map(|(fd, file)| file.map(|f| (fd, f)))
            .collect()
    }
}

impl fmt::Debug for Proc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Proc")
            .field("pid", &self.pid)
            .field("slot", &self.slot)
            .finish()
    }
}
