/*!
 * Per-CPU Dispatch
 *
 * One selection round: lock, let the policy pick, switch into the chosen
 * process with the lock still held, and finish the round when it hands the
 * processor back.
 */

use super::{build, SchedPolicy};
use crate::core::config::SchedConfig;
use crate::core::types::{CpuId, Pid};
use crate::kernel::Shared;
use crate::process::context::Context;
use crate::process::types::ProcState;
use parking_lot::Mutex;
use std::thread;
use tracing::{debug, info};

pub(crate) struct Cpu {
    pub id: CpuId,
    /// Where processes switch to when they give up this CPU
    pub context: Context,
    policy: Mutex<Box<dyn SchedPolicy>>,
}

impl Cpu {
    pub fn new(id: CpuId, config: &SchedConfig) -> Self {
        Self {
            id,
            context: Context::new(),
            policy: Mutex::new(build(config)),
        }
    }
}

impl Shared {
    /// Run one selection round on `cpu_id`
    ///
    /// Returns the pid that ran, or `None` when nothing was RUNNABLE.
    pub(crate) fn schedule_once(&self, cpu_id: CpuId) -> Option<Pid> {
        let cpu = &self.cpus[cpu_id];
        let mut policy = cpu.policy.lock();
        let mut table = self.table.lock();
        let now = self.clock.now();

        let promoted = policy.prepare(&mut table, now);
        self.stats.add_promotions(promoted);

        let Some(slot) = policy.select_next(&table) else {
            self.stats.inc_idle_polls();
            return None;
        };

        let p = table.pcb_mut(slot);
        if p.state != ProcState::Runnable {
            panic!("scheduler: selected {} in state {}", p.pid, p.state);
        }
        let Some(context) = p.context.clone() else {
            panic!("scheduler: process {} has no context", p.pid);
        };
        p.sched.run_count += 1;
        policy.on_dispatch(p, now);
        p.state = ProcState::Running;
        p.cpu = Some(cpu.id);
        let pid = p.pid;
        let space = p.resources.space;

        debug!(cpu = cpu.id, pid, tick = now, policy = %policy.kind(), "dispatch");
        self.stats.inc_dispatches();

        if let Some(space) = space {
            self.machine.activate(space);
        }
        let mut table = Context::switch(&cpu.context, &context, table);
        self.machine.activate_kernel();

        let now = self.clock.now();
        let p = table.pcb_mut(slot);
        if p.state == ProcState::Running {
            panic!("scheduler: process {pid} returned while still RUNNING");
        }
        p.cpu = None;
        policy.after_dispatch(p, now);
        Some(pid)
    }

    /// Dispatch loop for one CPU, until the kernel halts
    pub(crate) fn scheduler_loop(&self, cpu_id: CpuId) {
        info!(cpu = cpu_id, policy = %self.config.policy, "scheduler started");
        while !self.is_halted() {
            if self.schedule_once(cpu_id).is_none() {
                // cpu 0 is the timer source while the machine is idle
                if cpu_id == 0 && self.config.idle_advances_clock {
                    self.idle_interrupt();
                }
                thread::yield_now();
            }
        }
        info!(cpu = cpu_id, "scheduler stopped");
    }
}

#[cfg(test)]
mod tests {
    use crate::kernel::Kernel;
    use crate::process::machine::{AddressSpace, DirHandle, MockMachine};
    use crate::process::types::Channel;
    use mockall::{predicate::eq, Sequence};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    #[test]
    fn test_dispatch_switches_address_space_around_the_run() {
        let mut machine = MockMachine::new();
        let mut seq = Sequence::new();
        machine
            .expect_create_space()
            .returning(|| Ok(AddressSpace(7)));
        machine.expect_resolve_dir().returning(|_| Ok(DirHandle(1)));
        machine
            .expect_activate()
            .with(eq(AddressSpace(7)))
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());
        machine
            .expect_activate_kernel()
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());

        let kernel = Kernel::builder()
            .with_machine(Arc::new(machine))
            .build()
            .unwrap();
        kernel
            .boot(|init| loop {
                let _ = init.block_on(Channel::io(0));
            })
            .unwrap();

        assert_eq!(kernel.step(0), Some(1));
        assert_eq!(kernel.step(0), None);
        kernel.shutdown();
    }
}
