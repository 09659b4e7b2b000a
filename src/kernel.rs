/*!
 * Kernel
 *
 * Owns the process table, the clock, the machine collaborator and one
 * dispatch context per CPU. `Kernel` is the handle for code outside any
 * process: boot, drive the scheduler, deliver timer interrupts, inspect.
 */

use crate::core::config::SchedConfig;
use crate::core::errors::{ConfigError, ProcResult};
use crate::core::types::{CpuId, Pid, Priority, Tick};
use crate::process::control::render_table;
use crate::process::machine::{HostMachine, Machine};
use crate::process::proc::Proc;
use crate::process::table::{ProcessTable, TableInner};
use crate::process::types::{Channel, ProcState, ProcessRecord};
use crate::scheduler::atomic_stats::AtomicSchedStats;
use crate::scheduler::{Cpu, Policy, SchedStats};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{info, warn};

/// Global tick counter, advanced only by the timer interrupt
#[derive(Debug, Default)]
pub(crate) struct Clock {
    ticks: AtomicU64,
}

impl Clock {
    #[inline]
    pub fn now(&self) -> Tick {
        self.ticks.load(Ordering::Acquire)
    }

    #[inline]
    fn advance(&self) -> Tick {
        self.ticks.fetch_add(1, Ordering::AcqRel) + 1
    }
}

pub(crate) struct Shared {
    pub table: ProcessTable,
    pub clock: Clock,
    pub config: SchedConfig,
    pub machine: Arc<dyn Machine>,
    pub cpus: Vec<Cpu>,
    pub stats: AtomicSchedStats,
    halted: AtomicBool,
}

impl Shared {
    /// Timer interrupt: one tick elapses for every process
    pub(crate) fn clock_interrupt(&self) -> Tick {
        let mut table = self.table.lock();
        self.tick(&mut table)
    }

    /// Timer interrupt taken by an idle CPU
    ///
    /// Skipped while any process is RUNNING: that process raises its own
    /// ticks, and an extra one here would be charged to it as run time.
    pub(crate) fn idle_interrupt(&self) -> Option<Tick> {
        let mut table = self.table.lock();
        if table.iter().any(|(_, p)| p.state == ProcState::Running) {
            return None;
        }
        Some(self.tick(&mut table))
    }

    fn tick(&self, table: &mut TableInner) -> Tick {
        let now = self.clock.advance();
        table.update_times(now);
        table.wakeup(Channel::TICKS, now);
        now
    }

    #[inline]
    pub(crate) fn is_halted(&self) -> bool {
        self.halted.load(Ordering::Acquire)
    }

    /// Stop every CPU loop after its current round
    fn halt(&self) {
        if self.halted.swap(true, Ordering::AcqRel) {
            return;
        }
        info!("kernel halting");
    }

    fn abort_parked(&self) {
        let table = self.table.lock();
        for (_, p) in table.iter() {
            if matches!(p.state, ProcState::Unused | ProcState::Zombie) {
                continue;
            }
            if let Some(context) = &p.context {
                context.abort();
            }
        }
    }
}

/// Builder for Kernel
pub struct KernelBuilder {
    config: SchedConfig,
    machine: Option<Arc<dyn Machine>>,
}

impl KernelBuilder {
    pub fn new() -> Self {
        Self {
            config: SchedConfig::default(),
            machine: None,
        }
    }

    pub fn with_config(mut self, config: SchedConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_policy(mut self, policy: Policy) -> Self {
        self.config.policy = policy;
        self
    }

    pub fn with_cpus(mut self, ncpu: usize) -> Self {
        self.config.ncpu = ncpu;
        self
    }

    pub fn with_nproc(mut self, nproc: usize) -> Self {
        self.config.nproc = nproc;
        self
    }

    /// Use a custom machine collaborator instead of `HostMachine`
    pub fn with_machine(mut self, machine: Arc<dyn Machine>) -> Self {
        self.machine = Some(machine);
        self
    }

    pub fn build(self) -> Result<Kernel, ConfigError> {
        self.config.validate()?;
        let config = self.config;
        let machine = self
            .machine
            .unwrap_or_else(|| Arc::new(HostMachine::new()));
        let cpus = (0..config.ncpu).map(|id| Cpu::new(id, &config)).collect();

        info!(
            policy = %config.policy,
            nproc = config.nproc,
            ncpu = config.ncpu,
            "kernel built"
        );

        Ok(Kernel {
            shared: Arc::new(Shared {
                table: ProcessTable::new(config.nproc, config.policy),
                clock: Clock::default(),
                stats: AtomicSchedStats::new(config.policy),
                machine,
                cpus,
                config,
                halted: AtomicBool::new(false),
            }),
        })
    }
}

impl Default for KernelBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone)]
pub struct Kernel {
    pub(crate) shared: Arc<Shared>,
}

impl Kernel {
    pub fn builder() -> KernelBuilder {
        KernelBuilder::new()
    }

    pub fn new(config: SchedConfig) -> Result<Self, ConfigError> {
        KernelBuilder::new().with_config(config).build()
    }

    /// Create the root process, named `initcode`, running `init`
    ///
    /// # Panics
    /// If a root process already exists.
    pub fn boot<F>(&self, init: F) -> ProcResult<Pid>
    where
        F: FnOnce(&Proc) + Send + 'static,
    {
        self.shared.boot(init)
    }

    /// One selection round on `cpu`; the pid that ran, if any
    pub fn step(&self, cpu: CpuId) -> Option<Pid> {
        self.shared.schedule_once(cpu)
    }

    /// Like `step`, but an idle round lets one tick elapse when configured to
    pub fn step_or_idle(&self, cpu: CpuId) -> Option<Pid> {
        let ran = self.shared.schedule_once(cpu);
        if ran.is_none() && self.shared.config.idle_advances_clock {
            self.shared.idle_interrupt();
        }
        ran
    }

    /// Run every CPU's dispatch loop on its own thread
    pub fn start(&self) -> std::io::Result<SchedulerHandle> {
        let mut threads = Vec::with_capacity(self.shared.cpus.len());
        for cpu in 0..self.shared.cpus.len() {
            let shared = Arc::clone(&self.shared);
            let handle = thread::Builder::new()
                .name(format!("cpu-{cpu}"))
                .spawn(move || shared.scheduler_loop(cpu));
            match handle {
                Ok(handle) => threads.push(handle),
                Err(err) => {
                    warn!(cpu, error = %err, "failed to start scheduler thread");
                    let partial = SchedulerHandle {
                        kernel: self.clone(),
                        threads,
                    };
                    partial.shutdown();
                    return Err(err);
                }
            }
        }
        Ok(SchedulerHandle {
            kernel: self.clone(),
            threads,
        })
    }

    /// Deliver one timer interrupt from outside any process
    pub fn clock_interrupt(&self) -> Tick {
        self.shared.clock_interrupt()
    }

    #[inline]
    pub fn now(&self) -> Tick {
        self.shared.clock.now()
    }

    /// Wake every process sleeping on `chan`; returns how many woke
    pub fn wakeup(&self, chan: Channel) -> usize {
        self.shared.wakeup(chan)
    }

    /// Change a priority without yielding; returns the previous value
    pub fn set_priority(&self, new_priority: i32, pid: Pid) -> ProcResult<Priority> {
        self.shared.set_priority(new_priority, pid)
    }

    pub fn kill(&self, pid: Pid) -> ProcResult<()> {
        self.shared.kill(pid)
    }

    pub fn list_processes(&self) -> Vec<ProcessRecord> {
        self.shared.list_processes()
    }

    pub fn process(&self, pid: Pid) -> Option<ProcessRecord> {
        self.shared.process(pid)
    }

    /// ps-style rendering of the current table
    pub fn render(&self) -> String {
        render_table(&self.list_processes())
    }

    /// Log one line per live process
    pub fn dump(&self) {
        self.shared.dump();
    }

    pub fn stats(&self) -> SchedStats {
        self.shared.stats.snapshot()
    }

    #[inline]
    pub fn policy(&self) -> Policy {
        self.shared.config.policy
    }

    #[inline]
    pub fn config(&self) -> &SchedConfig {
        &self.shared.config
    }

    /// Halt the kernel and unwind every parked process thread
    ///
    /// Only call this when no CPU is mid-dispatch: after `step` returned, or
    /// through `SchedulerHandle::shutdown`.
    pub fn shutdown(&self) {
        self.shared.halt();
        self.shared.abort_parked();
    }
}

/// Running per-CPU scheduler threads
pub struct SchedulerHandle {
    kernel: Kernel,
    threads: Vec<JoinHandle<()>>,
}

impl SchedulerHandle {
    pub fn kernel(&self) -> &Kernel {
        &self.kernel
    }

    /// Stop the loops, wait for them, then unwind the process threads
    pub fn shutdown(self) {
        self.kernel.shared.halt();
        for handle in self.threads {
            if handle.join().is_err() {
                warn!("scheduler thread panicked");
            }
        }
        self.kernel.shared.abort_parked();
    }
}
