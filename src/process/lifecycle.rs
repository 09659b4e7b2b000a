/*!
 * Process Lifecycle
 *
 * Boot, fork, exit, wait and kill. Slot claims and state changes happen under
 * the table lock; duplicating or releasing machine resources happens outside
 * it.
 */

use super::context::{Aborted, Context};
use super::pcb::Resources;
use super::proc::{ExitRequest, Proc};
use super::table::TableGuard;
use super::types::{Channel, ProcState, WaitStatus};
use crate::core::errors::{ProcError, ProcResult};
use crate::core::limits::{NOFILE, ROOT_DIRECTORY, ROOT_PROCESS_NAME};
use crate::core::types::{Pid, Slot};
use crate::kernel::Shared;
use crate::monitoring::tracer::process_span;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, info, warn};

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg
    } else {
        "unknown fault"
    }
}

/// First code a new process runs, entered with the scheduler's table lock
fn process_entry<F>(
    shared: Arc<Shared>,
    slot: Slot,
    pid: Pid,
    name: String,
    body: F,
) -> impl FnOnce(TableGuard) + Send + 'static
where
    F: FnOnce(&Proc) + Send + 'static,
{
    move |held| {
        drop(held);
        let span = process_span(pid, &name);
        let _entered = span.enter();
        let proc = Proc::new(shared, slot, pid);

        match panic::catch_unwind(AssertUnwindSafe(|| body(&proc))) {
            Ok(()) => {}
            Err(payload) if payload.is::<ExitRequest>() => {}
            Err(payload) if payload.is::<Aborted>() => return,
            Err(payload) => {
                warn!(pid, fault = panic_message(payload.as_ref()), "process faulted");
            }
        }
        proc.shared.exit(slot);
    }
}

impl Shared {
    /// Create the root process
    pub(crate) fn boot<F>(self: &Arc<Self>, body: F) -> ProcResult<Pid>
    where
        F: FnOnce(&Proc) + Send + 'static,
    {
        let now = self.clock.now();
        let (slot, pid) = {
            let mut table = self.table.lock();
            if table.root.is_some() {
                panic!("boot: root process already exists");
            }
            let slot = table.allocate(now, self.config.default_priority)?;
            table.root = Some(slot);
            (slot, table.pcb(slot).pid)
        };

        let resources = match self.root_resources() {
            Ok(resources) => resources,
            Err(err) => {
                let mut table = self.table.lock();
                table.release(slot);
                table.root = None;
                return Err(err);
            }
        };

        info!(pid, "booting {}", ROOT_PROCESS_NAME);
        self.install(slot, pid, ROOT_PROCESS_NAME.to_string(), None, resources, body)
    }

    fn root_resources(&self) -> ProcResult<Resources> {
        let space = self.machine.create_space()?;
        let cwd = match self.machine.resolve_dir(ROOT_DIRECTORY) {
            Ok(cwd) => cwd,
            Err(err) => {
                self.machine.destroy_space(space);
                return Err(err.into());
            }
        };
        Ok(Resources {
            space: Some(space),
            files: [None; NOFILE],
            cwd: Some(cwd),
        })
    }

    /// Create a child of `parent` that runs `body`
    pub(crate) fn fork<F>(self: &Arc<Self>, parent: Slot, body: F) -> ProcResult<Pid>
    where
        F: FnOnce(&Proc) + Send + 'static,
    {
        let now = self.clock.now();
        let (slot, pid, name, inherited) = {
            let mut table = self.table.lock();
            let slot = table.allocate(now, self.config.default_priority)?;
            let p = table.pcb(parent);
            let inherited = (p.resources.space, p.resources.files, p.resources.cwd);
            let name = p.name.clone();
            (slot, table.pcb(slot).pid, name, inherited)
        };
        let (space, files, cwd) = inherited;

        let space = match space.map(|s| self.machine.duplicate_space(s)).transpose() {
            Ok(space) => space,
            Err(err) => {
                self.table.lock().release(slot);
                warn!(pid, error = %err, "fork: address space copy failed");
                return Err(err.into());
            }
        };
        let mut child_files = [None; NOFILE];
        for (fd, file) in files.iter().enumerate() {
            if let Some(file) = file {
                child_files[fd] = Some(self.machine.duplicate_file(*file));
            }
        }
        let resources = Resources {
            space,
            files: child_files,
            cwd: cwd.map(|dir| self.machine.duplicate_dir(dir)),
        };

        let pid = self.install(slot, pid, name, Some(parent), resources, body)?;
        self.stats.inc_forks();
        debug!(pid, parent = %parent, "forked");
        Ok(pid)
    }

    /// Give an EMBRYO slot its context and resources, then make it RUNNABLE
    fn install<F>(
        self: &Arc<Self>,
        slot: Slot,
        pid: Pid,
        name: String,
        parent: Option<Slot>,
        resources: Resources,
        body: F,
    ) -> ProcResult<Pid>
    where
        F: FnOnce(&Proc) + Send + 'static,
    {
        let entry = process_entry(Arc::clone(self), slot, pid, name.clone(), body);
        let context = match Context::spawn(format!("proc-{pid}-{name}"), entry) {
            Ok(context) => context,
            Err(err) => {
                self.table.lock().release(slot);
                self.release_resources(resources);
                return Err(err.into());
            }
        };

        let mut table = self.table.lock();
        let now = self.clock.now();
        let feedback = table.policy.is_feedback();
        let p = table.pcb_mut(slot);
        p.name = name;
        p.parent = parent;
        p.resources = resources;
        p.context = Some(context);
        p.state = ProcState::Runnable;
        if feedback {
            p.sched.home_queue = 0;
            p.enqueue(0, now);
        }
        Ok(pid)
    }

    /// Hand every machine resource in `resources` back to the machine
    pub(crate) fn release_resources(&self, resources: Resources) {
        if let Some(space) = resources.space {
            self.machine.destroy_space(space);
        }
        for file in resources.files.into_iter().flatten() {
            self.machine.close_file(file);
        }
        if let Some(dir) = resources.cwd {
            self.machine.release_dir(dir);
        }
    }

    /// Turn the process in `slot` into a ZOMBIE and give its CPU away
    ///
    /// Runs on the exiting process's own thread and never switches back.
    pub(crate) fn exit(&self, slot: Slot) {
        let (files, cwd) = {
            let mut table = self.table.lock();
            if table.root == Some(slot) {
                panic!("init exiting");
            }
            let p = table.pcb_mut(slot);
            (
                std::mem::take(&mut p.resources.files),
                p.resources.cwd.take(),
            )
        };
        for file in files.into_iter().flatten() {
            self.machine.close_file(file);
        }
        if let Some(dir) = cwd {
            self.machine.release_dir(dir);
        }

        let mut table = self.table.lock();
        let now = self.clock.now();

        let parent = table.pcb(slot).parent;
        if let Some(parent) = parent {
            table.wakeup(Channel::child_exit(parent), now);
        }

        let root = table.root;
        let mut zombie_orphan = false;
        for (_, p) in table.iter_mut() {
            if p.state.is_live() && p.parent == Some(slot) {
                p.parent = root;
                zombie_orphan |= p.state == ProcState::Zombie;
            }
        }
        if let Some(root) = root.filter(|_| zombie_orphan) {
            table.wakeup(Channel::child_exit(root), now);
        }

        let p = table.pcb_mut(slot);
        p.state = ProcState::Zombie;
        p.times.exited = now;
        let pid = p.pid;
        let Some(cpu) = p.cpu else {
            panic!("exit: process {pid} is not on a CPU");
        };
        self.stats.inc_exits();
        debug!(pid, tick = now, "exited");

        Context::hand_off(&self.cpus[cpu].context, table);
    }

    pub(crate) fn kill(&self, pid: Pid) -> ProcResult<()> {
        let mut table = self.table.lock();
        let slot = table.find(pid).ok_or(ProcError::NoSuchProcess(pid))?;
        let now = self.clock.now();
        table.pcb_mut(slot).killed = true;
        if table.pcb(slot).state == ProcState::Sleeping {
            table.make_runnable(slot, now);
        }
        info!(pid, "killed");
        Ok(())
    }
}

impl Proc {
    /// Reap one ZOMBIE child, sleeping until one exists
    pub fn wait(&self) -> ProcResult<Pid> {
        self.wait_with_timing().map(|status| status.pid)
    }

    /// Like `wait`, also reporting the child's waiting and running ticks
    pub fn wait_with_timing(&self) -> ProcResult<WaitStatus> {
        let mut table = self.shared.table.lock();
        loop {
            let mut have_children = false;
            let mut zombie = None;
            for (slot, p) in table.iter() {
                if !p.state.is_live() || p.parent != Some(self.slot) {
                    continue;
                }
                have_children = true;
                if p.state == ProcState::Zombie {
                    zombie = Some(slot);
                    break;
                }
            }

            if let Some(child) = zombie {
                let pcb = table.release(child);
                drop(table);

                let status = WaitStatus {
                    pid: pcb.pid,
                    wait_ticks: pcb.times.waited(),
                    run_ticks: pcb.times.run,
                };
                self.shared.release_resources(pcb.resources);
                self.shared.stats.inc_reaped();
                debug!(pid = status.pid, parent = self.pid, "reaped");
                return Ok(status);
            }

            if !have_children {
                return Err(ProcError::NoChildren);
            }
            if table.pcb(self.slot).killed {
                return Err(ProcError::Interrupted);
            }
            table = self.sleep(Channel::child_exit(self.slot), table);
        }
    }
}
