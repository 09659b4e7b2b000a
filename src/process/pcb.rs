/*!
 * Process Control Block
 * Per-slot record of identity, lifecycle state, scheduling metadata and timing
 */

use super::context::Context;
use super::machine::{AddressSpace, DirHandle, FileHandle};
use super::types::{Channel, FeedbackRecord, ProcState, ProcessRecord};
use crate::core::limits::{BOTTOM_QUEUE, NOFILE, NQUEUE};
use crate::core::types::{CpuId, Pid, Priority, QueueLevel, Slot, Tick};

/// Scheduling metadata, reset on every allocation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct SchedFields {
    pub priority: Priority,
    /// Queue the process sits in; `None` unless RUNNABLE under the feedback policy
    pub queue: Option<QueueLevel>,
    /// Tier the process belongs to, restored whenever it is re-queued
    pub home_queue: QueueLevel,
    pub queue_joined: Tick,
    /// Ticks consumed in the current pass through the queue
    pub slice_ticks: Tick,
    /// Ticks spent waiting since the process joined its queue
    pub queue_wait: Tick,
    /// Lifetime ticks consumed per queue
    pub queue_ticks: [Tick; NQUEUE],
    pub last_scheduled: Tick,
    pub run_count: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Times {
    pub created: Tick,
    pub exited: Tick,
    pub run: Tick,
    pub io: Tick,
}

impl Times {
    /// Ticks spent RUNNABLE over the whole lifetime
    pub fn waited(&self) -> i64 {
        self.exited as i64 - self.created as i64 - self.run as i64 - self.io as i64
    }
}

/// Handles owned by the process and released on exit or reap
#[derive(Debug, Default)]
pub(crate) struct Resources {
    pub space: Option<AddressSpace>,
    pub files: [Option<FileHandle>; NOFILE],
    pub cwd: Option<DirHandle>,
}

#[derive(Debug, Default)]
pub(crate) struct Pcb {
    pub pid: Pid,
    pub name: String,
    pub parent: Option<Slot>,
    pub state: ProcState,
    pub killed: bool,
    pub chan: Option<Channel>,
    /// CPU the process is running on, set at dispatch
    pub cpu: Option<CpuId>,
    pub context: Option<Context>,
    pub resources: Resources,
    pub sched: SchedFields,
    pub times: Times,
}

impl Pcb {
    /// Claim a free slot: EMBRYO with a fresh pid and zeroed accounting
    pub fn init_embryo(&mut self, pid: Pid, now: Tick, priority: Priority) {
        *self = Pcb::default();
        self.pid = pid;
        self.state = ProcState::Embryo;
        self.sched.priority = priority;
        self.sched.queue_joined = now;
        self.sched.last_scheduled = now;
        self.times.created = now;
    }

    /// Join `level` with fresh per-pass counters
    pub fn enqueue(&mut self, level: QueueLevel, now: Tick) {
        self.sched.queue = Some(level);
        self.sched.queue_joined = now;
        self.sched.slice_ticks = 0;
        self.sched.queue_wait = 0;
    }

    /// Re-enter the tier the process belongs to
    pub fn requeue_home(&mut self, now: Tick) {
        self.enqueue(self.sched.home_queue, now);
    }

    /// Move one tier toward the bottom queue; false when already there
    pub fn demote(&mut self) -> bool {
        if self.sched.home_queue >= BOTTOM_QUEUE {
            return false;
        }
        self.sched.home_queue += 1;
        true
    }

    /// Move one queue toward queue 0; false when already at the top
    pub fn promote(&mut self, now: Tick) -> bool {
        let Some(level) = self.sched.queue else {
            return false;
        };
        if level == 0 {
            return false;
        }
        self.sched.home_queue = self.sched.home_queue.saturating_sub(1);
        self.enqueue(level - 1, now);
        true
    }

    pub fn free_fd(&self) -> Option<usize> {
        self.resources.files.iter().position(Option::is_none)
    }

    pub fn record(&self, feedback: bool) -> ProcessRecord {
        ProcessRecord {
            pid: self.pid,
            name: self.name.clone(),
            priority: self.sched.priority,
            state: self.state,
            run_ticks: self.times.run,
            io_ticks: self.times.io,
            wait_ticks: self.sched.queue_wait,
            run_count: self.sched.run_count,
            feedback: feedback.then(|| FeedbackRecord {
                queue: self.sched.home_queue,
                queued: self.sched.queue,
                queue_ticks: self.sched.queue_ticks,
            }),
        }
    }
}
