/*!
 * proc-sched
 *
 * Process scheduler core: a fixed-capacity process table, the lifecycle state
 * machine, four interchangeable selection policies, tick accounting,
 * channel-keyed sleep/wakeup and a small control surface.
 */

pub mod core;
pub mod kernel;
pub mod monitoring;
pub mod process;
pub mod scheduler;

// Re-exports
pub use crate::core::{
    ConfigError, CpuId, Pid, Priority, ProcError, ProcResult, QueueLevel, ResourceError,
    SchedConfig, Tick,
};
pub use kernel::{Kernel, KernelBuilder, SchedulerHandle};
pub use monitoring::init_tracing;
pub use process::{
    render_table, AddressSpace, Channel, DirHandle, FeedbackRecord, FileHandle, HostMachine,
    Machine, Proc, ProcState, ProcessRecord, WaitStatus,
};
pub use scheduler::{Policy, SchedStats};
