/*!
 * Process Module
 * Process table, lifecycle, sleep/wakeup and the per-process handle
 */

mod accounting;
pub(crate) mod context;
pub mod control;
mod lifecycle;
pub mod machine;
pub(crate) mod pcb;
pub mod proc;
mod sync;
pub(crate) mod table;
pub mod types;

// Re-export for convenience
pub use control::render_table;
pub use machine::{AddressSpace, DirHandle, FileHandle, HostMachine, Machine};
pub use proc::Proc;
pub use types::{Channel, FeedbackRecord, ProcState, ProcessRecord, WaitStatus};
