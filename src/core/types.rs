/*!
 * Core Types
 * Common types used across the scheduler core
 */

use serde::{Deserialize, Serialize};
use std::fmt;

/// Process ID type (0 marks a free slot)
pub type Pid = u32;

/// One unit of the monotonic time base
pub type Tick = u64;

/// Static priority (0-100, lower is more favorable)
pub type Priority = u8;

/// Execution context (CPU) index
pub type CpuId = usize;

/// Feedback queue level (0 is the most favorable)
pub type QueueLevel = u8;

/// Stable index of a process table slot
///
/// Slots outlive the processes that occupy them, so a `Slot` never dangles;
/// callers that need identity across reuse compare the pid as well.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Slot(pub(crate) usize);

impl Slot {
    #[inline(always)]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slot#{}", self.0)
    }
}
