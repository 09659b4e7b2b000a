/*!
 * System Limits and Constants
 *
 * Table sizes, priority bounds and feedback-queue timing used as defaults by
 * `SchedConfig`.
 */

use super::types::{Priority, Tick};

// =============================================================================
// PROCESS TABLE
// =============================================================================

/// Default number of process table slots
pub const NPROC: usize = 64;

/// Upper bound on execution contexts a kernel may be configured with
pub const NCPU: usize = 8;

/// Open-file descriptors per process
pub const NOFILE: usize = 16;

/// Name given to the root process created at boot
pub const ROOT_PROCESS_NAME: &str = "initcode";

/// Working directory of the root process
pub const ROOT_DIRECTORY: &str = "/";

// =============================================================================
// PRIORITY
// =============================================================================

/// Most favorable static priority
pub const MIN_PRIORITY: i32 = 0;

/// Least favorable static priority
pub const MAX_PRIORITY: i32 = 100;

/// Priority every freshly allocated process starts with
pub const DEFAULT_PRIORITY: Priority = 60;

// =============================================================================
// FEEDBACK QUEUES
// =============================================================================

/// Number of feedback queues
pub const NQUEUE: usize = 5;

/// Least favorable queue level
pub const BOTTOM_QUEUE: u8 = (NQUEUE - 1) as u8;

/// Waiting ticks after which a RUNNABLE process is promoted one level
pub const AGING_THRESHOLDS: [Tick; NQUEUE] = [10, 20, 30, 40, 50];

/// Ticks a process may consume in one pass before it is demoted
pub const QUEUE_ALLOTMENTS: [Tick; NQUEUE] = [1, 2, 4, 8, 16];
