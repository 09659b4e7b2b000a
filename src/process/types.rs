/*!
 * Process Types
 * Common types for process management
 */

use crate::core::limits::NQUEUE;
use crate::core::types::{Pid, Priority, QueueLevel, Slot, Tick};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroU64;

/// Process lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcState {
    /// Slot is free
    #[default]
    Unused,
    /// Slot is allocated but the process is not yet runnable
    Embryo,
    /// Waiting for a processor
    Runnable,
    /// Executing on a processor
    Running,
    /// Blocked on a channel
    Sleeping,
    /// Exited, waiting to be reaped by its parent
    Zombie,
}

impl ProcState {
    /// Label used by process listings
    #[inline(always)]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Unused => "UNUSED",
            Self::Embryo => "EMBRYO",
            Self::Runnable => "RUNNABLE",
            Self::Running => "RUNNING",
            Self::Sleeping => "SLEEPING",
            Self::Zombie => "ZOMBIE",
        }
    }

    #[inline(always)]
    pub const fn is_live(&self) -> bool {
        !matches!(self, Self::Unused)
    }
}

impl fmt::Display for ProcState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Opaque blocking key recorded on a sleeping process
///
/// Non-zero by construction, so "no channel" is `Option::None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Channel(NonZeroU64);

const TICKS_KEY: u64 = 1;
const CHILD_BASE: u64 = 1 << 32;
const IO_BASE: u64 = 1 << 48;

impl Channel {
    /// Processes sleeping for a number of ticks
    pub const TICKS: Channel = Channel(match NonZeroU64::new(TICKS_KEY) {
        Some(key) => key,
        None => unreachable!(),
    });

    /// Channel a parent sleeps on while waiting for its children
    #[inline]
    #[must_use]
    pub fn child_exit(parent: Slot) -> Self {
        Self::from_raw(CHILD_BASE + parent.index() as u64)
    }

    /// Channel for an external blocking operation identified by `key`
    #[inline]
    #[must_use]
    pub fn io(key: u32) -> Self {
        Self::from_raw(IO_BASE + u64::from(key))
    }

    fn from_raw(raw: u64) -> Self {
        match NonZeroU64::new(raw) {
            Some(key) => Self(key),
            None => Self::TICKS,
        }
    }

    #[inline(always)]
    pub const fn raw(&self) -> u64 {
        self.0.get()
    }
}

/// Feedback-queue part of a process listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct FeedbackRecord {
    /// Tier the process belongs to
    pub queue: QueueLevel,
    /// Queue the process currently sits in, if RUNNABLE
    pub queued: Option<QueueLevel>,
    /// Lifetime ticks consumed in each queue
    pub queue_ticks: [Tick; NQUEUE],
}

/// Snapshot of one live process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ProcessRecord {
    pub pid: Pid,
    pub name: String,
    pub priority: Priority,
    pub state: ProcState,
    pub run_ticks: Tick,
    pub io_ticks: Tick,
    pub wait_ticks: Tick,
    pub run_count: u64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub feedback: Option<FeedbackRecord>,
}

/// Result of `wait_with_timing`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct WaitStatus {
    pub pid: Pid,
    /// exit - create - run - io
    pub wait_ticks: i64,
    pub run_ticks: Tick,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channels_are_distinct() {
        let a = Channel::child_exit(Slot(0));
        let b = Channel::child_exit(Slot(1));
        assert_ne!(a, b);
        assert_ne!(a, Channel::TICKS);
        assert_ne!(Channel::io(0), Channel::TICKS);
        assert_ne!(Channel::io(0), a);
        assert_eq!(Channel::TICKS.raw(), 1);
    }

    #[test]
    fn test_state_labels() {
        assert_eq!(ProcState::Sleeping.to_string(), "SLEEPING");
        assert!(!ProcState::Unused.is_live());
        assert!(ProcState::Zombie.is_live());
    }
}
