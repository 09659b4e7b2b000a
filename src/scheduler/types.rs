/*!
 * Scheduler Types
 * Domain types for policy selection and scheduler statistics
 */

use crate::core::errors::ConfigError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Process selection policy, chosen once at startup
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Policy {
    /// Table sweep in slot order, every RUNNABLE process once per sweep
    #[default]
    RoundRobin,
    /// Oldest last-scheduled timestamp first, never preempted by the timer
    Fcfs,
    /// Numerically smallest static priority first
    Priority,
    /// Five-level feedback queue with aging
    Feedback,
}

impl Policy {
    pub const ALL: [Policy; 4] = [
        Policy::RoundRobin,
        Policy::Fcfs,
        Policy::Priority,
        Policy::Feedback,
    ];

    /// Convert to string representation
    ///
    /// # Performance
    /// Hot path - frequently called for logging and serialization
    #[inline(always)]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::RoundRobin => "round_robin",
            Self::Fcfs => "fcfs",
            Self::Priority => "priority",
            Self::Feedback => "feedback",
        }
    }

    /// Whether processes carry feedback-queue bookkeeping
    #[inline(always)]
    pub const fn is_feedback(&self) -> bool {
        matches!(self, Self::Feedback)
    }
}

impl FromStr for Policy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "round_robin" | "roundrobin" | "rr" => Ok(Self::RoundRobin),
            "fcfs" | "first_come_first_served" | "fifo" => Ok(Self::Fcfs),
            "priority" | "pbs" | "prio" => Ok(Self::Priority),
            "feedback" | "mlfq" => Ok(Self::Feedback),
            _ => Err(ConfigError::UnknownPolicy(s.to_string())),
        }
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Policy {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Policy {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Scheduler statistics snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SchedStats {
    pub policy: Policy,
    pub dispatches: u64,
    pub idle_polls: u64,
    pub timer_preemptions: u64,
    pub voluntary_yields: u64,
    pub promotions: u64,
    pub demotions: u64,
    pub forks: u64,
    pub exits: u64,
    pub reaped: u64,
}
