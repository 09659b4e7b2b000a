/*!
 * Scheduler Configuration
 *
 * Runtime configuration for table size, CPU count, policy selection and
 * feedback-queue timing. Loaded from defaults, JSON, or the environment.
 */

use super::errors::ConfigError;
use super::limits::{
    AGING_THRESHOLDS, DEFAULT_PRIORITY, MAX_PRIORITY, NCPU, NPROC, NQUEUE, QUEUE_ALLOTMENTS,
};
use super::types::{Priority, Tick};
use crate::scheduler::Policy;
use serde::{Deserialize, Serialize};

/// Environment variable selecting the policy
pub const ENV_POLICY: &str = "SCHED_POLICY";
/// Environment variable overriding the table size
pub const ENV_NPROC: &str = "SCHED_NPROC";
/// Environment variable overriding the CPU count
pub const ENV_NCPU: &str = "SCHED_NCPU";

/// Scheduler configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct SchedConfig {
    /// Selection policy for every CPU
    pub policy: Policy,
    /// Process table capacity
    pub nproc: usize,
    /// Number of execution contexts
    pub ncpu: usize,
    /// Priority seeded into every new process
    pub default_priority: Priority,
    /// Waiting ticks before promotion, per queue
    pub aging_thresholds: [Tick; NQUEUE],
    /// Ticks per pass before demotion, per queue
    pub queue_allotments: [Tick; NQUEUE],
    /// An idle CPU lets one timer tick elapse while it waits
    pub idle_advances_clock: bool,
}

impl Default for SchedConfig {
    fn default() -> Self {
        Self {
            policy: Policy::default(),
            nproc: NPROC,
            ncpu: 1,
            default_priority: DEFAULT_PRIORITY,
            aging_thresholds: AGING_THRESHOLDS,
            queue_allotments: QUEUE_ALLOTMENTS,
            idle_advances_clock: true,
        }
    }
}

impl SchedConfig {
    #[inline]
    #[must_use]
    pub fn with_policy(mut self, policy: Policy) -> Self {
        self.policy = policy;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_nproc(mut self, nproc: usize) -> Self {
        self.nproc = nproc;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_cpus(mut self, ncpu: usize) -> Self {
        self.ncpu = ncpu;
        self
    }

    /// Parse a JSON document; missing fields keep their defaults
    pub fn from_json(doc: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(doc)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overridden by `SCHED_POLICY`, `SCHED_NPROC` and `SCHED_NCPU`
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(policy) = std::env::var(ENV_POLICY) {
            config.policy = policy.parse()?;
        }
        if let Ok(nproc) = std::env::var(ENV_NPROC) {
            config.nproc = parse_count(ENV_NPROC, &nproc)?;
        }
        if let Ok(ncpu) = std::env::var(ENV_NCPU) {
            config.ncpu = parse_count(ENV_NCPU, &ncpu)?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.nproc == 0 {
            return Err(ConfigError::Invalid("nproc must be at least 1".into()));
        }
        if self.ncpu == 0 || self.ncpu > NCPU {
            return Err(ConfigError::Invalid(format!(
                "ncpu must be between 1 and {}, got {}",
                NCPU, self.ncpu
            )));
        }
        if i32::from(self.default_priority) > MAX_PRIORITY {
            return Err(ConfigError::Invalid(format!(
                "default_priority {} exceeds {}",
                self.default_priority, MAX_PRIORITY
            )));
        }
        if self.queue_allotments.iter().any(|&ticks| ticks == 0) {
            return Err(ConfigError::Invalid(
                "queue allotments must be at least one tick".into(),
            ));
        }
        Ok(())
    }
}

fn parse_count(var: &str, raw: &str) -> Result<usize, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::Invalid(format!("{var}={raw} is not a count")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = SchedConfig::default();
        assert_eq!(config.policy, Policy::RoundRobin);
        assert_eq!(config.nproc, 64);
        assert_eq!(config.default_priority, 60);
        assert_eq!(config.aging_thresholds, [10, 20, 30, 40, 50]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_json_partial() {
        let config = SchedConfig::from_json(r#"{"policy": "mlfq", "nproc": 8}"#).unwrap();
        assert_eq!(config.policy, Policy::Feedback);
        assert_eq!(config.nproc, 8);
        assert_eq!(config.ncpu, 1);
        assert_eq!(config.queue_allotments, QUEUE_ALLOTMENTS);
    }

    #[test]
    fn test_from_json_rejects_bad_values() {
        assert!(matches!(
            SchedConfig::from_json(r#"{"nproc": 0}"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            SchedConfig::from_json(r#"{"policy": "lottery"}"#),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            SchedConfig::from_json(r#"{"queue_allotments": [1, 0, 4, 8, 16]}"#),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_validate_cpu_bounds() {
        assert!(SchedConfig::default().with_cpus(0).validate().is_err());
        assert!(SchedConfig::default().with_cpus(NCPU + 1).validate().is_err());
        assert!(SchedConfig::default().with_cpus(NCPU).validate().is_ok());
    }
}
