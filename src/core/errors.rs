/*!
 * Error Types
 * Centralized error handling with thiserror, miette, and serde support
 */

use super::types::Pid;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result of a process-facing operation
///
/// # Must Use
/// Process operations can fail and must be handled to prevent resource leaks
pub type ProcResult<T> = Result<T, ProcError>;

/// Recoverable errors reported to the immediate caller of a process operation
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum ProcError {
    #[error("Process allocation failed: {0}")]
    #[diagnostic(
        code(process::alloc_failure),
        help("The process table may be full or a resource could not be duplicated. Reap zombies or retry later.")
    )]
    AllocFailure(String),

    #[error("No children to wait for")]
    #[diagnostic(
        code(process::no_children),
        help("The caller has no live or zombie children.")
    )]
    NoChildren,

    #[error("Interrupted: process was killed while blocked")]
    #[diagnostic(
        code(process::interrupted),
        help("The caller has been killed and will exit at its next checkpoint.")
    )]
    Interrupted,

    #[error("Priority {0} out of range")]
    #[diagnostic(
        code(scheduler::invalid_priority),
        help("Priority must be between 0 and 100 (lower is more favorable).")
    )]
    InvalidPriority(i32),

    #[error("Process {0} not found")]
    #[diagnostic(
        code(process::not_found),
        help("The process may have been reaped or never existed. Check PID validity.")
    )]
    NoSuchProcess(Pid),
}

/// Failures reported by the machine hooks (address spaces, files, directories)
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum ResourceError {
    #[error("Address space unavailable: {0}")]
    #[diagnostic(code(machine::address_space))]
    AddressSpace(String),

    #[error("Directory lookup failed: {0}")]
    #[diagnostic(code(machine::directory))]
    Directory(String),

    #[error("Execution context unavailable: {0}")]
    #[diagnostic(
        code(machine::context),
        help("The host could not provide a thread for the new process.")
    )]
    Context(String),
}

impl From<ResourceError> for ProcError {
    fn from(err: ResourceError) -> Self {
        ProcError::AllocFailure(err.to_string())
    }
}

/// Configuration errors
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum ConfigError {
    #[error("Unknown scheduling policy '{0}'")]
    #[diagnostic(
        code(config::unknown_policy),
        help("Valid: rr, fcfs, pbs, mlfq (or round_robin, first_come_first_served, priority, feedback).")
    )]
    UnknownPolicy(String),

    #[error("Invalid configuration: {0}")]
    #[diagnostic(
        code(config::invalid),
        help("Review configuration parameters.")
    )]
    Invalid(String),

    #[error("Malformed configuration document: {0}")]
    #[diagnostic(code(config::parse))]
    Parse(String),
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_error_becomes_alloc_failure() {
        let err: ProcError = ResourceError::AddressSpace("out of frames".into()).into();
        assert!(matches!(err, ProcError::AllocFailure(ref msg) if msg.contains("out of frames")));
    }

    #[test]
    fn test_error_serialization_is_tagged() {
        let json = serde_json::to_string(&ProcError::NoSuchProcess(7)).unwrap();
        assert_eq!(json, r#"{"error_type":"no_such_process","details":7}"#);

        let json = serde_json::to_string(&ProcError::NoChildren).unwrap();
        assert_eq!(json, r#"{"error_type":"no_children"}"#);
    }
}
