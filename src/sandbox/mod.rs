// src/sandbox/mod.rs

//! Sandbox executor.
//!
//! Runs one script once: fresh scratch directory, a single script file,
//! one child process with no stdin, captured stdout/stderr, and a hard
//! wall-clock timeout. The scratch directory is removed on every exit path.
//!
//! Isolation is process-level only (working directory and lifetime). There
//! is no memory, network or filesystem-permission confinement; containing
//! untrusted code needs a container or VM around this process.

mod executor;
pub mod metrics;

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

use crate::language::TargetLanguage;

pub use executor::SandboxExecutor;

/// Why a run produced no exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionFailure {
    Timeout,
    InterpreterNotFound,
    IoError,
}

/// Outcome of one sandboxed run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ExecutionResult {
    Completed {
        exit_code: i32,
        stdout: String,
        stderr: String,
        duration_ms: u64,
        /// Peak RSS of the direct child, best-effort.
        max_rss_kb: Option<u64>,
    },
    Failed {
        failure_reason: ExecutionFailure,
        message: String,
    },
}

impl ExecutionResult {
    pub fn failed(reason: ExecutionFailure, message: impl Into<String>) -> Self {
        ExecutionResult::Failed {
            failure_reason: reason,
            message: message.into(),
        }
    }

    pub fn failure_reason(&self) -> Option<ExecutionFailure> {
        match self {
            ExecutionResult::Failed { failure_reason, .. } => Some(*failure_reason),
            ExecutionResult::Completed { .. } => None,
        }
    }

    pub fn exit_code(&self) -> Option<i32> {
        match self {
            ExecutionResult::Completed { exit_code, .. } => Some(*exit_code),
            ExecutionResult::Failed { .. } => None,
        }
    }
}

/// Anything that can run a script once under a timeout.
///
/// Callers must only pass code that cleared the safety gate, and only when
/// local execution is enabled by the operator.
#[async_trait]
pub trait Sandbox: Send + Sync {
    async fn run(&self, code: &str, language: TargetLanguage, timeout: Duration) -> ExecutionResult;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_reasons_serialise_in_upper_case() {
        let v = serde_json::to_value(ExecutionResult::failed(
            ExecutionFailure::InterpreterNotFound,
            "pwsh",
        ))
        .unwrap();
        assert_eq!(v["outcome"], "failed");
        assert_eq!(v["failure_reason"], "INTERPRETER_NOT_FOUND");
    }

    #[test]
    fn completed_result_exposes_exit_code() {
        let r = ExecutionResult::Completed {
            exit_code: 3,
            stdout: String::new(),
            stderr: String::new(),
            duration_ms: 1,
            max_rss_kb: None,
        };
        assert_eq!(r.exit_code(), Some(3));
        assert_eq!(r.failure_reason(), None);
    }
}
