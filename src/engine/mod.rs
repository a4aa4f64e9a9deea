use anyhow::Result;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

pub mod events;
pub mod response;
pub mod run;
pub mod sink;
pub mod validate;

pub use response::{GenerateResponse, PipelineStatus};
pub use validate::{validate_request, GenerationRequest, RawRequest};

use crate::backend::build_backend;
use crate::config::Config;
use crate::generator::ScriptGenerator;
use crate::sandbox::{Sandbox, SandboxExecutor};

/* ---------------- engine ---------------- */

/// Composition root: generator, sandbox and the operator execution policy.
///
/// Holds no per-request state; one instance serves concurrent requests.
pub struct Engine {
    generator: ScriptGenerator,
    sandbox: Arc<dyn Sandbox>,
    policy: ExecutionPolicy,
}

/// Process-wide execution settings, read-only after startup.
#[derive(Debug, Clone, Copy)]
pub struct ExecutionPolicy {
    /// Operator opt-in, independent of any per-request flag.
    pub enabled: bool,
    pub timeout: Duration,
}

impl Engine {
    pub fn new(generator: ScriptGenerator, sandbox: Arc<dyn Sandbox>, policy: ExecutionPolicy) -> Self {
        Self {
            generator,
            sandbox,
            policy,
        }
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        let backend = build_backend(&cfg.backend)?;
        let generator = ScriptGenerator::new(backend, cfg.backend.max_output_tokens);
        let sandbox: Arc<dyn Sandbox> = Arc::new(SandboxExecutor::from_config(&cfg.execution));

        tracing::info!(
            backend = generator.backend_name(),
            execution_enabled = cfg.execution.enabled,
            "engine ready"
        );

        Ok(Self::new(
            generator,
            sandbox,
            ExecutionPolicy {
                enabled: cfg.execution.enabled,
                timeout: Duration::from_secs(cfg.execution.timeout_secs.max(1)),
            },
        ))
    }

    pub fn policy(&self) -> ExecutionPolicy {
        self.policy
    }
}

/* ---------------- validation ---------------- */

#[derive(Debug, Serialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<ValidationError>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationError {
    pub code: &'static str,
    pub message: String,
}

impl ValidationResult {
    pub fn ok() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
        }
    }

    pub fn push_error(&mut self, code: &'static str, message: impl Into<String>) {
        self.valid = false;
        self.errors.push(ValidationError {
            code,
            message: message.into(),
        });
    }

    pub fn is_valid(&self) -> bool {
        self.valid && self.errors.is_empty()
    }
}
