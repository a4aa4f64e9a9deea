// src/engine/response.rs
use serde::Serialize;
use serde_json::{Map, Value};

use crate::engine::events::PipelineEvent;
use crate::engine::ValidationError;
use crate::ids::{ArtifactId, RequestId};
use crate::sandbox::ExecutionResult;

/// How far a request got. Partial success is distinct from failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStatus {
    /// Code generated; execution not requested.
    Generated,
    /// Code generated and run (the run itself may have failed).
    Executed,
    /// Code generated; execution requested but not performed.
    ExecutionSkipped,
    /// Generated code matched the denylist; code withheld, never run.
    SafetyBlocked,
    ValidationFailed,
    GenerationFailed,
}

impl PipelineStatus {
    pub fn is_ok(self) -> bool {
        matches!(
            self,
            PipelineStatus::Generated | PipelineStatus::Executed | PipelineStatus::ExecutionSkipped
        )
    }
}

/// Response folded from generation and (optional) execution.
#[derive(Debug, Clone, Serialize)]
pub struct GenerateResponse {
    pub ok: bool,
    pub status: PipelineStatus,
    pub request_id: RequestId,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact_id: Option<ArtifactId>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_sha256: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub safety_issues: Option<Vec<String>>,

    /// Model output, only included when the code is withheld.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,

    pub run_result: Option<ExecutionResult>,

    /// Why a requested execution did not happen.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_skipped: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<&'static str>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub validation_errors: Vec<ValidationError>,

    pub events: Vec<PipelineEvent>,
}

impl GenerateResponse {
    pub fn new(request_id: RequestId, status: PipelineStatus) -> Self {
        Self {
            ok: status.is_ok(),
            status,
            request_id,
            artifact_id: None,
            code: None,
            code_sha256: None,
            metadata: None,
            safety_issues: None,
            raw: None,
            run_result: None,
            execution_skipped: None,
            error: None,
            error_kind: None,
            validation_errors: Vec::new(),
            events: Vec::new(),
        }
    }
}
