use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::RequestId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineEventKind {
    RequestReceived,
    ValidationFailed,
    GenerationStarted,
    GenerationFailed,
    GenerationFinished,
    SafetyBlocked,
    ExecutionSkipped,
    ExecutionStarted,
    ExecutionFinished,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineEvent {
    pub request_id: RequestId,
    pub kind: PipelineEventKind,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl PipelineEvent {
    pub fn new(request_id: &RequestId, kind: PipelineEventKind) -> Self {
        Self {
            request_id: request_id.clone(),
            kind,
            timestamp: Utc::now(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}
