use crate::{
    engine::{
        events::{PipelineEvent, PipelineEventKind},
        response::{GenerateResponse, PipelineStatus},
        sink::EventSink,
        validate::{validate_request, RawRequest},
        Engine,
    },
    ids::RequestId,
    sinks::collecting::CollectingEventSink,
};

/// Reason reported when the operator has not enabled local execution.
pub const EXECUTION_DISABLED: &str = "Local execution disabled on server (security).";

/// Reason reported when there is nothing to run.
pub const NOTHING_TO_RUN: &str = "No code was extracted from the model output.";

impl Engine {
    /// Run one request through validate → generate → gate → (maybe) execute.
    ///
    /// Never fails: every outcome, including backend and execution failures,
    /// is a labelled [`GenerateResponse`]. The sink is owned here so the
    /// returned future stays `Send`.
    pub async fn run_generation(&self, raw: RawRequest) -> GenerateResponse {
        let mut sink = CollectingEventSink::new();
        let request_id = RequestId::new();

        let mut response = self.pipeline(&request_id, raw, &mut sink).await;
        response.events = sink.into_events();

        tracing::info!(
            request_id = %request_id,
            status = ?response.status,
            ok = response.ok,
            "request handled"
        );

        response
    }

    async fn pipeline(
        &self,
        request_id: &RequestId,
        raw: RawRequest,
        sink: &mut CollectingEventSink,
    ) -> GenerateResponse {
        sink.emit(PipelineEvent::new(request_id, PipelineEventKind::RequestReceived));

        // ---- validation ----
        let request = match validate_request(&raw) {
            Ok(r) => r,
            Err(errors) => {
                sink.emit(PipelineEvent::new(request_id, PipelineEventKind::ValidationFailed));

                let mut resp =
                    GenerateResponse::new(request_id.clone(), PipelineStatus::ValidationFailed);
                resp.error = errors.first().map(|e| e.message.clone());
                resp.error_kind = Some("validation");
                resp.validation_errors = errors;
                return resp;
            }
        };

        // ---- generation ----
        sink.emit(
            PipelineEvent::new(request_id, PipelineEventKind::GenerationStarted)
                .with_detail(request.target_language.as_str()),
        );

        let artifact = match self
            .generator
            .generate(&request.task_description, request.target_language)
            .await
        {
            Ok(a) => a,
            Err(e) => {
                tracing::warn!(request_id = %request_id, error = %e, "generation failed");
                sink.emit(
                    PipelineEvent::new(request_id, PipelineEventKind::GenerationFailed)
                        .with_detail(e.kind()),
                );

                let mut resp =
                    GenerateResponse::new(request_id.clone(), PipelineStatus::GenerationFailed);
                resp.error = Some(e.to_string());
                resp.error_kind = Some(e.kind());
                return resp;
            }
        };

        sink.emit(
            PipelineEvent::new(request_id, PipelineEventKind::GenerationFinished)
                .with_detail(artifact.id.to_string()),
        );

        // ---- safety gate: blocked artifacts are withheld and never run ----
        if artifact.is_blocked() {
            sink.emit(
                PipelineEvent::new(request_id, PipelineEventKind::SafetyBlocked)
                    .with_detail(artifact.safety_issues.join(", ")),
            );

            let mut resp = GenerateResponse::new(request_id.clone(), PipelineStatus::SafetyBlocked);
            resp.artifact_id = Some(artifact.id);
            resp.safety_issues = Some(artifact.safety_issues);
            resp.raw = Some(artifact.raw);
            resp.error = Some("Safety checks failed".to_string());
            resp.error_kind = Some("safety_blocked");
            return resp;
        }

        let mut resp = GenerateResponse::new(request_id.clone(), PipelineStatus::Generated);
        resp.artifact_id = Some(artifact.id.clone());
        resp.code_sha256 = Some(artifact.code_sha256.clone());
        resp.metadata = Some(artifact.metadata.clone());
        resp.safety_issues = Some(Vec::new());
        resp.code = Some(artifact.code.clone());

        if !request.execute_after_generate {
            return resp;
        }

        // ---- execution ----
        let skip_reason = if !self.policy.enabled {
            Some(EXECUTION_DISABLED)
        } else if artifact.code.trim().is_empty() {
            Some(NOTHING_TO_RUN)
        } else {
            None
        };

        if let Some(reason) = skip_reason {
            sink.emit(
                PipelineEvent::new(request_id, PipelineEventKind::ExecutionSkipped)
                    .with_detail(reason),
            );
            resp = with_status(resp, PipelineStatus::ExecutionSkipped);
            resp.execution_skipped = Some(reason.to_string());
            return resp;
        }

        sink.emit(PipelineEvent::new(request_id, PipelineEventKind::ExecutionStarted));

        let result = self
            .sandbox
            .run(&artifact.code, artifact.language, self.policy.timeout)
            .await;

        let detail = match result.failure_reason() {
            Some(reason) => format!("{:?}", reason),
            None => format!("exit_code={}", result.exit_code().unwrap_or(-1)),
        };
        sink.emit(
            PipelineEvent::new(request_id, PipelineEventKind::ExecutionFinished).with_detail(detail),
        );

        resp = with_status(resp, PipelineStatus::Executed);
        resp.run_result = Some(result);
        resp
    }
}

fn with_status(mut resp: GenerateResponse, status: PipelineStatus) -> GenerateResponse {
    resp.status = status;
    resp.ok = status.is_ok();
    resp
}
