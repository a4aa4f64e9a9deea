// src/generator.rs

//! Script generator.
//!
//! One backend call per request, then extraction, then the safety gate.
//! The generator only *flags* dangerous code; deciding whether to withhold
//! display or execution is the engine's job.

use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::backend::{BackendError, GenerationBackend, Prompt};
use crate::extract::{extract, MetadataView};
use crate::ids::ArtifactId;
use crate::language::TargetLanguage;
use crate::safety::check_safety;
use crate::util::sha256_hex;

/// Code plus metadata plus safety verdict. Immutable once returned.
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedArtifact {
    pub id: ArtifactId,
    pub language: TargetLanguage,
    pub backend: String,
    pub code: String,
    pub code_sha256: String,
    pub metadata: Map<String, Value>,
    /// Matched denylist ids in denylist order. Non-empty means blocked.
    pub safety_issues: Vec<String>,
    /// Unmodified model output, kept for audit.
    pub raw: String,
}

impl GeneratedArtifact {
    pub fn is_blocked(&self) -> bool {
        !self.safety_issues.is_empty()
    }

    pub fn metadata_view(&self) -> MetadataView {
        MetadataView::from_map(&self.metadata)
    }
}

pub struct ScriptGenerator {
    backend: Arc<dyn GenerationBackend>,
    max_output_tokens: u32,
}

impl ScriptGenerator {
    pub fn new(backend: Arc<dyn GenerationBackend>, max_output_tokens: u32) -> Self {
        Self {
            backend,
            max_output_tokens,
        }
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Generate, extract and gate a script for `task_description`.
    ///
    /// Backend failures surface as typed errors; nothing is retried.
    pub async fn generate(
        &self,
        task_description: &str,
        language: TargetLanguage,
    ) -> Result<GeneratedArtifact, BackendError> {
        let prompt = build_prompt(task_description, language, self.max_output_tokens);

        tracing::info!(
            backend = self.backend.name(),
            language = %language,
            task_len = task_description.len(),
            "requesting generation"
        );

        let raw = self.backend.complete(&prompt).await?;
        let extraction = extract(&raw);
        let safety_issues = check_safety(&extraction.code);

        if extraction.is_code_empty() {
            tracing::warn!(raw_len = raw.len(), "model output contained no fenced code block");
        }
        if !safety_issues.is_empty() {
            tracing::warn!(issues = ?safety_issues, "generated code matched denylist");
        }

        Ok(GeneratedArtifact {
            id: ArtifactId::new(),
            language,
            backend: self.backend.name().to_string(),
            code_sha256: sha256_hex(extraction.code.as_bytes()),
            code: extraction.code,
            metadata: extraction.metadata,
            safety_issues,
            raw: extraction.raw,
        })
    }
}

/// Build the system + user instructions for one request.
pub fn build_prompt(task_description: &str, language: TargetLanguage, max_output_tokens: u32) -> Prompt {
    Prompt {
        system_instruction: system_instruction(language),
        user_instruction: format!(
            "Target language: {}\nTask: {}\n\
             Return only the script content and metadata as described.",
            language.display_name(),
            task_description.trim()
        ),
        max_output_tokens,
        temperature: 0.0,
    }
}

fn system_instruction(language: TargetLanguage) -> String {
    format!(
        r#"You are an assistant that converts natural language into robust {name} automation scripts.
Return exactly:
1) A single triple-backtick code block containing only the script.
2) Immediately after the code block, a JSON object with metadata:
{{
  "filename": "script.{ext}",
  "language": "{lang}",
  "description": "Short summary",
  "dependencies": []
}}
Rules:
- Use placeholders for secrets. Never include real credentials.
- Add logging and helpful comments.
- Never emit destructive operations (rm -rf, Remove-Item -Recurse, formatting volumes or drives, shutdown or reboot, writes to absolute system paths, bulk file deletion).
- If the request is impossible, explain why in the JSON "description" and return an empty code block."#,
        name = language.display_name(),
        ext = language.extension(),
        lang = language.as_str(),
    )
}
