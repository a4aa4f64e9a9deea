use serde::Deserialize;

use crate::engine::{ValidationError, ValidationResult};
use crate::language::TargetLanguage;

/// Minimum task description length, in characters, after trimming.
pub const MIN_TASK_LEN: usize = 3;

/// Request as it arrives from the CLI or HTTP layer, before validation.
///
/// Accepts both the long field names and the short `prompt` / `language` /
/// `run` forms.
#[derive(Debug, Clone, Deserialize)]
pub struct RawRequest {
    #[serde(alias = "prompt", default)]
    pub task_description: String,

    #[serde(alias = "target_language", default = "default_language")]
    pub language: String,

    #[serde(alias = "run", default)]
    pub execute_after_generate: bool,
}

fn default_language() -> String {
    TargetLanguage::default().as_str().to_string()
}

/// A validated, immutable generation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub task_description: String,
    pub target_language: TargetLanguage,
    pub execute_after_generate: bool,
}

/// Validate a raw request, collecting every problem rather than stopping at
/// the first.
pub fn validate_request(raw: &RawRequest) -> Result<GenerationRequest, Vec<ValidationError>> {
    let mut result = ValidationResult::ok();

    validate_task(&raw.task_description, &mut result);
    let language = validate_language(&raw.language, &mut result);

    match language {
        Some(target_language) if result.is_valid() => Ok(GenerationRequest {
            task_description: raw.task_description.trim().to_string(),
            target_language,
            execute_after_generate: raw.execute_after_generate,
        }),
        _ => Err(result.errors),
    }
}

/* ---------------- task ---------------- */

fn validate_task(task: &str, result: &mut ValidationResult) {
    let trimmed = task.trim();

    if trimmed.is_empty() {
        result.push_error("TASK_EMPTY", "Task description is empty");
        return;
    }

    if trimmed.chars().count() < MIN_TASK_LEN {
        result.push_error(
            "TASK_TOO_SHORT",
            format!("Task description must be at least {} characters", MIN_TASK_LEN),
        );
    }
}

/* ---------------- language ---------------- */

fn validate_language(language: &str, result: &mut ValidationResult) -> Option<TargetLanguage> {
    match language.parse::<TargetLanguage>() {
        Ok(lang) => Some(lang),
        Err(e) => {
            result.push_error("LANGUAGE_UNSUPPORTED", e.to_string());
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(task: &str, language: &str) -> RawRequest {
        RawRequest {
            task_description: task.into(),
            language: language.into(),
            execute_after_generate: false,
        }
    }

    #[test]
    fn valid_request_is_normalised() {
        let req = validate_request(&raw("  print hello world ", "PY")).unwrap();
        assert_eq!(req.task_description, "print hello world");
        assert_eq!(req.target_language, TargetLanguage::Python);
    }

    #[test]
    fn short_task_is_rejected() {
        let errs = validate_request(&raw("hi", "python")).unwrap_err();
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].code, "TASK_TOO_SHORT");
    }

    #[test]
    fn whitespace_does_not_count_towards_length() {
        let errs = validate_request(&raw("   a   ", "python")).unwrap_err();
        assert_eq!(errs[0].code, "TASK_TOO_SHORT");
        let errs = validate_request(&raw("    ", "python")).unwrap_err();
        assert_eq!(errs[0].code, "TASK_EMPTY");
    }

    #[test]
    fn all_problems_are_reported() {
        let errs = validate_request(&raw("", "fortran")).unwrap_err();
        let codes: Vec<_> = errs.iter().map(|e| e.code).collect();
        assert_eq!(codes, vec!["TASK_EMPTY", "LANGUAGE_UNSUPPORTED"]);
    }

    #[test]
    fn short_field_names_deserialize() {
        let req: RawRequest =
            serde_json::from_str(r#"{"prompt": "list files", "run": true}"#).unwrap();
        assert_eq!(req.task_description, "list files");
        assert_eq!(req.language, "python");
        assert!(req.execute_after_generate);
    }
}
