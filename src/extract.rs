// src/extract.rs

//! Artifact extraction from free-text model output.
//!
//! Model output has no guaranteed structure, so extraction never fails:
//! missing pieces come back as empty values and the caller decides what an
//! empty script means.
//!
//! - `code`: trimmed interior of the first fenced block (first fence wins).
//! - `metadata`: the span from the first `{` to the last `}` anywhere in the
//!   text, parsed as a JSON object. A single repair pass swaps single quotes
//!   for double quotes before giving up. The scan covers the whole text,
//!   including the code block itself.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};

static FENCE: Lazy<Option<Regex>> = Lazy::new(|| compile(r"```(?:\w+)?\n([\s\S]*?)```"));

static JSON_OBJECT: Lazy<Option<Regex>> = Lazy::new(|| compile(r"\{[\s\S]*\}"));

fn compile(pattern: &str) -> Option<Regex> {
    match Regex::new(pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            tracing::error!(pattern = %pattern, error = %e, "invalid extraction pattern");
            None
        }
    }
}

/// Result of one extraction pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Extraction {
    pub code: String,
    pub metadata: Map<String, Value>,
    pub raw: String,
}

impl Extraction {
    /// True when the model produced no fenced block (or an empty one).
    pub fn is_code_empty(&self) -> bool {
        self.code.is_empty()
    }
}

/// Split raw model output into `(code, metadata, raw)`.
pub fn extract(raw_text: &str) -> Extraction {
    Extraction {
        code: extract_code(raw_text),
        metadata: extract_metadata(raw_text),
        raw: raw_text.to_string(),
    }
}

fn extract_code(text: &str) -> String {
    FENCE
        .as_ref()
        .and_then(|re| re.captures(text))
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default()
}

fn extract_metadata(text: &str) -> Map<String, Value> {
    let Some(m) = JSON_OBJECT.as_ref().and_then(|re| re.find(text)) else {
        return Map::new();
    };
    let candidate = m.as_str();

    if let Some(obj) = parse_object(candidate) {
        return obj;
    }

    let repaired = candidate.replace('\'', "\"");
    match parse_object(&repaired) {
        Some(obj) => {
            tracing::debug!("metadata recovered after quote repair");
            obj
        }
        None => {
            tracing::debug!(len = candidate.len(), "metadata not parseable, using empty map");
            Map::new()
        }
    }
}

fn parse_object(s: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(s) {
        Ok(Value::Object(obj)) => Some(obj),
        _ => None,
    }
}

/// Typed, best-effort view over the well-known metadata keys.
///
/// Fields with an unexpected JSON type read as absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetadataView {
    pub filename: Option<String>,
    pub language: Option<String>,
    pub description: Option<String>,
    pub dependencies: Vec<String>,
}

impl MetadataView {
    pub fn from_map(map: &Map<String, Value>) -> Self {
        let text = |key: &str| map.get(key).and_then(Value::as_str).map(str::to_string);

        let dependencies = map
            .get("dependencies")
            .and_then(Value::as_array)
            .map(|deps| {
                deps.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Self {
            filename: text("filename"),
            language: text("language"),
            description: text("description"),
            dependencies,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extraction_patterns_compile() {
        assert!(FENCE.is_some());
        assert!(JSON_OBJECT.is_some());
    }

    #[test]
    fn no_fence_yields_empty_code() {
        let out = extract("Sorry, I can't help with that.");
        assert!(out.is_code_empty());
        assert!(out.metadata.is_empty());
        assert_eq!(out.raw, "Sorry, I can't help with that.");
    }

    #[test]
    fn empty_input_degrades_quietly() {
        let out = extract("");
        assert_eq!(out.code, "");
        assert!(out.metadata.is_empty());
    }

    #[test]
    fn fenced_block_with_language_tag_and_metadata() {
        let raw = "Here you go:\n```python\nprint(\"hello\")\n```\n{\"filename\": \"script.py\"}";
        let out = extract(raw);
        assert_eq!(out.code, "print(\"hello\")");
        assert_eq!(out.metadata.get("filename"), Some(&Value::from("script.py")));
    }

    #[test]
    fn first_fence_wins() {
        let raw = "```bash\necho one\n```\ntext\n```bash\necho two\n```";
        assert_eq!(extract(raw).code, "echo one");
    }

    #[test]
    fn interior_is_trimmed() {
        let raw = "```\n\n   x = 1\n\n```";
        assert_eq!(extract(raw).code, "x = 1");
    }

    #[test]
    fn unterminated_fence_is_ignored() {
        let raw = "```python\nprint('never closed')";
        assert_eq!(extract(raw).code, "");
    }

    #[test]
    fn single_quoted_metadata_is_repaired() {
        let raw = "```\nx\n```\n{'filename': 'a.py', 'dependencies': ['requests']}";
        let out = extract(raw);
        let view = MetadataView::from_map(&out.metadata);
        assert_eq!(view.filename.as_deref(), Some("a.py"));
        assert_eq!(view.dependencies, vec!["requests".to_string()]);
    }

    #[test]
    fn unrepairable_metadata_is_empty() {
        let raw = "```\nx\n```\n{filename: script.py,}";
        assert!(extract(raw).metadata.is_empty());
    }

    #[test]
    fn repair_that_breaks_valid_apostrophes_is_empty() {
        // the quote swap turns the apostrophe into a stray quote
        let raw = "{'description': 'it's fine'}";
        assert!(extract(raw).metadata.is_empty());
    }

    #[test]
    fn non_object_json_is_not_metadata() {
        assert!(extract("[1, 2, 3]").metadata.is_empty());
    }

    #[test]
    fn json_inside_code_block_is_absorbed() {
        let raw = "```python\nconfig = {\"retries\": 3}\n```";
        let out = extract(raw);
        assert_eq!(out.code, "config = {\"retries\": 3}");
        assert_eq!(out.metadata.get("retries"), Some(&Value::from(3)));
    }

    #[test]
    fn braces_in_code_and_metadata_span_both() {
        // first `{` to last `}` is not valid JSON here, so metadata degrades
        let raw = "```js\nconst a = {b: 1};\n```\n{\"filename\": \"a.js\"}";
        let out = extract(raw);
        assert_eq!(out.code, "const a = {b: 1};");
        assert!(out.metadata.is_empty());
    }

    #[test]
    fn metadata_view_ignores_wrong_types() {
        let raw = "{\"filename\": 7, \"language\": \"bash\", \"dependencies\": \"curl\"}";
        let view = MetadataView::from_map(&extract(raw).metadata);
        assert_eq!(view.filename, None);
        assert_eq!(view.language.as_deref(), Some("bash"));
        assert!(view.dependencies.is_empty());
    }
}
