// src/backend/huggingface.rs

use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

use super::{json_headers, post_json, BackendError, GenerationBackend, Prompt};

/// Hugging Face Inference API (`POST {base}/{model}`).
///
/// The API takes a single `inputs` string, so the system and user
/// instructions are joined into one prompt.
pub struct HuggingFaceBackend {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl HuggingFaceBackend {
    pub fn new(
        client: reqwest::Client,
        base_url: String,
        model: String,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            base_url,
            model,
            api_key,
            timeout,
        }
    }
}

#[async_trait]
impl GenerationBackend for HuggingFaceBackend {
    fn name(&self) -> &str {
        "huggingface"
    }

    async fn complete(&self, prompt: &Prompt) -> Result<String, BackendError> {
        let url = format!("{}/{}", self.base_url, self.model);
        let headers = json_headers(self.api_key.as_deref())?;

        let body = json!({
            "inputs": format!(
                "{}\n\n{}",
                prompt.system_instruction.trim(),
                prompt.user_instruction.trim()
            ),
            "parameters": {
                "max_new_tokens": prompt.max_output_tokens,
                "temperature": prompt.temperature,
                // otherwise the prompt, with its example metadata object, is echoed back
                "return_full_text": false,
            },
        });

        let data = post_json(&self.client, &url, headers, &body, self.timeout).await?;
        Ok(generated_text(data))
    }
}

/// Endpoints answer with `[{generated_text}]`, `{generated_text}` or a bare
/// string depending on the model; anything else is passed on as JSON text.
fn generated_text(data: Value) -> String {
    if let Some(text) = data
        .get(0)
        .and_then(|first| first.get("generated_text"))
        .and_then(Value::as_str)
    {
        return text.to_string();
    }

    if let Some(text) = data.get("generated_text").and_then(Value::as_str) {
        return text.to_string();
    }

    match data {
        Value::String(s) => s,
        other => other.to_string(),
    }
}
