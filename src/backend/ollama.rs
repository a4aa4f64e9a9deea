// src/backend/ollama.rs

use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

use super::{json_headers, post_json, BackendError, GenerationBackend, Prompt};

/// Local model runner speaking the Ollama `/api/generate` protocol.
pub struct OllamaBackend {
    client: reqwest::Client,
    base_url: String,
    model: String,
    timeout: Duration,
}

impl OllamaBackend {
    pub fn new(client: reqwest::Client, base_url: String, model: String, timeout: Duration) -> Self {
        Self {
            client,
            base_url,
            model,
            timeout,
        }
    }
}

#[async_trait]
impl GenerationBackend for OllamaBackend {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn complete(&self, prompt: &Prompt) -> Result<String, BackendError> {
        let url = format!("{}/api/generate", self.base_url);

        let body = json!({
            "model": self.model,
            "system": prompt.system_instruction,
            "prompt": prompt.user_instruction,
            "stream": false,
            "options": {
                "temperature": prompt.temperature,
                "num_predict": prompt.max_output_tokens,
            },
        });

        let data = post_json(&self.client, &url, json_headers(None)?, &body, self.timeout).await?;

        data.get("response")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| BackendError::Protocol("missing `response` field".into()))
    }
}
