// src/backend/openai.rs

use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

use super::{json_headers, post_json, BackendError, GenerationBackend, Prompt};

/// OpenAI-compatible Chat Completions endpoint.
pub struct OpenAiBackend {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl OpenAiBackend {
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

    fn request_body(&self, prompt: &Prompt) -> Value {
        json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": prompt.system_instruction },
                { "role": "user", "content": prompt.user_instruction },
            ],
            "max_tokens": prompt.max_output_tokens,
            "temperature": prompt.temperature,
        })
    }
}

#[async_trait]
impl GenerationBackend for OpenAiBackend {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, prompt: &Prompt) -> Result<String, BackendError> {
        let url = format!("{}/chat/completions", self.base_url);
        let headers = json_headers(self.api_key.as_deref())?;

        let data = post_json(
            &self.client,
            &url,
            headers,
            &self.request_body(prompt),
            self.timeout,
        )
        .await?;

        message_content(&data)
    }
}

fn message_content(data: &Value) -> Result<String, BackendError> {
    data.pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| BackendError::Protocol("missing choices[0].message.content".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::testing::serve_json;

    fn prompt() -> Prompt {
        Prompt {
            system_instruction: "sys".into(),
            user_instruction: "usr".into(),
            max_output_tokens: 64,
            temperature: 0.0,
        }
    }

    #[test]
    fn content_is_read_from_first_choice() {
        let data = json!({"choices": [{"message": {"content": "```\nx\n```"}}]});
        assert_eq!(message_content(&data).unwrap(), "```\nx\n```");
    }

    #[test]
    fn missing_content_is_protocol_error() {
        let err = message_content(&json!({"choices": []})).unwrap_err();
        assert!(matches!(err, BackendError::Protocol(_)));
    }

    #[tokio::test]
    async fn sends_system_and_user_messages() {
        let reply = json!({"choices": [{"message": {"content": "done"}}]});
        let (base, seen) = serve_json("/chat/completions", 200, reply).await;

        let backend = OpenAiBackend::new(
            reqwest::Client::new(),
            base,
            "gpt-test".into(),
            Some("sk-test".into()),
            Duration::from_secs(5),
        );
        let text = backend.complete(&prompt()).await.unwrap();
        assert_eq!(text, "done");

        let bodies = seen.lock().unwrap();
        let body = &bodies[0];
        assert_eq!(body["model"], "gpt-test");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "usr");
        assert_eq!(body["max_tokens"], 64);
        assert_eq!(body["temperature"], 0.0);
    }
}
