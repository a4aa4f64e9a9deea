// src/backend/mod.rs

//! Code-generation backends.
//!
//! Every backend implements one capability: take a structured [`Prompt`],
//! return free text. Vendors and local model runners are interchangeable and
//! picked from config by [`build_backend`]. Backends make exactly one request
//! per call and never retry; retry policy belongs to the caller.

pub mod fixture;
pub mod huggingface;
pub mod ollama;
pub mod openai;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{BackendConfig, BackendKind};

pub use fixture::FixtureBackend;
pub use huggingface::HuggingFaceBackend;
pub use ollama::OllamaBackend;
pub use openai::OpenAiBackend;

/// One generation request as the backend sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    pub system_instruction: String,
    pub user_instruction: String,
    pub max_output_tokens: u32,
    pub temperature: f32,
}

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("generation backend unavailable: {0}")]
    Unavailable(String),

    #[error("generation backend timed out after {0:?}")]
    Timeout(Duration),

    #[error("generation backend returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("generation backend protocol error: {0}")]
    Protocol(String),
}

impl BackendError {
    /// Stable label used in responses and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            BackendError::Unavailable(_) => "unavailable",
            BackendError::Timeout(_) => "timeout",
            BackendError::Status { status, .. } if *status == 429 || *status >= 500 => {
                "unavailable"
            }
            BackendError::Status { .. } => "protocol",
            BackendError::Protocol(_) => "protocol",
        }
    }
}

/// The generation capability: structured prompt in, free text out.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Short name for logs and audit fields.
    fn name(&self) -> &str;

    async fn complete(&self, prompt: &Prompt) -> Result<String, BackendError>;
}

/// Build the backend named in config.
pub fn build_backend(cfg: &BackendConfig) -> Result<Arc<dyn GenerationBackend>> {
    let timeout = Duration::from_secs(cfg.timeout_secs.max(1));

    let backend: Arc<dyn GenerationBackend> = match cfg.kind {
        BackendKind::Openai => Arc::new(OpenAiBackend::new(
            http_client(timeout)?,
            cfg.base_url(),
            cfg.model(),
            cfg.api_key(),
            timeout,
        )),
        BackendKind::Huggingface => Arc::new(HuggingFaceBackend::new(
            http_client(timeout)?,
            cfg.base_url(),
            cfg.model(),
            cfg.api_key(),
            timeout,
        )),
        BackendKind::Ollama => Arc::new(OllamaBackend::new(
            http_client(timeout)?,
            cfg.base_url(),
            cfg.model(),
            timeout,
        )),
        BackendKind::Fixture => {
            let path = cfg
                .fixture
                .clone()
                .context("backend.fixture must be set when backend.kind = fixture")?;
            Arc::new(FixtureBackend::new(path))
        }
    };

    if cfg.kind.default_api_key_env().is_some() && cfg.api_key().is_none() {
        tracing::warn!(
            backend = cfg.kind.as_str(),
            "no API key in environment; requests will likely be rejected"
        );
    }

    Ok(backend)
}

fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .context("Failed to build HTTP client")
}

pub(crate) fn json_headers(api_key: Option<&str>) -> Result<HeaderMap, BackendError> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    if let Some(key) = api_key {
        let value = HeaderValue::from_str(&format!("Bearer {}", key))
            .map_err(|_| BackendError::Protocol("API key is not a valid header value".into()))?;
        headers.insert(AUTHORIZATION, value);
    }

    Ok(headers)
}

/// POST a JSON body and decode a JSON response, mapping every failure onto
/// the backend error taxonomy.
pub(crate) async fn post_json(
    client: &reqwest::Client,
    url: &str,
    headers: HeaderMap,
    body: &Value,
    timeout: Duration,
) -> Result<Value, BackendError> {
    let resp = client
        .post(url)
        .headers(headers)
        .json(body)
        .send()
        .await
        .map_err(|e| map_transport_error(e, timeout))?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(BackendError::Status {
            status: status.as_u16(),
            body: truncate(&body, 512),
        });
    }

    resp.json::<Value>()
        .await
        .map_err(|e| match e.is_timeout() {
            true => BackendError::Timeout(timeout),
            false => BackendError::Protocol(format!("response is not JSON: {}", e)),
        })
}

fn map_transport_error(e: reqwest::Error, timeout: Duration) -> BackendError {
    if e.is_timeout() {
        BackendError::Timeout(timeout)
    } else {
        BackendError::Unavailable(e.to_string())
    }
}

fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}…", &s[..idx]),
        None => s.to_string(),
    }
}
