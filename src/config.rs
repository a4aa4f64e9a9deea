// src/config.rs

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, path::PathBuf};

use crate::language::TargetLanguage;

/// Root configuration loaded from `config.yaml`.
///
/// This file controls:
/// - Which generation backend is used (and how long to wait for it)
/// - Whether generated scripts may run locally at all
/// - Which interpreter binaries run each language
/// - Server bind address and CLI output format
///
/// Secrets are never read from this file. The backend API key comes from the
/// environment variable named by `backend.api_key_env`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,

    #[serde(default)]
    pub execution: ExecutionConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

/// Which concrete backend implements the generation capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Openai,
    Huggingface,
    Ollama,
    Fixture,
}

impl BackendKind {
    pub fn as_str(self) -> &'static str {
        match self {
            BackendKind::Openai => "openai",
            BackendKind::Huggingface => "huggingface",
            BackendKind::Ollama => "ollama",
            BackendKind::Fixture => "fixture",
        }
    }

    fn parse(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(BackendKind::Openai),
            "huggingface" | "hf" => Ok(BackendKind::Huggingface),
            "ollama" => Ok(BackendKind::Ollama),
            "fixture" => Ok(BackendKind::Fixture),
            other => bail!("Unknown backend kind: {}", other),
        }
    }

    pub fn default_model(self) -> &'static str {
        match self {
            BackendKind::Openai => "gpt-4o-mini",
            BackendKind::Huggingface => "deepseek-ai/DeepSeek-Coder-V2-Instruct",
            BackendKind::Ollama => "codellama",
            BackendKind::Fixture => "fixture",
        }
    }

    pub fn default_base_url(self) -> &'static str {
        match self {
            BackendKind::Openai => "https://api.openai.com/v1",
            BackendKind::Huggingface => "https://api-inference.huggingface.co/models",
            BackendKind::Ollama => "http://localhost:11434",
            BackendKind::Fixture => "",
        }
    }

    pub fn default_api_key_env(self) -> Option<&'static str> {
        match self {
            BackendKind::Openai => Some("OPENAI_API_KEY"),
            BackendKind::Huggingface => Some("HF_API_KEY"),
            BackendKind::Ollama | BackendKind::Fixture => None,
        }
    }
}

/// Backend section.
///
/// Example:
///
/// backend:
///   kind: openai
///   model: gpt-4o-mini
///   timeout_secs: 120
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendConfig {
    #[serde(default = "default_backend_kind")]
    pub kind: BackendKind,

    /// Falls back to the kind's default model.
    #[serde(default)]
    pub model: Option<String>,

    /// Falls back to the kind's public endpoint.
    #[serde(default)]
    pub base_url: Option<String>,

    /// Name of the env var holding the API key.
    #[serde(default)]
    pub api_key_env: Option<String>,

    #[serde(default = "default_backend_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,

    /// Canned response file, only used when kind = fixture.
    #[serde(default)]
    pub fixture: Option<PathBuf>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: default_backend_kind(),
            model: None,
            base_url: None,
            api_key_env: None,
            timeout_secs: default_backend_timeout(),
            max_output_tokens: default_max_output_tokens(),
            fixture: None,
        }
    }
}

impl BackendConfig {
    pub fn model(&self) -> String {
        self.model
            .clone()
            .unwrap_or_else(|| self.kind.default_model().to_string())
    }

    pub fn base_url(&self) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| self.kind.default_base_url().to_string())
            .trim_end_matches('/')
            .to_string()
    }

    /// Resolve the API key from the environment, if this backend uses one.
    pub fn api_key(&self) -> Option<String> {
        let var = self
            .api_key_env
            .as_deref()
            .or_else(|| self.kind.default_api_key_env())?;
        std::env::var(var).ok().filter(|v| !v.trim().is_empty())
    }
}

fn default_backend_kind() -> BackendKind {
    BackendKind::Openai
}

fn default_backend_timeout() -> u64 {
    120
}

fn default_max_output_tokens() -> u32 {
    900
}

/// Local execution section.
///
/// Example:
///
/// execution:
///   enabled: false
///   timeout_secs: 10
///   interpreters:
///     python: python3
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExecutionConfig {
    /// Operator opt-in. Per-request `run` flags are ignored unless this is set.
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_exec_timeout")]
    pub timeout_secs: u64,

    /// Parent directory for per-run scratch dirs (system temp when unset).
    #[serde(default)]
    pub scratch_dir: Option<PathBuf>,

    #[serde(default)]
    pub interpreters: Interpreters,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            timeout_secs: default_exec_timeout(),
            scratch_dir: None,
            interpreters: Interpreters::default(),
        }
    }
}

fn default_exec_timeout() -> u64 {
    10
}

/// Interpreter binaries, one per language.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Interpreters {
    #[serde(default = "default_python")]
    pub python: String,

    #[serde(default = "default_powershell")]
    pub powershell: String,

    #[serde(default = "default_bash")]
    pub bash: String,

    #[serde(default = "default_node")]
    pub javascript: String,
}

impl Default for Interpreters {
    fn default() -> Self {
        Self {
            python: default_python(),
            powershell: default_powershell(),
            bash: default_bash(),
            javascript: default_node(),
        }
    }
}

impl Interpreters {
    pub fn for_language(&self, language: TargetLanguage) -> &str {
        match language {
            TargetLanguage::Python => &self.python,
            TargetLanguage::Powershell => &self.powershell,
            TargetLanguage::Bash => &self.bash,
            TargetLanguage::Javascript => &self.javascript,
        }
    }
}

fn default_python() -> String {
    "python3".to_string()
}

fn default_powershell() -> String {
    "pwsh".to_string()
}

fn default_bash() -> String {
    "bash".to_string()
}

fn default_node() -> String {
    "node".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_addr")]
    pub addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: default_addr(),
        }
    }
}

fn default_addr() -> String {
    "127.0.0.1:8080".to_string()
}

/// Output configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_mode")]
    pub mode: OutputMode,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            mode: default_output_mode(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    Stdout,
    Pretty,
    Simple,
}

fn default_output_mode() -> OutputMode {
    OutputMode::Pretty
}

impl Config {
    /// Load and parse `config.yaml` from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let cfg: Config = serde_yaml::from_str(&raw).context("Failed to parse YAML config")?;

        Ok(cfg)
    }

    /// Load `path` if it exists, otherwise start from defaults, then apply
    /// environment overrides.
    pub fn resolve(path: &Path) -> Result<Self> {
        let mut cfg = if path.exists() {
            Self::load(path)?
        } else {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            Config::default()
        };
        cfg.apply_env(|k| std::env::var(k).ok())?;
        Ok(cfg)
    }

    /// Apply environment overrides through `lookup` (injectable for tests).
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("ALLOW_LOCAL_RUN") {
            self.execution.enabled = v.trim().eq_ignore_ascii_case("true");
        }
        if let Some(v) = lookup("SCRIPTGEN_BACKEND") {
            self.backend.kind = BackendKind::parse(&v)?;
        }
        if let Some(v) = lookup("SCRIPTGEN_MODEL") {
            self.backend.model = Some(v);
        }
        if let Some(v) = lookup("SCRIPTGEN_BASE_URL") {
            self.backend.base_url = Some(v);
        }
        Ok(())
    }
}
