// src/runner.rs

use crate::cli::{Cli, Command};
use crate::config::{Config, OutputMode};
use crate::engine::{Engine, GenerateResponse, RawRequest};
use crate::runtime;
use crate::safety::check_safety;
use crate::sandbox::ExecutionResult;
use crate::util::read_to_string;

use anyhow::{bail, Context, Result};
use std::io::IsTerminal;
use std::path::Path;
use std::sync::Arc;

/// Entry point from `main.rs`.
pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Init => init_scaffold(&cli.config),

        Command::Check { file } => check_file(&file),

        Command::Serve { addr } => {
            let cfg = Config::resolve(&cli.config)?;
            let addr = addr.unwrap_or_else(|| cfg.server.addr.clone());
            let engine = Arc::new(Engine::from_config(&cfg)?);
            runtime::serve(&addr, engine).await
        }

        Command::Generate {
            task,
            language,
            run,
            output,
        } => {
            let mut cfg = Config::resolve(&cli.config)?;

            // CLI overrides
            if let Some(mode) = output {
                cfg.output.mode = mode;
            }

            let engine = Engine::from_config(&cfg)?;
            let resp = engine
                .run_generation(RawRequest {
                    task_description: task,
                    language,
                    execute_after_generate: run,
                })
                .await;

            println!("{}", render_response(cfg.output.mode, &resp, should_use_color())?);

            if !resp.ok {
                bail!("Generation failed ({:?})", resp.status);
            }
            Ok(())
        }
    }
}

/* ---------------- check ---------------- */

fn check_file(path: &Path) -> Result<()> {
    let code = read_to_string(path)?;
    let issues = check_safety(&code);

    let out = serde_json::json!({
        "file": path.display().to_string(),
        "safe": issues.is_empty(),
        "safety_issues": issues,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);

    if !issues.is_empty() {
        bail!("{} denylist pattern(s) matched", issues.len());
    }
    Ok(())
}

/* ---------------- rendering ---------------- */

fn render_response(mode: OutputMode, resp: &GenerateResponse, use_color: bool) -> Result<String> {
    match mode {
        OutputMode::Stdout => {
            serde_json::to_string(resp).context("Failed to format output as JSON")
        }
        OutputMode::Pretty => {
            serde_json::to_string_pretty(resp).context("Failed to format output as pretty JSON")
        }
        OutputMode::Simple => Ok(format_simple_output(resp, use_color)),
    }
}

fn format_simple_output(resp: &GenerateResponse, use_color: bool) -> String {
    let status = if resp.ok { "OK" } else { "FAIL" };
    let status = paint(status, if resp.ok { "32" } else { "31" }, use_color);

    let mut out = String::new();
    out.push_str(&format!("{} {:?}\n", status, resp.status));
    out.push_str(&format!("request: {}\n", resp.request_id));

    if let Some(err) = &resp.error {
        out.push_str(&format!("error: {}\n", err));
    }
    for v in &resp.validation_errors {
        out.push_str(&format!("- {}: {}\n", v.code, v.message));
    }
    if let Some(issues) = resp.safety_issues.as_ref().filter(|i| !i.is_empty()) {
        out.push_str("safety issues:\n");
        for issue in issues {
            out.push_str(&format!("- {}\n", issue));
        }
    }
    if let Some(reason) = &resp.execution_skipped {
        out.push_str(&format!("execution skipped: {}\n", reason));
    }
    if let Some(code) = &resp.code {
        out.push_str("code:\n");
        out.push_str(code);
        out.push('\n');
    }

    match &resp.run_result {
        Some(ExecutionResult::Completed {
            exit_code,
            stdout,
            stderr,
            duration_ms,
            max_rss_kb,
        }) => {
            let mem = max_rss_kb
                .map(|v| format!("{}kb", v))
                .unwrap_or_else(|| "n/a".to_string());
            out.push_str(&format!(
                "exit: {}  time: {}ms  memory: {}\n",
                exit_code, duration_ms, mem
            ));
            if !stdout.is_empty() {
                out.push_str("stdout:\n");
                out.push_str(stdout.trim_end());
                out.push('\n');
            }
            if !stderr.is_empty() {
                out.push_str("stderr:\n");
                out.push_str(stderr.trim_end());
                out.push('\n');
            }
        }
        Some(ExecutionResult::Failed {
            failure_reason,
            message,
        }) => {
            let label = paint(&format!("{:?}", failure_reason), "33", use_color);
            out.push_str(&format!("run failed: {} ({})\n", label, message));
        }
        None => {}
    }

    out.trim_end().to_string()
}

fn should_use_color() -> bool {
    if std::env::var_os("NO_COLOR").is_some() {
        return false;
    }
    std::io::stdout().is_terminal()
}

fn paint(text: &str, color: &str, use_color: bool) -> String {
    if use_color {
        format!("\x1b[{}m{}\x1b[0m", color, text)
    } else {
        text.to_string()
    }
}

/* ---------------- init ---------------- */

fn init_scaffold(config_path: &Path) -> Result<()> {
    if config_path.exists() {
        eprintln!("{} already exists (skipping)", config_path.display());
        return Ok(());
    }

    std::fs::write(config_path, default_config_yaml())
        .with_context(|| format!("Failed to write {:?}", config_path))?;
    eprintln!("Created {}", config_path.display());
    Ok(())
}

fn default_config_yaml() -> &'static str {
    r#"# scriptgen configuration
backend:
  kind: openai            # openai | huggingface | ollama | fixture
  model: gpt-4o-mini
  api_key_env: OPENAI_API_KEY
  timeout_secs: 120
  max_output_tokens: 900

execution:
  # Generated scripts only run when this is true (or ALLOW_LOCAL_RUN=true).
  # This is NOT a security sandbox; use a container or VM for untrusted code.
  enabled: false
  timeout_secs: 10
  interpreters:
    python: python3
    powershell: pwsh
    bash: bash
    javascript: node

server:
  addr: 127.0.0.1:8080

output:
  mode: pretty            # stdout | pretty | simple
"#
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::PipelineStatus;
    use crate::ids::RequestId;
    use crate::sandbox::ExecutionFailure;

    #[test]
    fn starter_config_parses() {
        let cfg: Config = serde_yaml::from_str(default_config_yaml()).unwrap();
        assert!(!cfg.execution.enabled);
        assert_eq!(cfg.output.mode, OutputMode::Pretty);
    }

    #[test]
    fn init_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "custom: true").unwrap();

        init_scaffold(&path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "custom: true");
    }

    #[test]
    fn simple_output_shows_blocked_patterns() {
        let mut resp = GenerateResponse::new(RequestId::new(), PipelineStatus::SafetyBlocked);
        resp.safety_issues = Some(vec![r"rm\s+-rf".to_string()]);
        resp.error = Some("Safety checks failed".into());

        let text = format_simple_output(&resp, false);
        assert!(text.starts_with("FAIL SafetyBlocked"));
        assert!(text.contains(r"- rm\s+-rf"));
    }

    #[test]
    fn simple_output_shows_run_failure() {
        let mut resp = GenerateResponse::new(RequestId::new(), PipelineStatus::Executed);
        resp.code = Some("sleep 100".into());
        resp.run_result = Some(ExecutionResult::failed(ExecutionFailure::Timeout, "too slow"));

        let text = format_simple_output(&resp, false);
        assert!(text.starts_with("OK Executed"));
        assert!(text.contains("run failed: Timeout (too slow)"));
    }

    #[test]
    fn check_file_fails_on_match() {
        let dir = tempfile::tempdir().unwrap();
        let bad = dir.path().join("bad.sh");
        let good = dir.path().join("good.sh");
        std::fs::write(&bad, "rm -rf /").unwrap();
        std::fs::write(&good, "echo hi").unwrap();

        assert!(check_file(&bad).is_err());
        assert!(check_file(&good).is_ok());
    }
}
