//! End-to-end: fixture backend → extractor → gate → real sandbox.

#![cfg(unix)]

use scriptgen::config::{BackendConfig, BackendKind, Config};
use scriptgen::engine::{Engine, PipelineStatus, RawRequest};
use scriptgen::sandbox::{ExecutionFailure, ExecutionResult};
use std::path::Path;

fn config(reply_file: &Path, scratch: &Path, enabled: bool, timeout_secs: u64) -> Config {
    let mut cfg = Config::default();
    cfg.backend = BackendConfig {
        kind: BackendKind::Fixture,
        fixture: Some(reply_file.to_path_buf()),
        ..BackendConfig::default()
    };
    cfg.execution.enabled = enabled;
    cfg.execution.timeout_secs = timeout_secs;
    cfg.execution.scratch_dir = Some(scratch.to_path_buf());
    cfg
}

fn request(task: &str, language: &str) -> RawRequest {
    RawRequest {
        task_description: task.into(),
        language: language.into(),
        execute_after_generate: true,
    }
}

fn scratch_entries(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
}

#[tokio::test]
async fn generated_bash_script_runs_and_is_cleaned_up() {
    let dir = tempfile::tempdir().unwrap();
    let reply = dir.path().join("reply.md");
    let scratch = dir.path().join("scratch");
    std::fs::write(
        &reply,
        "Sure:\n```bash\necho \"hello from $(basename \"$PWD\" | cut -c1-10)\"\n```\n\
         {\"filename\": \"hello.sh\", \"language\": \"bash\", \"dependencies\": []}",
    )
    .unwrap();

    let engine = Engine::from_config(&config(&reply, &scratch, true, 10)).unwrap();
    let resp = engine.run_generation(request("say hello", "bash")).await;

    assert!(resp.ok, "{resp:?}");
    assert_eq!(resp.status, PipelineStatus::Executed);
    match resp.run_result {
        Some(ExecutionResult::Completed {
            exit_code, stdout, ..
        }) => {
            assert_eq!(exit_code, 0);
            assert_eq!(stdout, "hello from scriptgen-\n");
        }
        other => panic!("unexpected run result: {other:?}"),
    }
    assert_eq!(scratch_entries(&scratch), 0);
}

#[tokio::test]
async fn blocked_script_never_touches_the_sandbox() {
    let dir = tempfile::tempdir().unwrap();
    let reply = dir.path().join("reply.md");
    let scratch = dir.path().join("scratch");
    std::fs::write(&reply, "```bash\nrm -rf /\n```").unwrap();

    let engine = Engine::from_config(&config(&reply, &scratch, true, 10)).unwrap();
    let resp = engine.run_generation(request("wipe everything", "bash")).await;

    assert!(!resp.ok);
    assert_eq!(resp.status, PipelineStatus::SafetyBlocked);
    assert_eq!(resp.safety_issues, Some(vec![r"rm\s+-rf".to_string()]));
    assert!(resp.run_result.is_none());
    assert!(!scratch.exists());
}

#[tokio::test]
async fn operator_flag_gates_execution() {
    let dir = tempfile::tempdir().unwrap();
    let reply = dir.path().join("reply.md");
    let scratch = dir.path().join("scratch");
    std::fs::write(&reply, "```bash\necho hi\n```").unwrap();

    let engine = Engine::from_config(&config(&reply, &scratch, false, 10)).unwrap();
    let resp = engine.run_generation(request("say hi", "bash")).await;

    assert!(resp.ok);
    assert_eq!(resp.status, PipelineStatus::ExecutionSkipped);
    assert!(resp.run_result.is_none());
    assert!(resp.error.is_none());
    assert!(!scratch.exists());
}

#[tokio::test]
async fn hanging_script_times_out() {
    let dir = tempfile::tempdir().unwrap();
    let reply = dir.path().join("reply.md");
    let scratch = dir.path().join("scratch");
    std::fs::write(&reply, "```bash\nwhile true; do sleep 1; done\n```").unwrap();

    let engine = Engine::from_config(&config(&reply, &scratch, true, 1)).unwrap();
    let start = std::time::Instant::now();
    let resp = engine.run_generation(request("loop forever", "bash")).await;

    assert!(start.elapsed() < std::time::Duration::from_secs(6));
    assert_eq!(resp.status, PipelineStatus::Executed);
    assert_eq!(
        resp.run_result.and_then(|r| r.failure_reason()),
        Some(ExecutionFailure::Timeout)
    );
    assert_eq!(scratch_entries(&scratch), 0);
}

#[tokio::test]
async fn missing_fixture_is_a_generation_failure() {
    let dir = tempfile::tempdir().unwrap();
    let engine = Engine::from_config(&config(
        &dir.path().join("absent.md"),
        dir.path(),
        true,
        1,
    ))
    .unwrap();

    let resp = engine.run_generation(request("anything at all", "python")).await;
    assert!(!resp.ok);
    assert_eq!(resp.status, PipelineStatus::GenerationFailed);
    assert_eq!(resp.error_kind, Some("unavailable"));
}
