// src/sandbox/executor.rs

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;

use super::metrics::MemoryTracker;
use super::{ExecutionFailure, ExecutionResult, Sandbox};
use crate::config::{ExecutionConfig, Interpreters};
use crate::ids::run_token;
use crate::language::TargetLanguage;
use crate::util::ensure_dir;

/// How long to wait for output pipes to drain once the process group is gone.
const PIPE_DRAIN_GRACE: Duration = Duration::from_secs(2);

const MEMORY_SAMPLE_INTERVAL: Duration = Duration::from_millis(20);

/// Runs scripts as child processes inside per-run scratch directories.
#[derive(Debug, Clone)]
pub struct SandboxExecutor {
    interpreters: Interpreters,
    scratch_root: Option<PathBuf>,
}

impl SandboxExecutor {
    pub fn new(interpreters: Interpreters) -> Self {
        Self {
            interpreters,
            scratch_root: None,
        }
    }

    pub fn from_config(cfg: &ExecutionConfig) -> Self {
        Self {
            interpreters: cfg.interpreters.clone(),
            scratch_root: cfg.scratch_dir.clone(),
        }
    }

    /// Create scratch directories under `root` instead of the system temp dir.
    pub fn with_scratch_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.scratch_root = Some(root.into());
        self
    }

    /// Locate the interpreter binary for `language` on this host.
    pub fn resolve_interpreter(&self, language: TargetLanguage) -> Result<PathBuf, String> {
        let configured = self.interpreters.for_language(language);

        if let Ok(path) = which::which(configured) {
            return Ok(path);
        }

        // Windows PowerShell as a fallback for a missing PowerShell Core
        if language == TargetLanguage::Powershell {
            if let Ok(path) = which::which("powershell") {
                return Ok(path);
            }
        }

        Err(format!(
            "{} interpreter '{}' not found on this host",
            language, configured
        ))
    }

    fn scratch_dir(&self) -> anyhow::Result<TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("scriptgen-");

        let dir = match &self.scratch_root {
            Some(root) => {
                ensure_dir(root)?;
                builder.tempdir_in(root)?
            }
            None => builder.tempdir()?,
        };
        Ok(dir)
    }

    async fn run_in_scratch(
        &self,
        dir: &Path,
        interpreter: &Path,
        code: &str,
        language: TargetLanguage,
        timeout: Duration,
    ) -> ExecutionResult {
        let script_path = dir.join(format!("script_{}.{}", run_token(), language.extension()));

        if let Err(e) = tokio::fs::write(&script_path, code).await {
            return ExecutionResult::failed(
                ExecutionFailure::IoError,
                format!("failed to write script: {}", e),
            );
        }

        let mut cmd = Command::new(interpreter);
        cmd.args(language.interpreter_args())
            .arg(&script_path)
            .current_dir(dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // own process group, so the whole tree can be signalled at once
        #[cfg(unix)]
        cmd.process_group(0);

        let start = Instant::now();
        let mut child = match cmd.spawn() {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return ExecutionResult::failed(
                    ExecutionFailure::InterpreterNotFound,
                    format!("failed to spawn {}: {}", interpreter.display(), e),
                );
            }
            Err(e) => {
                return ExecutionResult::failed(
                    ExecutionFailure::IoError,
                    format!("failed to spawn {}: {}", interpreter.display(), e),
                );
            }
        };

        let pid = child.id();
        // kill_on_drop only reaches the direct child if this future is dropped
        let group_guard = ProcessGroupGuard::new(pid);
        let mem = pid.map(|p| MemoryTracker::start(p, MEMORY_SAMPLE_INTERVAL));
        let stdout_task = drain(child.stdout.take());
        let stderr_task = drain(child.stderr.take());

        let waited = tokio::time::timeout(timeout, child.wait()).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        // reap strays on every path so nothing outlives the run
        terminate(&mut child, pid).await;
        group_guard.disarm();
        let max_rss_kb = match mem {
            Some(tracker) => tracker.stop_and_take().await,
            None => None,
        };

        match waited {
            Ok(Ok(status)) => {
                let stdout = collect(stdout_task).await;
                let stderr = collect(stderr_task).await;

                tracing::info!(
                    language = %language,
                    exit_code = ?status.code(),
                    duration_ms,
                    "script finished"
                );

                ExecutionResult::Completed {
                    exit_code: status.code().unwrap_or(-1),
                    stdout,
                    stderr,
                    duration_ms,
                    max_rss_kb,
                }
            }
            Ok(Err(e)) => {
                stdout_task.abort();
                stderr_task.abort();
                ExecutionResult::failed(
                    ExecutionFailure::IoError,
                    format!("failed while waiting for script: {}", e),
                )
            }
            Err(_) => {
                stdout_task.abort();
                stderr_task.abort();
                tracing::warn!(language = %language, timeout_ms = timeout.as_millis() as u64, "script timed out, process group killed");
                ExecutionResult::failed(
                    ExecutionFailure::Timeout,
                    format!("script exceeded timeout of {:?}", timeout),
                )
            }
        }
    }
}

#[async_trait]
impl Sandbox for SandboxExecutor {
    async fn run(&self, code: &str, language: TargetLanguage, timeout: Duration) -> ExecutionResult {
        // resolve before touching the filesystem
        let interpreter = match self.resolve_interpreter(language) {
            Ok(path) => path,
            Err(msg) => {
                tracing::warn!(language = %language, "{}", msg);
                return ExecutionResult::failed(ExecutionFailure::InterpreterNotFound, msg);
            }
        };

        let scratch = match self.scratch_dir() {
            Ok(dir) => dir,
            Err(e) => {
                return ExecutionResult::failed(
                    ExecutionFailure::IoError,
                    format!("failed to create scratch dir: {:#}", e),
                );
            }
        };

        tracing::debug!(dir = %scratch.path().display(), interpreter = %interpreter.display(), "running script");

        let result = self
            .run_in_scratch(scratch.path(), &interpreter, code, language, timeout)
            .await;

        let dir = scratch.path().to_path_buf();
        if let Err(e) = scratch.close() {
            tracing::warn!(dir = %dir.display(), error = %e, "failed to remove scratch dir");
        }

        result
    }
}

/// Output pipe being read in the background. Bytes land in a shared buffer
/// so a drain cut short by the grace period still keeps what it read.
struct Drain {
    buf: Arc<Mutex<Vec<u8>>>,
    task: JoinHandle<()>,
}

impl Drain {
    fn abort(&self) {
        self.task.abort();
    }
}

fn drain<R>(stream: Option<R>) -> Drain
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let buf = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&buf);

    let task = tokio::spawn(async move {
        let Some(mut s) = stream else {
            return;
        };
        let mut chunk = [0u8; 8192];
        loop {
            match s.read(&mut chunk).await {
                Ok(0) | Err(_) => break,
                Ok(n) => lock(&sink).extend_from_slice(&chunk[..n]),
            }
        }
    });

    Drain { buf, task }
}

/// Wait up to [`PIPE_DRAIN_GRACE`] for EOF, then take whatever was read.
///
/// A detached grandchild (e.g. via `setsid`) can hold the pipe open after
/// the group is gone; its output so far is still returned.
async fn collect(mut drain: Drain) -> String {
    if tokio::time::timeout(PIPE_DRAIN_GRACE, &mut drain.task)
        .await
        .is_err()
    {
        drain.task.abort();
        tracing::debug!("output pipe still open after grace period");
    }
    let bytes = std::mem::take(&mut *lock(&drain.buf));
    String::from_utf8_lossy(&bytes).into_owned()
}

fn lock(buf: &Mutex<Vec<u8>>) -> std::sync::MutexGuard<'_, Vec<u8>> {
    buf.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Kills the child's process group when dropped while still armed, which
/// happens when a caller abandons the run future mid-flight.
struct ProcessGroupGuard {
    pid: Option<u32>,
}

impl ProcessGroupGuard {
    fn new(pid: Option<u32>) -> Self {
        Self { pid }
    }

    /// The group was already signalled and the child reaped.
    fn disarm(mut self) {
        self.pid = None;
    }
}

impl Drop for ProcessGroupGuard {
    fn drop(&mut self) {
        #[cfg(unix)]
        if let Some(pid) = self.pid.take() {
            tracing::debug!(pgid = pid, "run abandoned, killing process group");
            kill_process_group(pid);
        }
    }
}

/// Kill the child's process group (unix) and the child itself, then reap it.
async fn terminate(child: &mut Child, pid: Option<u32>) {
    #[cfg(unix)]
    if let Some(pid) = pid {
        kill_process_group(pid);
    }
    #[cfg(not(unix))]
    let _ = pid;

    // no-op when the child was already reaped
    if let Err(e) = child.kill().await {
        tracing::debug!(error = %e, "child kill after exit");
    }
}

#[cfg(unix)]
fn kill_process_group(pid: u32) {
    use nix::errno::Errno;
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(pid) else {
        return;
    };

    match killpg(Pid::from_raw(raw), Signal::SIGKILL) {
        Ok(()) | Err(Errno::ESRCH) => {}
        Err(e) => tracing::warn!(pgid = raw, error = %e, "failed to kill process group"),
    }
}
