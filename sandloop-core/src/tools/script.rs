//! Script execution with a wall-clock budget

use super::{truncate_chars, ToolResult, MAX_CHARS};
use crate::error::{Error, Result};
use crate::sandbox::SandboxRoot;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;

/// Hard wall-clock limit for one script run.
pub const DEFAULT_SCRIPT_TIMEOUT: Duration = Duration::from_secs(30);

/// Bytes kept per stream: enough for `MAX_CHARS` four-byte characters plus
/// one more, so truncation is still detected.
const STREAM_READ_LIMIT: u64 = (MAX_CHARS as u64 + 1) * 4;

/// How long pipes may stay open after the script has exited.
const PIPE_DRAIN_GRACE: Duration = Duration::from_millis(500);

/// Exit code and captured streams of a finished script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionOutcome {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ExecutionOutcome {
    /// Render for the model.
    ///
    /// A non-zero exit code is reported first, then either
    /// `No output produced` or the labeled non-empty streams.
    pub fn format(&self) -> String {
        let mut parts = Vec::new();

        if self.exit_code != 0 {
            parts.push(format!("Process exited with code {}", self.exit_code));
        }

        if self.stdout.is_empty() && self.stderr.is_empty() {
            parts.push("No output produced".to_string());
        } else {
            if !self.stdout.is_empty() {
                parts.push(format!("STDOUT:\n{}", cap_stream(&self.stdout)));
            }
            if !self.stderr.is_empty() {
                parts.push(format!("STDERR:\n{}", cap_stream(&self.stderr)));
            }
        }

        parts.join("\n")
    }
}

fn cap_stream(stream: &str) -> String {
    match truncate_chars(stream, MAX_CHARS) {
        (kept, true) => format!("{}\n[...output truncated at {} characters]", kept, MAX_CHARS),
        (kept, false) => kept.to_string(),
    }
}

/// Runs script files from inside the sandbox through a fixed interpreter.
#[derive(Debug, Clone)]
pub struct ScriptRunner {
    interpreter: String,
    extension: String,
    timeout: Duration,
}

impl Default for ScriptRunner {
    fn default() -> Self {
        Self::new("python3", "py")
    }
}

impl ScriptRunner {
    /// Runner for files ending in `.{extension}`, executed as
    /// `{interpreter} <file> [args..]`.
    pub fn new(interpreter: impl Into<String>, extension: impl Into<String>) -> Self {
        Self {
            interpreter: interpreter.into(),
            extension: extension.into(),
            timeout: DEFAULT_SCRIPT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn interpreter(&self) -> &str {
        &self.interpreter
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Execute `file_path` with `args`, working directory set to the root.
    pub async fn run(&self, root: &SandboxRoot, file_path: &str, args: &[String]) -> ToolResult {
        self.execute(root, file_path, args)
            .await
            .map(|outcome| outcome.format())
            .map_err(|e| e.with_operation("tools::run_script"))
            .into()
    }

    /// Validate and spawn, returning the raw outcome.
    pub async fn execute(
        &self,
        root: &SandboxRoot,
        file_path: &str,
        args: &[String],
    ) -> Result<ExecutionOutcome> {
        let target = root.resolve(file_path)?;
        if !target.exists() {
            return Err(Error::file_not_found(file_path));
        }
        if !target.is_file() {
            return Err(Error::not_a_file(file_path));
        }
        let is_script = target
            .extension()
            .map(|ext| ext == self.extension.as_str())
            .unwrap_or(false);
        if !is_script {
            return Err(Error::unsupported_script(file_path, &self.extension));
        }

        tracing::info!(
            script = %target.display(),
            interpreter = %self.interpreter,
            ?args,
            "running script"
        );

        let mut child = Command::new(&self.interpreter)
            .arg(&target)
            .args(args)
            .current_dir(root.path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::spawn_failed(&self.interpreter, e.to_string()).set_source(e))?;

        let (stdout, stderr) = match (child.stdout.take(), child.stderr.take()) {
            (Some(stdout), Some(stderr)) => (stdout, stderr),
            _ => return Err(Error::unexpected("script output pipes were not captured")),
        };

        let mut out = Vec::new();
        let mut err = Vec::new();
        let run = async {
            let streams = async {
                tokio::join!(
                    capture(stdout, &mut out, STREAM_READ_LIMIT),
                    capture(stderr, &mut err, STREAM_READ_LIMIT),
                )
            };
            tokio::pin!(streams);

            let mut drained = false;
            let status = tokio::select! {
                status = child.wait() => status,
                _ = &mut streams => {
                    drained = true;
                    child.wait().await
                }
            };
            // Background processes may inherit the pipes and keep them open
            // after the script itself has exited.
            if !drained {
                let _ = tokio::time::timeout(PIPE_DRAIN_GRACE, &mut streams).await;
            }
            status
        };

        let finished = tokio::time::timeout(self.timeout, run).await;
        let status = match finished {
            Ok(status) => status?,
            Err(_) => {
                let _ = child.start_kill();
                return Err(Error::script_timeout(file_path, self.timeout.as_secs()));
            }
        };

        let outcome = ExecutionOutcome {
            exit_code: status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&out).into_owned(),
            stderr: String::from_utf8_lossy(&err).into_owned(),
        };
        tracing::debug!(exit_code = outcome.exit_code, "script finished");

        Ok(outcome)
    }
}

/// Keep the first `limit` bytes of `pipe` and discard the rest, so the writer
/// never blocks on a full pipe.
async fn capture<R>(mut pipe: R, buf: &mut Vec<u8>, limit: u64) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
{
    (&mut pipe).take(limit).read_to_end(buf).await?;
    tokio::io::copy(&mut pipe, &mut tokio::io::sink()).await?;
    Ok(())
}
