//! engine::exec
//!
//! Child-process executor.
//!
//! # Streams
//!
//! stdout and stderr are drained concurrently, line by line. Every line is
//! appended to its stream's accumulator and handed to the `on_line`
//! callback. The accumulators are the source of truth for the result; the
//! callback is best-effort live display and must not block.
//!
//! # Termination
//!
//! The child is killed when the [`CancelHandle`] fires or the timeout
//! elapses. The call then waits a bounded grace period for the drains and
//! returns with partial output and [`ExecError::Cancelled`] or
//! [`ExecError::TimedOut`]. It never waits on an unresponsive child past
//! that grace.
//!
//! After a normal exit the drains get the same grace, cut short by the
//! remaining timeout. Output pipes held open by a background grandchild
//! are abandoned then; hitting the timeout this way reports
//! [`ExecError::TimedOut`] with the exit code kept.
//!
//! # Example
//!
//! ```ignore
//! let executor = Executor::new();
//! let cancel = CancelHandle::new();
//! let result = executor
//!     .run(&cancel, "git", &["status".into()], |line| println!("{}", line.text), None)
//!     .await;
//! assert!(result.success());
//! ```

use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::task::JoinHandle;

use crate::core::types::{OutputLine, StreamKind};

use super::cancel::CancelHandle;

/// How long drains may run after a kill before they are abandoned.
pub const DEFAULT_KILL_GRACE: Duration = Duration::from_secs(2);

/// Exit code reported when no status could be obtained.
pub const NO_EXIT_CODE: i32 = -1;

/// Why a process could not be run to completion as requested.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExecError {
    /// The program could not be started (not found, permission denied).
    #[error("failed to start '{program}': {reason}")]
    Spawn { program: String, reason: String },

    /// The run was cancelled by the user.
    #[error("cancelled")]
    Cancelled,

    /// The run exceeded its timeout.
    #[error("timed out after {}s", .0.as_secs_f64())]
    TimedOut(Duration),

    /// Waiting for the child failed.
    #[error("failed waiting for process: {0}")]
    Wait(String),
}

impl ExecError {
    /// Only spawn failure means the action cannot run at all.
    pub fn is_spawn(&self) -> bool {
        matches!(self, Self::Spawn { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::TimedOut(_))
    }
}

/// Outcome of one process run.
///
/// A non-zero exit is a result, not an error: `error` is set only when the
/// process could not run or finish as requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunResult {
    pub exit_code: i32,
    /// Aggregated stdout, lines joined by `\n`.
    pub stdout: String,
    /// Aggregated stderr, lines joined by `\n`.
    pub stderr: String,
    pub error: Option<ExecError>,
    pub elapsed: Duration,
}

impl RunResult {
    /// A result for a run that never started.
    pub fn failed(error: ExecError) -> Self {
        Self {
            exit_code: NO_EXIT_CODE,
            stdout: String::new(),
            stderr: String::new(),
            error: Some(error),
            elapsed: Duration::ZERO,
        }
    }

    /// Ran to completion with exit code 0.
    pub fn success(&self) -> bool {
        self.error.is_none() && self.exit_code == 0
    }
}

type LineSink = Arc<Mutex<Vec<String>>>;
type LineCallback = Arc<dyn Fn(OutputLine) + Send + Sync>;

/// Spawns child processes and streams their output.
#[derive(Debug, Clone)]
pub struct Executor {
    cwd: Option<PathBuf>,
    kill_grace: Duration,
}

impl Default for Executor {
    fn default() -> Self {
        Self {
            cwd: None,
            kill_grace: DEFAULT_KILL_GRACE,
        }
    }
}

impl Executor {
    /// Executor inheriting the current working directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run children in `cwd` instead of the inherited directory.
    pub fn with_cwd(mut self, cwd: Option<PathBuf>) -> Self {
        self.cwd = cwd;
        self
    }

    pub fn with_kill_grace(mut self, grace: Duration) -> Self {
        self.kill_grace = grace;
        self
    }

    /// Run `program args`, streaming lines to `on_line`.
    ///
    /// Returns only after both drains finished or their grace expired.
    pub async fn run<F>(
        &self,
        cancel: &CancelHandle,
        program: &str,
        args: &[String],
        on_line: F,
        timeout: Option<Duration>,
    ) -> RunResult
    where
        F: Fn(OutputLine) + Send + Sync + 'static,
    {
        let started = Instant::now();
        if cancel.is_cancelled() {
            return RunResult::failed(ExecError::Cancelled);
        }

        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(cwd) = &self.cwd {
            command.current_dir(cwd);
        }

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                tracing::warn!(program, error = %e, "spawn failed");
                return RunResult::failed(ExecError::Spawn {
                    program: program.to_string(),
                    reason: e.to_string(),
                });
            }
        };
        tracing::debug!(program, ?args, pid = ?child.id(), "spawned");

        let on_line: LineCallback = Arc::new(on_line);
        let stdout_lines: LineSink = Arc::default();
        let stderr_lines: LineSink = Arc::default();
        let mut drains: Vec<JoinHandle<()>> = Vec::with_capacity(2);
        if let Some(out) = child.stdout.take() {
            drains.push(tokio::spawn(drain(
                out,
                StreamKind::Stdout,
                Arc::clone(&stdout_lines),
                Arc::clone(&on_line),
            )));
        }
        if let Some(err) = child.stderr.take() {
            drains.push(tokio::spawn(drain(
                err,
                StreamKind::Stderr,
                Arc::clone(&stderr_lines),
                Arc::clone(&on_line),
            )));
        }

        let deadline = async {
            match timeout {
                Some(limit) => tokio::time::sleep(limit).await,
                None => std::future::pending::<()>().await,
            }
        };

        let waited = tokio::select! {
            biased;
            status = child.wait() => status
                .map(exit_code)
                .map_err(|e| ExecError::Wait(e.to_string())),
            _ = cancel.cancelled() => Err(ExecError::Cancelled),
            _ = deadline => Err(ExecError::TimedOut(timeout.unwrap_or_default())),
        };

        let (code, error) = match waited {
            Ok(code) => {
                // A background grandchild may hold the pipes open past exit.
                let remaining = timeout.map(|limit| limit.saturating_sub(started.elapsed()));
                let limit = remaining.map_or(self.kill_grace, |r| r.min(self.kill_grace));
                let error = if self.finish_drains(drains, limit, Some(cancel)).await {
                    None
                } else if cancel.is_cancelled() {
                    Some(ExecError::Cancelled)
                } else {
                    timeout
                        .filter(|limit| started.elapsed() >= *limit)
                        .map(ExecError::TimedOut)
                };
                (code, error)
            }
            Err(error) => {
                tracing::info!(program, %error, "terminating child");
                if let Err(e) = child.start_kill() {
                    tracing::debug!(error = %e, "kill failed (already exited?)");
                }
                let code = match tokio::time::timeout(self.kill_grace, child.wait()).await {
                    Ok(Ok(status)) => exit_code(status),
                    _ => NO_EXIT_CODE,
                };
                self.finish_drains(drains, self.kill_grace, None).await;
                (code, Some(error))
            }
        };

        RunResult {
            exit_code: code,
            stdout: joined(&stdout_lines),
            stderr: joined(&stderr_lines),
            error,
            elapsed: started.elapsed(),
        }
    }

    /// Wait at most `limit` for the drains, or until `cancel` fires.
    /// Returns false when they were abandoned.
    async fn finish_drains(
        &self,
        drains: Vec<JoinHandle<()>>,
        limit: Duration,
        cancel: Option<&CancelHandle>,
    ) -> bool {
        let aborts: Vec<_> = drains.iter().map(JoinHandle::abort_handle).collect();
        let all = async {
            for handle in drains {
                if let Err(e) = handle.await {
                    tracing::debug!(error = %e, "drain task ended abnormally");
                }
            }
        };
        tokio::pin!(all);

        let finished = match cancel {
            Some(cancel) => tokio::select! {
                biased;
                _ = &mut all => true,
                _ = cancel.cancelled() => false,
                _ = tokio::time::sleep(limit) => false,
            },
            None => tokio::time::timeout(limit, &mut all).await.is_ok(),
        };
        if !finished {
            tracing::warn!(?limit, "output drains still open; abandoning");
            for abort in aborts {
                abort.abort();
            }
        }
        finished
    }
}

async fn drain<R>(reader: R, stream: StreamKind, sink: LineSink, on_line: LineCallback)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                while matches!(buf.last().copied(), Some(b'\n' | b'\r')) {
                    buf.pop();
                }
                let text = String::from_utf8_lossy(&buf).into_owned();
                sink.lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(text.clone());
                on_line(OutputLine { stream, text });
            }
            Err(e) => {
                tracing::debug!(?stream, error = %e, "read failed; stopping drain");
                break;
            }
        }
    }
}

fn joined(sink: &LineSink) -> String {
    sink.lock().unwrap_or_else(PoisonError::into_inner).join("\n")
}

/// Map a status to a code; signal deaths surface as `128 + signal` on Unix.
pub fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    NO_EXIT_CODE
}

#[cfg(test)]
mod tests {
    use super::*;

    mod errors {
        use super::*;

        #[test]
        fn classification() {
            let spawn = ExecError::Spawn {
                program: "nope".to_string(),
                reason: "not found".to_string(),
            };
            assert!(spawn.is_spawn());
            assert!(!spawn.is_cancelled());
            assert!(ExecError::Cancelled.is_cancelled());
            assert!(ExecError::TimedOut(Duration::from_secs(1)).is_timeout());
        }

        #[test]
        fn timeout_message() {
            let msg = ExecError::TimedOut(Duration::from_millis(1500)).to_string();
            assert_eq!(msg, "timed out after 1.5s");
        }
    }

    mod results {
        use super::*;

        #[test]
        fn failed_has_no_output() {
            let result = RunResult::failed(ExecError::Cancelled);
            assert_eq!(result.exit_code, NO_EXIT_CODE);
            assert!(result.stdout.is_empty());
            assert!(!result.success());
        }
    }

    #[cfg(unix)]
    mod process {
        use super::*;

        fn sh(script: &str) -> Vec<String> {
            vec!["-c".to_string(), script.to_string()]
        }

        #[tokio::test]
        async fn captures_both_streams() {
            let result = Executor::new()
                .run(
                    &CancelHandle::new(),
                    "sh",
                    &sh("echo out1; echo err1 >&2; echo out2"),
                    |_| {},
                    None,
                )
                .await;
            assert!(result.success());
            assert_eq!(result.stdout, "out1\nout2");
            assert_eq!(result.stderr, "err1");
        }

        #[tokio::test]
        async fn nonzero_exit_is_not_an_error() {
            let result = Executor::new()
                .run(&CancelHandle::new(), "sh", &sh("exit 3"), |_| {}, None)
                .await;
            assert_eq!(result.exit_code, 3);
            assert!(result.error.is_none());
        }

        #[tokio::test]
        async fn spawn_failure() {
            let result = Executor::new()
                .run(
                    &CancelHandle::new(),
                    "gitdeck-definitely-missing-binary",
                    &[],
                    |_| {},
                    None,
                )
                .await;
            assert!(result.error.as_ref().is_some_and(ExecError::is_spawn));
            assert_eq!(result.exit_code, NO_EXIT_CODE);
        }

        #[tokio::test]
        async fn inherited_pipe_respects_timeout() {
            let result = Executor::new()
                .run(
                    &CancelHandle::new(),
                    "sh",
                    &sh("echo hi; sleep 8 &"),
                    |_| {},
                    Some(Duration::from_secs(1)),
                )
                .await;
            assert!(result.elapsed < Duration::from_secs(4), "{:?}", result.elapsed);
            assert!(result.error.as_ref().is_some_and(ExecError::is_timeout));
            assert_eq!(result.exit_code, 0);
            assert_eq!(result.stdout, "hi");
        }

        #[tokio::test]
        async fn inherited_pipe_without_timeout_is_bounded() {
            let result = Executor::new()
                .with_kill_grace(Duration::from_millis(300))
                .run(&CancelHandle::new(), "sh", &sh("echo hi; sleep 8 &"), |_| {}, None)
                .await;
            assert!(result.elapsed < Duration::from_secs(4), "{:?}", result.elapsed);
            assert!(result.success());
            assert_eq!(result.stdout, "hi");
        }
    }
}
