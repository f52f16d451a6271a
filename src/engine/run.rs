//! engine::run
//!
//! The concurrent task behind one run.
//!
//! # Channels
//!
//! A run owns two channels:
//! - a bounded line channel fed with `try_send`; lines are dropped when the
//!   UI falls behind (live display only, the aggregated output is complete)
//! - a single-slot completion channel carrying the [`RunOutcome`]
//!
//! [`RunChannels::pull`] yields at most one event per call, preferring a
//! buffered line, otherwise whichever of next-line and completion comes
//! first. Every line sent before completion is observed before it.
//!
//! # Sequence
//!
//! 1. Recovery branch, when the request asks for one (failure is reported
//!    as a transcript note and never blocks the run)
//! 2. Each invocation of the command in order, stopping at the first that
//!    does not succeed
//! 3. Audit record, when an audit log is configured

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tracing::Instrument;

use super::audit::{AuditEntry, AuditLog};
use super::cancel::CancelHandle;
use super::exec::{ExecError, Executor, RunResult};
use super::gate::{backup_invocation, recovery_branch_name};
use super::summary::{summarize, Summary};
use crate::core::config::DEFAULT_LINE_BUFFER;
use crate::core::types::{Invocation, OutputLine, ResolvedCommand};

/// Prefix of transcript lines produced by gitdeck itself.
pub const NOTE_PREFIX: &str = "[gitdeck]";

/// Everything a run needs besides the request.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub executor: Executor,
    /// Program used for the recovery branch.
    pub program: String,
    /// Per-invocation timeout.
    pub timeout: Option<Duration>,
    pub audit: Option<AuditLog>,
    /// Capacity of the live line channel.
    pub line_buffer: usize,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            executor: Executor::new(),
            program: "git".to_string(),
            timeout: None,
            audit: None,
            line_buffer: DEFAULT_LINE_BUFFER,
        }
    }
}

/// A confirmed command, ready to run.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub action: String,
    pub command: ResolvedCommand,
    /// Take a recovery branch first.
    pub backup: bool,
    /// Handle the UI keeps to cancel this run.
    pub cancel: CancelHandle,
}

/// Result of the recovery-branch step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackupOutcome {
    Created(String),
    Failed(String),
}

/// Everything the UI learns when a run ends.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub action: String,
    pub command: ResolvedCommand,
    /// The last invocation that ran.
    pub invocation: Invocation,
    /// Output aggregated across invocations; status of the last one.
    pub result: RunResult,
    pub backup: Option<BackupOutcome>,
    pub summary: Summary,
}

impl RunOutcome {
    fn lost(request: &RunRequest) -> Self {
        let invocation = request.command.primary();
        let result = RunResult::failed(ExecError::Wait("run task ended unexpectedly".to_string()));
        let summary = summarize(&invocation, &result);
        Self {
            action: request.action.clone(),
            command: request.command.clone(),
            invocation,
            result,
            backup: None,
            summary,
        }
    }
}

/// One event from a running task.
#[derive(Debug, Clone)]
pub enum RunEvent {
    Line(OutputLine),
    Finished(RunOutcome),
}

/// Receiving side of a run.
#[derive(Debug)]
pub struct RunChannels {
    lines: mpsc::Receiver<OutputLine>,
    done: Option<oneshot::Receiver<RunOutcome>>,
    request: RunRequest,
}

impl RunChannels {
    /// Handle that cancels this run.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.request.cancel.clone()
    }

    /// Pull at most one event. `None` once the outcome was delivered.
    pub async fn pull(&mut self) -> Option<RunEvent> {
        if let Ok(line) = self.lines.try_recv() {
            return Some(RunEvent::Line(line));
        }
        let done = self.done.as_mut()?;

        enum Next {
            Line(OutputLine),
            Done(Result<RunOutcome, oneshot::error::RecvError>),
        }
        let next = tokio::select! {
            biased;
            Some(line) = self.lines.recv() => Next::Line(line),
            outcome = done => Next::Done(outcome),
        };

        match next {
            Next::Line(line) => Some(RunEvent::Line(line)),
            Next::Done(outcome) => {
                self.done = None;
                let outcome = outcome.unwrap_or_else(|_| {
                    tracing::error!("run task dropped its completion channel");
                    RunOutcome::lost(&self.request)
                });
                Some(RunEvent::Finished(outcome))
            }
        }
    }
}

/// Start the task for `request`. Must be called inside a tokio runtime.
pub fn spawn(settings: Arc<RunSettings>, request: RunRequest) -> RunChannels {
    let (line_tx, lines) = mpsc::channel(settings.line_buffer.max(1));
    let (done_tx, done) = oneshot::channel();

    let task_request = request.clone();
    let span = tracing::info_span!("run", action = %request.action);
    tokio::spawn(
        async move {
            let outcome = run_task(&settings, &task_request, line_tx).await;
            if done_tx.send(outcome).is_err() {
                tracing::debug!("run finished after the UI stopped listening");
            }
        }
        .instrument(span),
    );

    RunChannels {
        lines,
        done: Some(done),
        request,
    }
}

async fn run_task(
    settings: &RunSettings,
    request: &RunRequest,
    line_tx: mpsc::Sender<OutputLine>,
) -> RunOutcome {
    tracing::info!(command = %request.command.render_chain(), backup = request.backup, "run started");

    let note = |text: String| {
        if line_tx.try_send(OutputLine::stdout(format!("{NOTE_PREFIX} {text}"))).is_err() {
            tracing::debug!("transcript note dropped");
        }
    };

    let backup = if request.backup {
        let outcome = take_backup(settings, &request.cancel).await;
        match &outcome {
            BackupOutcome::Created(name) => note(format!("recovery branch created: {name}")),
            BackupOutcome::Failed(reason) => {
                tracing::warn!(%reason, "recovery branch failed; continuing");
                note(format!("recovery branch failed ({reason}); continuing"));
            }
        }
        Some(outcome)
    } else {
        None
    };

    let (invocation, result) = execute_chain(settings, request, &line_tx).await;
    drop(line_tx);

    if let Some(log) = &settings.audit {
        let backup_name = match &backup {
            Some(BackupOutcome::Created(name)) => Some(name.clone()),
            _ => None,
        };
        let entry = AuditEntry::from_run(&request.action, &request.command, &result, backup_name);
        let log = log.clone();
        match tokio::task::spawn_blocking(move || log.append(&entry)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!(error = %e, "audit write failed"),
            Err(e) => tracing::warn!(error = %e, "audit task failed"),
        }
    }

    let summary = summarize(&invocation, &result);
    tracing::info!(exit_code = result.exit_code, error = ?result.error, "run finished");
    RunOutcome {
        action: request.action.clone(),
        command: request.command.clone(),
        invocation,
        result,
        backup,
        summary,
    }
}

async fn take_backup(settings: &RunSettings, cancel: &CancelHandle) -> BackupOutcome {
    let name = match recovery_branch_name(chrono::Local::now().naive_local()) {
        Ok(name) => name,
        Err(e) => return BackupOutcome::Failed(e.to_string()),
    };
    let invocation = backup_invocation(&settings.program, &name);
    let result = settings
        .executor
        .run(cancel, &invocation.program, &invocation.args, |_| {}, settings.timeout)
        .await;
    if result.success() {
        BackupOutcome::Created(name.to_string())
    } else if let Some(error) = result.error {
        BackupOutcome::Failed(error.to_string())
    } else {
        let detail = result.stderr.lines().next().unwrap_or("no output").to_string();
        BackupOutcome::Failed(format!("exit {}: {detail}", result.exit_code))
    }
}

/// Run every invocation in order, stopping at the first that does not succeed.
async fn execute_chain(
    settings: &RunSettings,
    request: &RunRequest,
    line_tx: &mpsc::Sender<OutputLine>,
) -> (Invocation, RunResult) {
    let dropped = Arc::new(AtomicUsize::new(0));
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let mut elapsed = Duration::ZERO;
    let mut last = (request.command.primary(), RunResult::failed(ExecError::Cancelled));

    for invocation in request.command.invocations() {
        let tx = line_tx.clone();
        let dropped_lines = Arc::clone(&dropped);
        let result = settings
            .executor
            .run(
                &request.cancel,
                &invocation.program,
                &invocation.args,
                move |line| {
                    if tx.try_send(line).is_err() {
                        dropped_lines.fetch_add(1, Ordering::Relaxed);
                    }
                },
                settings.timeout,
            )
            .await;

        push_non_empty(&mut stdout, &result.stdout);
        push_non_empty(&mut stderr, &result.stderr);
        elapsed += result.elapsed;
        let ok = result.success();
        last = (invocation, result);
        if !ok {
            break;
        }
    }

    let dropped = dropped.load(Ordering::Relaxed);
    if dropped > 0 {
        tracing::debug!(dropped, "live lines dropped on overflow");
    }

    let (invocation, mut result) = last;
    result.stdout = stdout.join("\n");
    result.stderr = stderr.join("\n");
    result.elapsed = elapsed;
    (invocation, result)
}

fn push_non_empty(parts: &mut Vec<String>, text: &str) {
    if !text.is_empty() {
        parts.push(text.to_string());
    }
}
