//! engine
//!
//! Turns a resolved command into a finished run: Gate -> Confirm -> Run -> Record.
//!
//! # Architecture
//!
//! 1. **Gate**: [`gate::SafetyGate`] judges the resolved command and decides
//!    whether typed confirmation and a recovery branch are needed
//! 2. **Run**: [`run::spawn`] starts the concurrent task that executes each
//!    invocation through [`exec::Executor`] and streams lines back
//! 3. **Record**: the task appends an [`audit::AuditEntry`] and produces a
//!    [`summary::Summary`] for the UI
//!
//! # Invariants
//!
//! - The command that runs is exactly the command that was previewed
//! - At most one run is in flight per UI
//! - A run always ends with exactly one [`run::RunOutcome`], even when the
//!   process could not be started
//! - Audit or backup failures never fail the run

pub mod audit;
pub mod cancel;
pub mod exec;
pub mod gate;
pub mod run;
pub mod summary;

pub use audit::{AuditEntry, AuditError, AuditLog};
pub use cancel::CancelHandle;
pub use exec::{ExecError, Executor, RunResult};
pub use gate::{check_phrase, GateDecision, GateError, SafetyGate, CONFIRM_PHRASE};
pub use run::{BackupOutcome, RunChannels, RunEvent, RunOutcome, RunRequest, RunSettings};
pub use summary::{summarize, Summary};

use std::path::PathBuf;
use std::sync::Arc;

use crate::core::config::Config;

/// Execution context derived from global CLI flags.
#[derive(Debug, Clone, Default)]
pub struct Context {
    /// Working directory override.
    pub cwd: Option<PathBuf>,
    /// Debug logging enabled.
    pub debug: bool,
    /// Quiet mode (minimal output).
    pub quiet: bool,
}

impl Context {
    /// Directory commands run in.
    pub fn work_dir(&self) -> PathBuf {
        self.cwd
            .clone()
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

/// Build run settings from the effective configuration.
pub fn settings_from_config(config: &Config, ctx: &Context) -> Arc<RunSettings> {
    Arc::new(RunSettings {
        executor: Executor::new().with_cwd(ctx.cwd.clone()),
        program: config.git_program().to_string(),
        timeout: config.timeout(),
        audit: config
            .audit_enabled()
            .then(|| config.audit_path())
            .flatten()
            .map(AuditLog::new),
        line_buffer: config.line_buffer(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn work_dir_prefers_override() {
        let ctx = Context {
            cwd: Some(PathBuf::from("/tmp/repo")),
            ..Context::default()
        };
        assert_eq!(ctx.work_dir(), PathBuf::from("/tmp/repo"));
    }
}
