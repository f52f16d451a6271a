//! engine::audit
//!
//! Append-only JSON-lines record of completed runs.
//!
//! Each line is one [`AuditEntry`]. Appends take an exclusive advisory lock
//! so two instances never interleave a line. Write failures are reported
//! to the caller, who logs them; they never fail the run.

use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::exec::RunResult;
use crate::core::types::ResolvedCommand;

/// Errors from audit operations.
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("audit log io error at '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to serialize audit entry: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// One completed run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub action: String,
    /// Full rendered command chain.
    pub command: String,
    /// Primary argument vector.
    pub args: Vec<String>,
    pub exit_code: i32,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub stdout: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub stderr: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Recovery branch created before the run, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup: Option<String>,
}

impl AuditEntry {
    /// Build an entry for a finished run.
    pub fn from_run(
        action: &str,
        command: &ResolvedCommand,
        result: &RunResult,
        backup: Option<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            action: action.to_string(),
            command: command.render_chain(),
            args: command.args.clone(),
            exit_code: result.exit_code,
            stdout: result.stdout.clone(),
            stderr: result.stderr.clone(),
            error: result.error.as_ref().map(ToString::to_string),
            backup,
        }
    }
}

/// Handle to an audit log file.
#[derive(Debug, Clone)]
pub struct AuditLog {
    path: PathBuf,
}

impl AuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one entry, creating the file and its directory as needed.
    pub fn append(&self, entry: &AuditEntry) -> Result<(), AuditError> {
        let mut line = serde_json::to_string(entry)?;
        line.push('\n');

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| self.io(e))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.io(e))?;

        file.lock_exclusive().map_err(|e| self.io(e))?;
        let written = file.write_all(line.as_bytes()).and_then(|_| file.flush());
        if let Err(e) = FileExt::unlock(&file) {
            tracing::debug!(error = %e, "audit unlock failed");
        }
        written.map_err(|e| self.io(e))
    }

    /// The `n` most recent entries, newest first. Malformed lines are skipped.
    ///
    /// A missing log reads as empty.
    pub fn recent(&self, n: usize) -> Result<Vec<AuditEntry>, AuditError> {
        let file = match fs::File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(self.io(e)),
        };

        let mut entries = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line.map_err(|e| self.io(e))?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<AuditEntry>(&line) {
                Ok(entry) => entries.push(entry),
                Err(e) => tracing::debug!(error = %e, "skipping malformed audit line"),
            }
        }
        entries.reverse();
        entries.truncate(n);
        Ok(entries)
    }

    fn io(&self, source: std::io::Error) -> AuditError {
        AuditError::Io {
            path: self.path.clone(),
            source,
        }
    }
}
