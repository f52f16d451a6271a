//! history command - Show recent runs from the audit log

use anyhow::{Context as _, Result};

use super::Session;
use crate::engine::audit::{AuditEntry, AuditLog};
use crate::ui::output::{self, Verbosity};

/// Print the `count` most recent audit entries, newest first.
pub fn history(session: &Session, count: usize) -> Result<()> {
    let path = session
        .config
        .audit_path()
        .context("No audit log location (home directory not found)")?;
    let log = AuditLog::new(path);
    let entries = log
        .recent(count)
        .with_context(|| format!("Failed to read audit log {}", log.path().display()))?;

    if entries.is_empty() {
        output::print(
            format!("No runs recorded in {}", log.path().display()),
            session.verbosity,
        );
        return Ok(());
    }
    for entry in &entries {
        if session.verbosity == Verbosity::Quiet {
            output::result(&entry.command);
        } else {
            output::print(format_entry(entry), session.verbosity);
        }
    }
    Ok(())
}

fn format_entry(entry: &AuditEntry) -> String {
    let status = match &entry.error {
        Some(error) => error.clone(),
        None => format!("exit {}", entry.exit_code),
    };
    let backup = entry
        .backup
        .as_deref()
        .map(|b| format!(" (backup {b})"))
        .unwrap_or_default();
    format!(
        "{}  {:<12} {:<10} {}{backup}",
        entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
        entry.action,
        status,
        entry.command
    )
}
