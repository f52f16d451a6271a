//! engine::gate
//!
//! Safety gate: decides whether a resolved command may run straight away or
//! must first pass typed confirmation, and whether a recovery branch is
//! taken before it runs.
//!
//! # Rules
//!
//! Destructive invocations of the configured tool:
//!
//! | verb                                  | destructive when                         |
//! |---------------------------------------|------------------------------------------|
//! | `rebase`, `filter-branch`, `filter-repo` | always                                |
//! | `reset`                               | `--hard` present                         |
//! | `clean`                               | a force flag (`-f`, `--force`, `-fd`)    |
//! | `push`                                | a force flag or a `+refspec`             |
//! | `branch`                              | `-D`, or `--delete` with `--force`       |
//! | `stash`                               | `drop` or `clear`                        |
//!
//! Typed confirmation is also demanded when an active combo flag declares
//! `typed` or `always`. Only destructive operations take a backup.
//!
//! # Invariants
//!
//! - The phrase check is exact after trimming; empty input never passes
//! - A plain push is never destructive
//! - Backup failure never blocks the confirmed operation

use std::path::Path;

use chrono::NaiveDateTime;
use thiserror::Error;

use crate::actions::{is_force_flag, ActionDef};
use crate::combos::ComboForm;
use crate::core::types::{ActionInput, BranchName, Invocation, ResolvedCommand, TypeError};

/// The literal phrase that confirms a destructive operation.
pub const CONFIRM_PHRASE: &str = "yes-I-mean-it";

/// Namespace of recovery branches.
pub const BACKUP_PREFIX: &str = "gitdeck-backup";

/// Errors from the gate.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GateError {
    #[error("confirmation failed")]
    ConfirmationFailed,
}

/// What must happen before a command runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// Run immediately.
    Proceed,
    /// Demand the typed phrase first.
    Confirm {
        /// Why confirmation is needed, one line each.
        reasons: Vec<String>,
        /// Take a recovery branch before the primary run.
        backup: bool,
    },
}

impl GateDecision {
    pub fn requires_confirmation(&self) -> bool {
        matches!(self, Self::Confirm { .. })
    }

    pub fn takes_backup(&self) -> bool {
        matches!(self, Self::Confirm { backup: true, .. })
    }
}

/// Destructiveness judge for one configured tool.
#[derive(Debug, Clone)]
pub struct SafetyGate {
    program: String,
}

impl SafetyGate {
    /// Gate for invocations of `program` (and anything named `git`).
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Whether an invocation is destructive.
    pub fn is_destructive(&self, program: &str, args: &[String]) -> bool {
        self.destructive_reason(program, args).is_some()
    }

    /// Human-readable reason when an invocation is destructive.
    pub fn destructive_reason(&self, program: &str, args: &[String]) -> Option<String> {
        if !self.targets(program) {
            return None;
        }
        let at = verb_position(args)?;
        let verb = args[at].as_str();
        let rest = &args[at + 1..];
        let has = |flag: &str| rest.iter().any(|a| a == flag);

        let reason = match verb {
            "rebase" | "filter-branch" | "filter-repo" => "rewrites commit history",
            "reset" if has("--hard") => "hard reset discards uncommitted changes",
            "clean" if rest.iter().any(|a| is_force_flag(a)) => {
                "clean permanently deletes untracked files"
            }
            "push" if rest.iter().any(|a| is_force_flag(a) || is_plus_refspec(a)) => {
                "force push can overwrite remote history"
            }
            "branch" if has("-D") || (has("--delete") && has("--force")) => {
                "force-deleting a branch can lose unmerged commits"
            }
            "stash" if matches!(rest.first().map(String::as_str), Some("drop" | "clear")) => {
                "dropping stash entries loses them"
            }
            _ => return None,
        };
        Some(format!("{verb}: {reason}"))
    }

    /// Decide what must happen before `command` runs.
    ///
    /// Confirmation is required when the action's own predicate or any
    /// invocation of the command is destructive, when the spec declares
    /// itself destructive, or when an active form flag demands it.
    pub fn assess(
        &self,
        action: Option<&ActionDef>,
        command: &ResolvedCommand,
        input: &ActionInput,
        form: Option<&ComboForm>,
    ) -> GateDecision {
        let mut reasons: Vec<String> = Vec::new();
        let mut destructive = false;
        let note = |reason: String, reasons: &mut Vec<String>| {
            if !reasons.contains(&reason) {
                reasons.push(reason);
            }
        };

        if let Some(action) = action.filter(|a| a.is_destructive(input)) {
            destructive = true;
            note(
                format!("{}: destructive with these inputs", action.name),
                &mut reasons,
            );
        }
        for invocation in command.invocations() {
            if let Some(reason) = self.destructive_reason(&invocation.program, &invocation.args) {
                destructive = true;
                note(reason, &mut reasons);
            }
        }
        if let Some(form) = form {
            if form.spec().declares_destructive() {
                destructive = true;
                note(
                    format!("{}: marked destructive", form.spec().action_key),
                    &mut reasons,
                );
            }
            for label in form.confirmation_flags() {
                note(format!("flag '{label}' requires confirmation"), &mut reasons);
            }
        }

        if reasons.is_empty() {
            GateDecision::Proceed
        } else {
            tracing::debug!(?reasons, destructive, "confirmation required");
            GateDecision::Confirm {
                reasons,
                backup: destructive,
            }
        }
    }

    fn targets(&self, program: &str) -> bool {
        program == self.program
            || Path::new(program)
                .file_stem()
                .is_some_and(|stem| stem == "git")
    }
}

/// Check the typed confirmation phrase.
///
/// # Errors
///
/// Returns `GateError::ConfirmationFailed` for anything but the exact phrase.
pub fn check_phrase(text: &str) -> Result<(), GateError> {
    if text.trim() == CONFIRM_PHRASE {
        Ok(())
    } else {
        Err(GateError::ConfirmationFailed)
    }
}

/// Timestamped recovery branch name, e.g. `gitdeck-backup/20260102-030405-678`.
pub fn recovery_branch_name(now: NaiveDateTime) -> Result<BranchName, TypeError> {
    BranchName::new(format!(
        "{BACKUP_PREFIX}/{}",
        now.format("%Y%m%d-%H%M%S-%3f")
    ))
}

/// The invocation that creates a recovery branch at `HEAD`.
pub fn backup_invocation(program: &str, name: &BranchName) -> Invocation {
    Invocation::new(program, ["branch", name.as_str()])
}

/// Index of the verb, skipping global options such as `-C <dir>`.
fn verb_position(args: &[String]) -> Option<usize> {
    let mut i = 0;
    while i < args.len() {
        let arg = args[i].as_str();
        if !arg.starts_with('-') {
            return Some(i);
        }
        i += if matches!(arg, "-C" | "-c" | "--git-dir" | "--work-tree" | "--namespace") {
            2
        } else {
            1
        };
    }
    None
}

fn is_plus_refspec(arg: &str) -> bool {
    arg.len() > 1 && arg.starts_with('+')
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn gate() -> SafetyGate {
        SafetyGate::new("git")
    }

    mod destructive {
        use super::*;

        #[test]
        fn history_rewrites() {
            assert!(gate().is_destructive("git", &args(&["rebase", "main"])));
            assert!(gate().is_destructive("git", &args(&["filter-branch", "--env-filter", "x"])));
        }

        #[test]
        fn reset_only_when_hard() {
            assert!(gate().is_destructive("git", &args(&["reset", "--hard", "HEAD~1"])));
            assert!(!gate().is_destructive("git", &args(&["reset", "--mixed", "HEAD~1"])));
        }

        #[test]
        fn push_needs_force() {
            assert!(!gate().is_destructive("git", &args(&["push", "origin", "main"])));
            for force in ["--force", "-f", "--force-with-lease", "--force-if-includes"] {
                assert!(
                    gate().is_destructive("git", &args(&["push", force, "origin", "main"])),
                    "{force}"
                );
            }
            assert!(gate().is_destructive("git", &args(&["push", "origin", "+main"])));
        }

        #[test]
        fn clean_needs_force() {
            assert!(!gate().is_destructive("git", &args(&["clean", "-n"])));
            assert!(gate().is_destructive("git", &args(&["clean", "-fdx"])));
        }

        #[test]
        fn branch_and_stash() {
            assert!(gate().is_destructive("git", &args(&["branch", "-D", "topic"])));
            assert!(!gate().is_destructive("git", &args(&["branch", "-d", "topic"])));
            assert!(gate().is_destructive("git", &args(&["stash", "drop"])));
            assert!(!gate().is_destructive("git", &args(&["stash", "list"])));
        }

        #[test]
        fn global_options_skipped() {
            assert!(gate().is_destructive("git", &args(&["-C", "repo", "reset", "--hard"])));
        }

        #[test]
        fn other_tools_ignored() {
            assert!(!gate().is_destructive("rm", &args(&["reset", "--hard"])));
            assert!(SafetyGate::new("/opt/bin/git").is_destructive(
                "/usr/bin/git",
                &args(&["reset", "--hard"])
            ));
        }

        #[test]
        fn empty_args_safe() {
            assert!(!gate().is_destructive("git", &[]));
        }
    }

    mod assess {
        use super::*;
        use crate::actions::ActionRegistry;

        #[test]
        fn commit_proceeds() {
            let registry = ActionRegistry::with_builtins("git");
            let action = registry.get("commit").unwrap();
            let input = ActionInput::new().with("message", "fix bug").with("stage", "y");
            let command = action.build(&input);
            let decision = gate().assess(Some(action.as_ref()), &command, &input, None);
            assert_eq!(decision, GateDecision::Proceed);
        }

        #[test]
        fn hard_undo_confirms_with_backup() {
            let registry = ActionRegistry::with_builtins("git");
            let action = registry.get("undo").unwrap();
            let input = ActionInput::new().with("mode", "hard");
            let command = action.build(&input);
            let decision = gate().assess(Some(action.as_ref()), &command, &input, None);
            assert!(decision.requires_confirmation());
            assert!(decision.takes_backup());
        }

        #[test]
        fn reasons_deduplicated() {
            let command = ResolvedCommand::new("git", ["reset", "--hard"])
                .preceded_by(Invocation::new("git", ["reset", "--hard"]));
            let decision = gate().assess(None, &command, &ActionInput::new(), None);
            match decision {
                GateDecision::Confirm { reasons, .. } => assert_eq!(reasons.len(), 1),
                GateDecision::Proceed => panic!("expected confirmation"),
            }
        }
    }

    mod phrase {
        use super::*;

        #[test]
        fn exact_phrase_passes() {
            assert!(check_phrase("yes-I-mean-it").is_ok());
            assert!(check_phrase("  yes-I-mean-it\n").is_ok());
        }

        #[test]
        fn anything_else_fails() {
            for wrong in ["", "yes", "YES-I-MEAN-IT", "yes-I-mean-it!"] {
                assert_eq!(check_phrase(wrong), Err(GateError::ConfirmationFailed));
            }
        }
    }

    mod backup {
        use super::*;

        #[test]
        fn name_format() {
            let now = NaiveDate::from_ymd_opt(2026, 1, 2)
                .unwrap()
                .and_hms_milli_opt(3, 4, 5, 678)
                .unwrap();
            let name = recovery_branch_name(now).unwrap();
            assert_eq!(name.as_str(), "gitdeck-backup/20260102-030405-678");
            assert_eq!(
                backup_invocation("git", &name).args,
                vec!["branch", "gitdeck-backup/20260102-030405-678"]
            );
        }
    }
}
