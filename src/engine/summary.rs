//! engine::summary
//!
//! One-line status plus a detail block for a finished run.

use super::exec::RunResult;
use crate::core::types::Invocation;

/// Status line and detail text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub short: String,
    pub detail: String,
}

/// Summarize a run of `invocation`.
pub fn summarize(invocation: &Invocation, result: &RunResult) -> Summary {
    let base = format!("Ran: {}", invocation.render());
    let full_detail = || {
        format!(
            "{base}\nstdout:\n{}\nstderr:\n{}",
            result.stdout, result.stderr
        )
    };

    if let Some(error) = &result.error {
        return Summary {
            short: format!("Command failed: {error}"),
            detail: full_detail(),
        };
    }
    if result.exit_code != 0 {
        return Summary {
            short: format!("Command exited with status {}", result.exit_code),
            detail: full_detail(),
        };
    }

    let short = match invocation.verb() {
        Some("commit") => match first_hash(&result.stdout) {
            Some(sha) => format!("Committed changes ({sha})."),
            None => "Committed changes.".to_string(),
        },
        Some("push") => "Pushed to remote.".to_string(),
        Some("status") => {
            return Summary {
                short: "Status displayed.".to_string(),
                detail: result.stdout.clone(),
            }
        }
        _ => "Command completed successfully.".to_string(),
    };
    Summary {
        short,
        detail: format!("{base}\n{}", result.stdout),
    }
}

/// First 7-character hex prefix of a whitespace-separated word, with any
/// trailing `]` stripped (`[main 1a2b3c4] msg`).
fn first_hash(text: &str) -> Option<String> {
    text.split_whitespace()
        .map(|word| word.trim_end_matches(']'))
        .find_map(|word| word.get(..7).filter(|p| p.chars().all(|c| c.is_ascii_hexdigit())))
        .map(str::to_string)
}
