//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--cwd <path>`: Run as if in that directory
//! - `--debug`: Enable debug logging
//! - `--quiet` / `-q`: Minimal output
//! - `--combos <path>`: Combo specification document to load first
//! - `--no-audit`: Do not write the audit log
//! - `--timeout <secs>`: Per-invocation timeout

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::core::config::Overrides;

/// gitdeck - build, preview and safely run git commands
#[derive(Parser, Debug)]
#[command(name = "gd")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Run as if gd was started in this directory
    #[arg(long, global = true)]
    pub cwd: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Minimal output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Combo specification document to try before the configured ones
    #[arg(long, global = true, value_name = "PATH")]
    pub combos: Option<PathBuf>,

    /// Do not record runs in the audit log
    #[arg(long, global = true)]
    pub no_audit: bool,

    /// Kill each invocation after this many seconds
    #[arg(long, global = true, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }

    /// Configuration overrides carried by the global flags.
    pub fn overrides(&self) -> Overrides {
        Overrides {
            combos_path: self.combos.clone(),
            timeout_secs: self.timeout,
            no_audit: self.no_audit,
        }
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Open the interactive front-end (default)
    #[command(
        name = "tui",
        long_about = "Open the interactive front-end.\n\n\
            Pick a category, then an action. Actions with a combo specification \
            open a flag form; the rest ask their questions one at a time. Every \
            command is previewed before it runs, and destructive ones demand a \
            typed confirmation phrase.",
        after_help = "\
KEYS:
    Up/Down       move
    Enter         select / answer / edit
    Space         toggle a flag
    v             show advanced flags
    r, F5         run the previewed command
    c             cancel a running command
    Esc           back
    q, Ctrl+C     quit"
    )]
    Tui,

    /// List registered actions
    #[command(
        name = "actions",
        after_help = "\
WORKFLOW EXAMPLES:
    # Everything, grouped by category
    gd actions

    # Just one category
    gd actions --category remote"
    )]
    Actions {
        /// Only list actions in this category
        #[arg(long, short)]
        category: Option<String>,
    },

    /// Resolve an action and print the command it would run
    #[command(
        name = "preview",
        long_about = "Resolve an action with the given inputs and print the exact \
            command line it would run, plus whether typed confirmation would be \
            required. Nothing is executed.",
        after_help = "\
WORKFLOW EXAMPLES:
    # Stage everything and commit
    gd preview commit --set message=\"fix typo\"

    # A hard undo needs confirmation
    gd preview undo --set mode=hard"
    )]
    Preview {
        /// Action name (or a phrase such as \"save\")
        action: String,

        /// Input value as key=value (repeatable)
        #[arg(long = "set", value_name = "KEY=VALUE")]
        values: Vec<String>,
    },

    /// Show recent runs from the audit log
    #[command(name = "history")]
    History {
        /// Number of entries to show
        #[arg(short = 'n', long, default_value_t = 20)]
        count: usize,
    },

    /// Get, set, or list configuration values
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completion scripts
    #[command(
        name = "completion",
        after_help = "\
WORKFLOW EXAMPLES:
    # Bash (add to ~/.bashrc)
    gd completion bash >> ~/.bashrc

    # Zsh (add to ~/.zshrc)
    gd completion zsh >> ~/.zshrc

    # Fish
    gd completion fish > ~/.config/fish/completions/gd.fish"
    )]
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Get a configuration value
    Get {
        /// Configuration key
        key: String,
    },
    /// Set a configuration value
    Set {
        /// Configuration key
        key: String,
        /// Value to set
        value: String,
        /// Write the repository config instead of the global one
        #[arg(long)]
        repo: bool,
    },
    /// List all configuration values
    List,
}

/// Supported shells for completion
#[derive(clap::ValueEnum, Debug, Clone, Copy)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn no_subcommand_means_tui() {
        let cli = Cli::try_parse_from(["gd"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn global_flags_become_overrides() {
        let cli =
            Cli::try_parse_from(["gd", "actions", "--no-audit", "--timeout", "30"]).unwrap();
        let overrides = cli.overrides();
        assert!(overrides.no_audit);
        assert_eq!(overrides.timeout_secs, Some(30));
    }

    #[test]
    fn zero_timeout_rejected() {
        assert!(Cli::try_parse_from(["gd", "--timeout", "0"]).is_err());
    }

    #[test]
    fn preview_collects_values() {
        let cli = Cli::try_parse_from([
            "gd", "preview", "commit", "--set", "message=x", "--set", "stage=n",
        ])
        .unwrap();
        match cli.command {
            Some(Command::Preview { action, values }) => {
                assert_eq!(action, "commit");
                assert_eq!(values, vec!["message=x", "stage=n"]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
