//! cli
//!
//! Command-line interface layer for gitdeck.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Initialize logging and load configuration
//! - Delegate to command handlers
//!
//! # Architecture
//!
//! The CLI layer is thin. It parses arguments via clap, builds a
//! [`commands::Session`] and dispatches. Only the `tui` command runs
//! anything; the others print what would run or what has run.

pub mod args;
pub mod commands;

pub use args::{Cli, Shell};

use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use anyhow::Result;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::core::config::Config;
use crate::engine;

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub async fn run() -> Result<()> {
    let cli = Cli::parse_args();

    if let Some(path) = Config::default().log_path() {
        init_logging(&path, cli.debug);
    }

    let ctx = engine::Context {
        cwd: cli.cwd.clone(),
        debug: cli.debug,
        quiet: cli.quiet,
    };
    let overrides = cli.overrides();

    commands::dispatch(cli.command, &ctx, overrides).await
}

/// Send tracing output to the log file; the terminal belongs to the UI.
///
/// `RUST_LOG` wins; otherwise `warn`, or `debug` with `--debug`. A log file
/// that cannot be opened leaves logging disabled.
pub fn init_logging(path: &Path, debug: bool) {
    let default = if debug {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };
    let filter = EnvFilter::builder()
        .with_default_directive(default.into())
        .from_env_lossy();

    if let Some(parent) = path.parent() {
        if fs::create_dir_all(parent).is_err() {
            return;
        }
    }
    let Ok(file) = OpenOptions::new().create(true).append(true).open(path) else {
        return;
    };

    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .try_init();
    if installed.is_ok() {
        tracing::debug!(path = %path.display(), "logging initialized");
    }
}
