//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Validates command-specific arguments
//! 2. Uses the shared [`Session`] (configuration and catalog)
//! 3. Formats and displays output through [`crate::ui::output`]

mod actions;
mod completion;
mod config_cmd;
mod history;
mod preview;
mod tui;

pub use actions::actions;
pub use completion::completion;
pub use config_cmd::{get as config_get, list as config_list, set as config_set};
pub use history::history;
pub use preview::{parse_assignments, preview, PreviewReport};
pub use tui::tui;

use std::path::PathBuf;

use anyhow::{Context as _, Result};

use crate::actions::ActionRegistry;
use crate::cli::args::{Command, ConfigAction};
use crate::combos::{self, ComboRegistry};
use crate::core::config::{Config, Overrides};
use crate::engine::Context;
use crate::ui::output::Verbosity;
use crate::ui::Catalog;

/// Everything a handler needs: context, configuration, and the catalog.
#[derive(Debug)]
pub struct Session {
    pub ctx: Context,
    pub config: Config,
    pub catalog: Catalog,
    /// Where the combo document came from, if one loaded.
    pub combos_source: Option<PathBuf>,
    pub verbosity: Verbosity,
}

impl Session {
    /// Load configuration and build the catalog for `ctx`.
    pub fn load(ctx: &Context, overrides: Overrides) -> Result<Self> {
        let work_dir = ctx.work_dir();
        let config = Config::load(Some(&work_dir))
            .context("Failed to load configuration")?
            .config
            .with_overrides(overrides);

        let program = config.git_program().to_string();
        let (combos, combos_source) = match combos::load_first(&config.combos_candidates(&work_dir)) {
            Some((doc, path)) => (ComboRegistry::from_document(doc), Some(path)),
            None => (ComboRegistry::new(), None),
        };
        tracing::debug!(source = ?combos_source, specs = combos.len(), "combos ready");

        let catalog = Catalog::new(&program, ActionRegistry::with_builtins(&program), combos)
            .with_show_advanced(config.show_advanced());

        Ok(Self {
            ctx: ctx.clone(),
            verbosity: Verbosity::from_flags(ctx.quiet, ctx.debug),
            config,
            catalog,
            combos_source,
        })
    }
}

/// Dispatch a command to its handler. No command opens the interactive UI.
pub async fn dispatch(command: Option<Command>, ctx: &Context, overrides: Overrides) -> Result<()> {
    match command {
        Some(Command::Completion { shell }) => completion::completion(shell),
        Some(Command::Config { action }) => match action {
            ConfigAction::Get { key } => config_cmd::get(ctx, &key),
            ConfigAction::Set { key, value, repo } => config_cmd::set(ctx, &key, &value, repo),
            ConfigAction::List => config_cmd::list(ctx),
        },
        Some(Command::Actions { category }) => {
            let session = Session::load(ctx, overrides)?;
            actions::actions(&session, category.as_deref())
        }
        Some(Command::Preview { action, values }) => {
            let session = Session::load(ctx, overrides)?;
            preview::print_preview(&session, &action, &values)
        }
        Some(Command::History { count }) => {
            let session = Session::load(ctx, overrides)?;
            history::history(&session, count)
        }
        Some(Command::Tui) | None => {
            let session = Session::load(ctx, overrides)?;
            tui::tui(session).await
        }
    }
}
