//! gitdeck - An interactive terminal front-end for git
//!
//! gitdeck lets a user pick a git operation from a categorized menu or by
//! typing a phrase, fill in its parameters through a step-by-step wizard or a
//! flag form, preview the exact command, and run it with live output.
//! Destructive operations require typed confirmation and can take a backup
//! branch first.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface layer (parses args, dispatches)
//! - [`core`] - Domain types and configuration
//! - [`actions`] - Built-in action catalog and the verb parser
//! - [`combos`] - Flag specifications loaded from a combos document
//! - [`engine`] - Safety gate, process execution, run task, audit log
//! - [`ui`] - Interactive state machine, rendering, and plain output
//!
//! # Invariants
//!
//! 1. The previewed command is exactly the command that runs
//! 2. Destructive commands never run without the confirmation phrase
//! 3. At most one command runs at a time
//! 4. The UI never blocks on a running process

pub mod actions;
pub mod cli;
pub mod combos;
pub mod core;
pub mod engine;
pub mod ui;
