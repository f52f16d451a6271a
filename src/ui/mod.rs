//! ui
//!
//! User interaction.
//!
//! # Modules
//!
//! - [`app`] - The interaction state machine (pure reducer)
//! - [`keys`] - Terminal-independent key model
//! - [`render`] - ratatui presentation of the app state
//! - [`terminal`] - Event loop binding terminal, reducer and run task
//! - [`output`] - Plain output for non-interactive commands
//!
//! # Design
//!
//! The reducer never performs I/O. The terminal runtime is the only place
//! that owns the screen, spawns runs and feeds their events back, so every
//! transition can be driven from tests with plain [`app::Msg`] values.

pub mod app;
pub mod keys;
pub mod output;
pub mod render;
pub mod terminal;

pub use app::{App, Catalog, Cmd, Msg, Screen};
pub use keys::Key;
