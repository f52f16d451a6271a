//! core
//!
//! Core domain types and configuration for gitdeck.
//!
//! # Modules
//!
//! - [`types`] - Strong types: ActionInput, ResolvedCommand, BranchName, etc.
//! - [`config`] - Configuration schema and loading
//!
//! # Design Principles
//!
//! - Strong typing prevents invalid states at compile time
//! - Schemas are strict and self-describing
//! - Command resolution is deterministic

pub mod config;
pub mod types;
