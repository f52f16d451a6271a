//! actions
//!
//! The catalog of operations a user can pick.
//!
//! # Overview
//!
//! An [`ActionDef`] knows how to turn an [`ActionInput`] into a
//! [`ResolvedCommand`], how to validate that input, and whether the input
//! makes the operation destructive. Actions are declarative: none of them
//! performs I/O, they only compute the command line handed to the executor.
//!
//! Actions live in an [`ActionRegistry`] built once at startup and shared
//! read-only afterwards. A name that is not registered is not an error:
//! callers fall back to [`ActionDef::generic`], a pass-through that forwards
//! the literal verb plus free-text arguments.
//!
//! # Modules
//!
//! - [`builtin`] - The built-in catalog
//! - [`parser`] - Free-text phrase to action name mapping

pub mod builtin;
pub mod parser;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::core::types::{ActionInput, FieldError, ResolvedCommand};

pub use builtin::register_builtins;
pub use parser::VerbParser;

/// Category used by [`ActionDef::generic`] and for uncategorized actions.
pub const OTHER_CATEGORY: &str = "other";

/// Display order of the built-in categories on the home screen.
pub const CATEGORY_ORDER: &[&str] = &[
    "basics",
    "branching",
    "remote",
    "history",
    "inspect",
    "stash",
    "patches",
    "maintenance",
    "advanced",
    OTHER_CATEGORY,
];

/// Errors from registry operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("action has no name")]
    Unnamed,
}

type BuildFn = dyn Fn(&ActionInput) -> ResolvedCommand + Send + Sync;
type ValidateFn = dyn Fn(&ActionInput) -> Result<(), Vec<FieldError>> + Send + Sync;
type PredicateFn = dyn Fn(&ActionInput) -> bool + Send + Sync;

/// One parameter the wizard asks for when no combo spec exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub key: String,
    pub label: String,
    pub default: String,
    pub required: bool,
}

impl Prompt {
    /// An optional prompt.
    pub fn new(key: &str, label: &str, default: &str) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            default: default.to_string(),
            required: false,
        }
    }

    /// A prompt that must end up non-blank.
    pub fn required(key: &str, label: &str, default: &str) -> Self {
        Self {
            required: true,
            ..Self::new(key, label, default)
        }
    }

    /// Resolve an answer: blank falls back to the declared default.
    pub fn answer(&self, raw: &str) -> String {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            self.default.clone()
        } else {
            trimmed.to_string()
        }
    }
}

/// A selectable high-level operation.
pub struct ActionDef {
    /// Unique name (registry key).
    pub name: String,
    /// Category shown on the home screen.
    pub category: String,
    /// One-line help text.
    pub help: String,
    /// Ordered wizard prompts.
    pub prompts: Vec<Prompt>,
    build: Box<BuildFn>,
    validate: Option<Box<ValidateFn>>,
    destructive: Option<Box<PredicateFn>>,
}

impl ActionDef {
    /// Create an action from its build function.
    pub fn new<F>(name: &str, category: &str, help: &str, build: F) -> Self
    where
        F: Fn(&ActionInput) -> ResolvedCommand + Send + Sync + 'static,
    {
        Self {
            name: name.to_string(),
            category: category.to_string(),
            help: help.to_string(),
            prompts: Vec::new(),
            build: Box::new(build),
            validate: None,
            destructive: None,
        }
    }

    /// A pass-through action: `program <verb...> <args>` where `args` is
    /// free text split with shell-word rules.
    pub fn passthrough(
        program: &str,
        name: &str,
        category: &str,
        help: &str,
        verb: &[&str],
        args_label: &str,
        args_default: &str,
    ) -> Self {
        let program = program.to_string();
        let verb: Vec<String> = verb.iter().map(|s| s.to_string()).collect();
        let mut action = Self::new(name, category, help, move |input| {
            let mut args = verb.clone();
            args.extend(split_args(input.get("args")));
            ResolvedCommand::new(program.clone(), args)
        })
        .validate_with(validate_args_quoting);
        if !args_label.is_empty() {
            action = action.prompt(Prompt::new("args", args_label, args_default));
        }
        action
    }

    /// The fallback for unregistered verbs: forwards `verb` plus free-text args.
    pub fn generic(program: &str, verb: &str) -> Self {
        let help = format!("Run `{program} {verb}` with free-text arguments");
        Self::passthrough(
            program,
            verb,
            OTHER_CATEGORY,
            &help,
            &[verb],
            &format!("{verb} args"),
            "",
        )
    }

    /// Add a wizard prompt.
    pub fn prompt(mut self, prompt: Prompt) -> Self {
        self.prompts.push(prompt);
        self
    }

    /// Replace the default validation (required prompts non-blank).
    pub fn validate_with<F>(mut self, f: F) -> Self
    where
        F: Fn(&ActionInput) -> Result<(), Vec<FieldError>> + Send + Sync + 'static,
    {
        self.validate = Some(Box::new(f));
        self
    }

    /// Declare when this action's input makes it destructive.
    pub fn destructive_when<F>(mut self, f: F) -> Self
    where
        F: Fn(&ActionInput) -> bool + Send + Sync + 'static,
    {
        self.destructive = Some(Box::new(f));
        self
    }

    /// Resolve the command line. Pure: same input, same command.
    pub fn build(&self, input: &ActionInput) -> ResolvedCommand {
        (self.build)(input)
    }

    /// Validate an input mapping.
    ///
    /// Required prompts must be non-blank; a custom validator, when declared,
    /// runs after that check.
    pub fn validate(&self, input: &ActionInput) -> Result<(), Vec<FieldError>> {
        let missing: Vec<FieldError> = self
            .prompts
            .iter()
            .filter(|p| p.required && input.trimmed(&p.key).is_empty())
            .map(|p| FieldError::new(&p.key, "is required"))
            .collect();
        if !missing.is_empty() {
            return Err(missing);
        }
        match &self.validate {
            Some(f) => f(input),
            None => Ok(()),
        }
    }

    /// Whether this input makes the action destructive by its own judgement.
    pub fn is_destructive(&self, input: &ActionInput) -> bool {
        self.destructive.as_ref().is_some_and(|f| f(input))
    }

    /// Input mapping seeded with every prompt's default.
    pub fn defaults(&self) -> ActionInput {
        self.prompts
            .iter()
            .map(|p| (p.key.clone(), p.default.clone()))
            .collect()
    }
}

impl fmt::Debug for ActionDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionDef")
            .field("name", &self.name)
            .field("category", &self.category)
            .field("prompts", &self.prompts)
            .field("has_validate", &self.validate.is_some())
            .field("has_destructive", &self.destructive.is_some())
            .finish()
    }
}

/// Split free text into arguments, honouring quotes.
///
/// Text with unbalanced quotes falls back to whitespace splitting; the
/// pass-through validator reports it before anything runs.
pub fn split_args(text: &str) -> Vec<String> {
    let text = text.trim();
    if text.is_empty() {
        return Vec::new();
    }
    shell_words::split(text)
        .unwrap_or_else(|_| text.split_whitespace().map(str::to_string).collect())
}

fn validate_args_quoting(input: &ActionInput) -> Result<(), Vec<FieldError>> {
    match shell_words::split(input.get("args")) {
        Ok(_) => Ok(()),
        Err(_) => Err(vec![FieldError::new("args", "has unbalanced quotes")]),
    }
}

/// Check whether an argument is a force flag (`-f`, `--force`, `--force-*`,
/// or a short-option cluster containing `f`, such as `-fd`).
pub fn is_force_flag(arg: &str) -> bool {
    if let Some(long) = arg.strip_prefix("--") {
        return long == "force" || long.starts_with("force-");
    }
    match arg.strip_prefix('-') {
        Some(cluster) if !cluster.is_empty() => {
            cluster.chars().all(|c| c.is_ascii_alphabetic()) && cluster.contains('f')
        }
        _ => false,
    }
}

/// The process-wide action catalog.
///
/// Built once at startup; re-registering a name replaces the previous action.
#[derive(Debug, Default)]
pub struct ActionRegistry {
    actions: HashMap<String, Arc<ActionDef>>,
}

impl ActionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the built-in catalog for `program`.
    pub fn with_builtins(program: &str) -> Self {
        let mut registry = Self::new();
        register_builtins(&mut registry, program);
        registry
    }

    /// Register an action.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::Unnamed` if the action's name is blank.
    pub fn register(&mut self, action: ActionDef) -> Result<(), RegistryError> {
        if action.name.trim().is_empty() {
            return Err(RegistryError::Unnamed);
        }
        self.actions.insert(action.name.clone(), Arc::new(action));
        Ok(())
    }

    /// Look up an action by exact name.
    pub fn get(&self, name: &str) -> Option<Arc<ActionDef>> {
        self.actions.get(name).cloned()
    }

    /// All actions in unspecified order.
    pub fn list(&self) -> Vec<Arc<ActionDef>> {
        self.actions.values().cloned().collect()
    }

    /// All actions sorted by name.
    pub fn sorted(&self) -> Vec<Arc<ActionDef>> {
        let mut all = self.list();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }

    /// Actions in a category, sorted by name.
    pub fn in_category(&self, category: &str) -> Vec<Arc<ActionDef>> {
        self.sorted()
            .into_iter()
            .filter(|a| a.category == category)
            .collect()
    }

    /// Like [`in_category`](Self::in_category), but every action when none match.
    pub fn for_category(&self, category: &str) -> Vec<Arc<ActionDef>> {
        let matching = self.in_category(category);
        if matching.is_empty() {
            self.sorted()
        } else {
            matching
        }
    }

    /// Categories in display order: known ones first, then the rest sorted.
    pub fn categories(&self) -> Vec<String> {
        let mut present: Vec<String> = self
            .actions
            .values()
            .map(|a| a.category.clone())
            .collect();
        present.sort();
        present.dedup();

        let rank = |c: &str| {
            CATEGORY_ORDER
                .iter()
                .position(|known| *known == c)
                .unwrap_or(CATEGORY_ORDER.len())
        };
        present.sort_by(|a, b| rank(a).cmp(&rank(b)).then_with(|| a.cmp(b)));
        present
    }

    /// Number of registered actions.
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}
