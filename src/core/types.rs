//! core::types
//!
//! Strong types shared by the action catalog, the combo model, and the engine.
//!
//! # Types
//!
//! - [`ActionInput`] - Parameter key to string value mapping
//! - [`Invocation`] - One program + argument vector
//! - [`ResolvedCommand`] - The exact command line a preview promises to run
//! - [`BranchName`] - Validated Git branch name
//! - [`StreamKind`] / [`OutputLine`] - Tagged output lines from a child process
//!
//! # Determinism
//!
//! `ActionInput` is ordered by key, so anything derived from it (previews,
//! audit records) is reproducible for identical inputs.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid branch name: {0}")]
    InvalidBranchName(String),
}

/// Resolved parameters for one action, keyed by parameter key.
///
/// This is the currency passed from the wizard or combo form to an action's
/// build function. Missing keys read as the empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionInput(BTreeMap<String, String>);

impl ActionInput {
    /// Create an empty input mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a value, or `""` when the key is absent.
    pub fn get(&self, key: &str) -> &str {
        self.0.get(key).map(String::as_str).unwrap_or("")
    }

    /// Get a value only if the key is present.
    pub fn get_opt(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Set a value, replacing any previous one.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Builder-style [`set`](Self::set).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    /// Check whether a key is present.
    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Trimmed value of a key.
    pub fn trimmed(&self, key: &str) -> &str {
        self.get(key).trim()
    }

    /// Interpret a value as a yes/no answer (`y`, `yes`, `true`, `1`).
    pub fn is_yes(&self, key: &str) -> bool {
        is_affirmative(self.get(key))
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ActionInput {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Check whether a free-text answer means "yes".
pub fn is_affirmative(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "y" | "yes" | "true" | "1"
    )
}

/// A validation failure scoped to one parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Parameter key the message belongs to.
    pub field: String,
    /// What is wrong with the value.
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// A single program invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invocation {
    /// Program to execute.
    pub program: String,
    /// Argument vector (without the program).
    pub args: Vec<String>,
}

impl Invocation {
    /// Create an invocation.
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Shell-quoted rendering, e.g. `git commit -m 'fix bug'`.
    pub fn render(&self) -> String {
        let mut words = Vec::with_capacity(self.args.len() + 1);
        words.push(self.program.as_str());
        words.extend(self.args.iter().map(String::as_str));
        shell_words::join(words)
    }

    /// The first argument (the tool's verb), if any.
    pub fn verb(&self) -> Option<&str> {
        self.args.first().map(String::as_str)
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render())
    }
}

/// A fully resolved command: what the preview shows is what runs.
///
/// Composite actions (stage then commit, init then seed a README) carry
/// preliminary invocations in `before`. They run in order and stop at the
/// first failure; the primary invocation runs last.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedCommand {
    /// Invocations that run before the primary one.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub before: Vec<Invocation>,
    /// Primary program.
    pub program: String,
    /// Primary argument vector.
    pub args: Vec<String>,
    /// Human-readable preview text.
    pub preview: String,
}

impl ResolvedCommand {
    /// Create a single-invocation command; the preview is the quoted command line.
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let primary = Invocation::new(program, args);
        let preview = primary.render();
        Self {
            before: Vec::new(),
            program: primary.program,
            args: primary.args,
            preview,
        }
    }

    /// Add a preliminary invocation (run in call order, before the primary)
    /// and re-render the preview.
    pub fn preceded_by(mut self, first: Invocation) -> Self {
        self.before.push(first);
        self.preview = self.render_chain();
        self
    }

    /// Append an explanatory note on its own line below the command.
    pub fn with_note(mut self, note: &str) -> Self {
        self.preview = format!("{}\n({})", self.render_chain(), note);
        self
    }

    /// The primary invocation.
    pub fn primary(&self) -> Invocation {
        Invocation {
            program: self.program.clone(),
            args: self.args.clone(),
        }
    }

    /// Every invocation in execution order.
    pub fn invocations(&self) -> Vec<Invocation> {
        let mut all = self.before.clone();
        all.push(self.primary());
        all
    }

    /// Render all invocations joined by `&&`.
    pub fn render_chain(&self) -> String {
        self.invocations()
            .iter()
            .map(Invocation::render)
            .collect::<Vec<_>>()
            .join(" && ")
    }
}

impl fmt::Display for ResolvedCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.preview)
    }
}

/// Which stream a child-process line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamKind {
    Stdout,
    Stderr,
}

/// One line of child-process output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLine {
    pub stream: StreamKind,
    pub text: String,
}

impl OutputLine {
    pub fn stdout(text: impl Into<String>) -> Self {
        Self {
            stream: StreamKind::Stdout,
            text: text.into(),
        }
    }

    pub fn stderr(text: impl Into<String>) -> Self {
        Self {
            stream: StreamKind::Stderr,
            text: text.into(),
        }
    }
}

/// A validated Git branch name.
///
/// Follows `git check-ref-format` closely enough to reject names the tool
/// would refuse:
/// - Cannot be empty or exactly `@`
/// - Cannot start with `.` or `-`
/// - Cannot end with `.lock` or `/`
/// - Cannot contain `..`, `@{`, `//`, whitespace, control characters,
///   or any of `~ ^ : \ ? * [`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BranchName(String);

impl BranchName {
    /// Create a new validated branch name.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidBranchName` if the name violates Git's refname rules.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        Self::validate(&name)?;
        Ok(Self(name))
    }

    fn validate(name: &str) -> Result<(), TypeError> {
        let fail = |msg: &str| Err(TypeError::InvalidBranchName(msg.to_string()));

        if name.is_empty() {
            return fail("branch name cannot be empty");
        }
        if name == "@" {
            return fail("branch name cannot be '@' (reserved)");
        }
        if name.starts_with('.') || name.starts_with('-') {
            return fail("branch name cannot start with '.' or '-'");
        }
        if name.ends_with(".lock") || name.ends_with('/') {
            return fail("branch name cannot end with '.lock' or '/'");
        }
        for bad in ["..", "@{", "//"] {
            if name.contains(bad) {
                return Err(TypeError::InvalidBranchName(format!(
                    "branch name cannot contain '{bad}'"
                )));
            }
        }
        const INVALID_CHARS: [char; 7] = ['~', '^', ':', '\\', '?', '*', '['];
        if let Some(c) = name.chars().find(|c| INVALID_CHARS.contains(c)) {
            return Err(TypeError::InvalidBranchName(format!(
                "branch name cannot contain '{c}'"
            )));
        }
        if name
            .chars()
            .any(|c| c.is_whitespace() || c.is_ascii_control())
        {
            return fail("branch name cannot contain whitespace or control characters");
        }
        if name
            .split('/')
            .any(|c| c.starts_with('.') || c.ends_with(".lock"))
        {
            return fail("path component cannot start with '.' or end with '.lock'");
        }
        Ok(())
    }

    /// Get the branch name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for BranchName {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<BranchName> for String {
    fn from(name: BranchName) -> Self {
        name.0
    }
}

impl AsRef<str> for BranchName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BranchName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
