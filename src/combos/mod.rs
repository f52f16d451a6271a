//! combos
//!
//! Declarative flag specifications loaded from a JSON document.
//!
//! # Overview
//!
//! A [`CommandSpec`] upgrades an action from a linear prompt wizard to a
//! structured form: every [`FlagDef`] describes one switch or value, its
//! type, default, validation constraints and confirmation level. Specs are
//! optional. When no document loads, every action keeps working through
//! its plain prompts.
//!
//! # Document format
//!
//! ```json
//! {
//!   "commands": [
//!     {
//!       "action_key": "commit",
//!       "action_aliases": ["ci"],
//!       "name": "Commit",
//!       "category": "basics",
//!       "flags": [
//!         { "key": "-a", "param_key": "all", "label": "Stage tracked files", "type": "boolean", "previewOrder": 1 },
//!         { "key": "-m", "param_key": "message", "label": "Message", "manualOnly": true, "required": true, "previewOrder": 2 }
//!       ]
//!     }
//!   ]
//! }
//! ```
//!
//! # Modules
//!
//! - [`form`] - Editable form state over one spec

pub mod form;

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::types::{is_affirmative, ActionInput, ResolvedCommand};

pub use form::ComboForm;

/// Errors from loading combo documents.
#[derive(Debug, Error)]
pub enum ComboError {
    #[error("failed to read combos file '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse combos file '{path}': {message}")]
    Parse { path: PathBuf, message: String },

    #[error("command at position {0} has no action_key")]
    MissingActionKey(usize),

    #[error("command '{action}' declares parameter '{param}' more than once")]
    DuplicateParam { action: String, param: String },
}

/// Value type tag of a flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlagType {
    #[default]
    #[serde(alias = "string")]
    Text,
    #[serde(alias = "int", alias = "number")]
    Integer,
    #[serde(alias = "bool")]
    Boolean,
    Path,
    Ref,
}

/// How strongly a flag demands typed confirmation when active.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfirmLevel {
    #[default]
    #[serde(alias = "")]
    None,
    Typed,
    Always,
}

impl ConfirmLevel {
    /// Whether an active flag at this level requires the typed phrase.
    pub fn requires_phrase(self) -> bool {
        matches!(self, Self::Typed | Self::Always)
    }
}

/// A flag default: closed set of value shapes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlagValue {
    Boolean(bool),
    Integer(i64),
    Text(String),
}

impl FlagValue {
    /// Text form used in the input mapping.
    pub fn as_text(&self) -> String {
        match self {
            Self::Boolean(b) => b.to_string(),
            Self::Integer(n) => n.to_string(),
            Self::Text(s) => s.clone(),
        }
    }
}

/// Validation constraints for manual values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Constraints {
    pub min: Option<i64>,
    pub max: Option<i64>,
    pub pattern: Option<String>,
}

/// One controllable parameter of a command.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlagDef {
    /// Literal token, e.g. `-a` or `--force`. Empty or `<name>` for positionals.
    pub key: String,
    /// Key in the input mapping.
    pub param_key: String,
    pub label: String,
    #[serde(rename = "type")]
    pub kind: FlagType,
    pub default: Option<FlagValue>,
    #[serde(rename = "manualOnly")]
    pub manual_only: bool,
    pub advanced: bool,
    pub required: bool,
    #[serde(rename = "inferrableFrom")]
    pub inferrable_from: Vec<String>,
    #[serde(rename = "validate")]
    pub constraints: Option<Constraints>,
    pub confirmation: ConfirmLevel,
    pub example: String,
    #[serde(rename = "previewOrder")]
    pub preview_order: i64,
    #[serde(rename = "mutuallyExclusive")]
    pub mutually_exclusive: Vec<String>,
    pub implies: Vec<String>,
}

impl FlagDef {
    /// Toggle-style flags are included or excluded; manual ones are typed.
    pub fn is_toggle(&self) -> bool {
        !self.manual_only
    }

    /// Positional parameters emit only their value.
    pub fn is_positional(&self) -> bool {
        self.key.is_empty() || self.key.starts_with('<')
    }

    /// Default as text (empty when absent).
    pub fn default_text(&self) -> String {
        self.default.as_ref().map(FlagValue::as_text).unwrap_or_default()
    }

    /// Whether `reference` names this flag (by token or parameter key).
    pub fn answers_to(&self, reference: &str) -> bool {
        (!self.key.is_empty() && self.key == reference) || self.param_key == reference
    }

    /// Label for display, falling back to the token.
    pub fn display_label(&self) -> &str {
        if self.label.is_empty() {
            &self.key
        } else {
            &self.label
        }
    }
}

/// Rich metadata for one action.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandSpec {
    pub action_key: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub action_aliases: Vec<String>,
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub display_name: String,
    pub category: String,
    pub description: String,
    /// Command tokens placed before any flag; defaults to the action key.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub verb: Vec<String>,
    pub forms: Vec<String>,
    pub flags: Vec<FlagDef>,
    pub notes: String,
    pub safety: Vec<String>,
}

impl CommandSpec {
    /// Title for display.
    pub fn title(&self) -> &str {
        [&self.display_name, &self.name, &self.action_key]
            .into_iter()
            .find(|s| !s.is_empty())
            .map(String::as_str)
            .unwrap_or_default()
    }

    /// Command tokens placed before the flags.
    pub fn verb_tokens(&self) -> Vec<String> {
        if self.verb.is_empty() {
            self.action_key
                .split_whitespace()
                .map(str::to_string)
                .collect()
        } else {
            self.verb.clone()
        }
    }

    /// Look up a flag by token or parameter key.
    pub fn flag(&self, reference: &str) -> Option<&FlagDef> {
        self.flags.iter().find(|f| f.answers_to(reference))
    }

    /// Resolve an input mapping into a command, in flag order.
    ///
    /// Per flag, with a non-blank value:
    /// - `"true"` on a toggle or boolean flag emits the token alone;
    ///   `"false"` on a boolean flag emits nothing
    /// - positional flags emit the value alone
    /// - a token ending in `=` is glued to its value (`--depth=1`)
    /// - anything else emits the token then the value
    pub fn build(&self, program: &str, input: &ActionInput) -> ResolvedCommand {
        let mut args = self.verb_tokens();
        for flag in &self.flags {
            let value = input.trimmed(&flag.param_key);
            if value.is_empty() {
                continue;
            }
            let boolish = flag.is_toggle() || flag.kind == FlagType::Boolean;
            if boolish && value.eq_ignore_ascii_case("true") {
                if !flag.key.is_empty() && !flag.is_positional() {
                    args.push(flag.key.clone());
                }
                continue;
            }
            if flag.kind == FlagType::Boolean && value.eq_ignore_ascii_case("false") {
                continue;
            }
            if flag.is_positional() {
                args.push(value.to_string());
            } else if flag.key.ends_with('=') {
                args.push(format!("{}{}", flag.key, value));
            } else {
                args.push(flag.key.clone());
                args.push(value.to_string());
            }
        }
        ResolvedCommand::new(program, args)
    }

    /// Whether any spec-level safety note marks the command as destructive.
    pub fn declares_destructive(&self) -> bool {
        self.safety
            .iter()
            .any(|s| s.eq_ignore_ascii_case("destructive"))
    }

    fn check(&self) -> Result<(), ComboError> {
        let mut seen = HashSet::new();
        for flag in &self.flags {
            if !seen.insert(flag.param_key.as_str()) {
                return Err(ComboError::DuplicateParam {
                    action: self.action_key.clone(),
                    param: flag.param_key.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Top-level combo document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombosDocument {
    #[serde(default)]
    pub commands: Vec<CommandSpec>,
}

impl CombosDocument {
    /// Parse a document from JSON text, sorting flags and checking keys.
    pub fn parse(text: &str, path: &Path) -> Result<Self, ComboError> {
        let mut doc: CombosDocument =
            serde_json::from_str(text).map_err(|e| ComboError::Parse {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        for (index, command) in doc.commands.iter_mut().enumerate() {
            if command.action_key.trim().is_empty() {
                return Err(ComboError::MissingActionKey(index));
            }
            // sort_by_key is stable
            command.flags.sort_by_key(|f| f.preview_order);
            command.check()?;
        }
        Ok(doc)
    }
}

/// Load and validate a combo document.
pub fn load_from_file(path: &Path) -> Result<CombosDocument, ComboError> {
    let text = fs::read_to_string(path).map_err(|source| ComboError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    CombosDocument::parse(&text, path)
}

/// Load the first candidate that parses.
///
/// Missing files are skipped quietly; unreadable or malformed ones are
/// logged. `None` means the structured form is disabled.
pub fn load_first(candidates: &[PathBuf]) -> Option<(CombosDocument, PathBuf)> {
    for path in candidates {
        match load_from_file(path) {
            Ok(doc) => {
                tracing::info!(path = %path.display(), commands = doc.commands.len(), "combos loaded");
                return Some((doc, path.clone()));
            }
            Err(ComboError::Io { source, .. })
                if source.kind() == std::io::ErrorKind::NotFound =>
            {
                tracing::debug!(path = %path.display(), "no combos file");
            }
            Err(e) => tracing::warn!(error = %e, "skipping combos file"),
        }
    }
    tracing::info!("no combos document loaded; using plain prompts");
    None
}

/// Lookup of specs by action key, alias or display name.
#[derive(Debug, Clone, Default)]
pub struct ComboRegistry {
    specs: HashMap<String, Arc<CommandSpec>>,
    aliases: HashMap<String, String>,
}

impl ComboRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry from a loaded document.
    pub fn from_document(doc: CombosDocument) -> Self {
        let mut registry = Self::new();
        registry.register(doc);
        registry
    }

    /// Merge every spec of a document; later specs replace earlier ones.
    pub fn register(&mut self, doc: CombosDocument) {
        for spec in doc.commands {
            let key = spec.action_key.clone();
            for alias in &spec.action_aliases {
                self.aliases.insert(alias.to_lowercase(), key.clone());
            }
            if !spec.name.is_empty() {
                self.aliases.insert(spec.name.to_lowercase(), key.clone());
            }
            self.specs.insert(key, Arc::new(spec));
        }
    }

    /// Resolve a key: exact, then alias or name, then case-insensitive key.
    pub fn get(&self, key: &str) -> Option<Arc<CommandSpec>> {
        if let Some(spec) = self.specs.get(key) {
            return Some(Arc::clone(spec));
        }
        let lower = key.to_lowercase();
        if let Some(spec) = self.aliases.get(&lower).and_then(|k| self.specs.get(k)) {
            return Some(Arc::clone(spec));
        }
        self.keys()
            .into_iter()
            .find(|k| k.eq_ignore_ascii_case(key))
            .and_then(|k| self.specs.get(&k).cloned())
    }

    /// Canonical keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.specs.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

/// Whether a string is accepted as a boolean word by forms and builds.
pub(crate) fn is_boolean_word(value: &str) -> bool {
    let v = value.trim();
    v.eq_ignore_ascii_case("true") || v.eq_ignore_ascii_case("false")
}

/// Truthiness for inclusion seeds.
pub(crate) fn is_truthy(value: &FlagValue) -> bool {
    match value {
        FlagValue::Boolean(b) => *b,
        FlagValue::Integer(n) => *n != 0,
        FlagValue::Text(s) => is_affirmative(s),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const DOC: &str = r#"{
        "commands": [
            {
                "action_key": "commit",
                "action_aliases": ["CI"],
                "name": "Commit Changes",
                "flags": [
                    { "key": "-m", "param_key": "message", "label": "Message",
                      "manualOnly": true, "required": true, "previewOrder": 2 },
                    { "key": "-a", "param_key": "all", "label": "All",
                      "type": "boolean", "default": false, "previewOrder": 1 }
                ]
            },
            {
                "action_key": "log",
                "flags": [
                    { "key": "-n", "param_key": "count", "type": "integer",
                      "manualOnly": true, "default": 20,
                      "validate": { "min": 1, "max": 500 } },
                    { "key": "--oneline", "param_key": "oneline", "default": true }
                ]
            }
        ]
    }"#;

    fn doc() -> CombosDocument {
        CombosDocument::parse(DOC, Path::new("test.json")).unwrap()
    }

    mod loading {
        use super::*;

        #[test]
        fn flags_sorted_by_preview_order() {
            let doc = doc();
            let keys: Vec<_> = doc.commands[0].flags.iter().map(|f| f.key.as_str()).collect();
            assert_eq!(keys, vec!["-a", "-m"]);
        }

        #[test]
        fn equal_order_is_stable() {
            let doc = doc();
            let keys: Vec<_> = doc.commands[1].flags.iter().map(|f| f.key.as_str()).collect();
            assert_eq!(keys, vec!["-n", "--oneline"]);
        }

        #[test]
        fn typed_values() {
            let doc = doc();
            let count = &doc.commands[1].flags[0];
            assert_eq!(count.kind, FlagType::Integer);
            assert_eq!(count.default, Some(FlagValue::Integer(20)));
            assert_eq!(
                count.constraints,
                Some(Constraints {
                    min: Some(1),
                    max: Some(500),
                    pattern: None
                })
            );
            assert_eq!(doc.commands[0].flags[0].default, Some(FlagValue::Boolean(false)));
        }

        #[test]
        fn duplicate_param_rejected() {
            let text = r#"{"commands":[{"action_key":"x","flags":[
                {"key":"-a","param_key":"p"},{"key":"-b","param_key":"p"}]}]}"#;
            let err = CombosDocument::parse(text, Path::new("x.json")).unwrap_err();
            assert!(matches!(err, ComboError::DuplicateParam { .. }));
        }

        #[test]
        fn missing_action_key_rejected() {
            let text = r#"{"commands":[{"name":"nameless"}]}"#;
            let err = CombosDocument::parse(text, Path::new("x.json")).unwrap_err();
            assert!(matches!(err, ComboError::MissingActionKey(0)));
        }

        #[test]
        fn malformed_json_is_parse_error() {
            let err = CombosDocument::parse("{ nope", Path::new("x.json")).unwrap_err();
            assert!(matches!(err, ComboError::Parse { .. }));
        }

        #[test]
        fn load_first_falls_back() {
            let temp = TempDir::new().unwrap();
            let missing = temp.path().join("missing.json");
            let broken = temp.path().join("broken.json");
            let good = temp.path().join("good.json");
            fs::write(&broken, "not json").unwrap();
            fs::write(&good, DOC).unwrap();

            let (doc, path) = load_first(&[missing, broken, good.clone()]).unwrap();
            assert_eq!(path, good);
            assert_eq!(doc.commands.len(), 2);
        }

        #[test]
        fn load_first_tolerates_total_absence() {
            let temp = TempDir::new().unwrap();
            assert!(load_first(&[temp.path().join("none.json")]).is_none());
            assert!(load_first(&[]).is_none());
        }
    }

    mod registry {
        use super::*;

        #[test]
        fn lookup_order() {
            let registry = ComboRegistry::from_document(doc());
            assert_eq!(registry.get("commit").unwrap().action_key, "commit");
            assert_eq!(registry.get("ci").unwrap().action_key, "commit");
            assert_eq!(registry.get("commit changes").unwrap().action_key, "commit");
            assert_eq!(registry.get("LOG").unwrap().action_key, "log");
            assert!(registry.get("push").is_none());
        }

        #[test]
        fn keys_sorted() {
            let registry = ComboRegistry::from_document(doc());
            assert_eq!(registry.keys(), vec!["commit", "log"]);
        }
    }

    mod build {
        use super::*;

        #[test]
        fn flag_order_and_shapes() {
            let spec = &doc().commands[0];
            let input = ActionInput::new().with("message", "x").with("all", "true");
            let cmd = spec.build("git", &input);
            assert_eq!(cmd.args, vec!["commit", "-a", "-m", "x"]);
        }

        #[test]
        fn blank_and_false_skipped() {
            let spec = &doc().commands[0];
            let input = ActionInput::new().with("message", "  ").with("all", "false");
            assert_eq!(spec.build("git", &input).args, vec!["commit"]);
        }

        #[test]
        fn positional_and_glued() {
            let spec = CommandSpec {
                action_key: "clone".to_string(),
                flags: vec![
                    FlagDef {
                        key: "--depth=".to_string(),
                        param_key: "depth".to_string(),
                        manual_only: true,
                        ..Default::default()
                    },
                    FlagDef {
                        key: "<url>".to_string(),
                        param_key: "url".to_string(),
                        manual_only: true,
                        ..Default::default()
                    },
                ],
                ..Default::default()
            };
            let input = ActionInput::new()
                .with("depth", "1")
                .with("url", "https://example.com/r.git");
            assert_eq!(
                spec.build("git", &input).args,
                vec!["clone", "--depth=1", "https://example.com/r.git"]
            );
        }

        #[test]
        fn explicit_verb_tokens() {
            let spec = CommandSpec {
                action_key: "stash-pop".to_string(),
                verb: vec!["stash".to_string(), "pop".to_string()],
                ..Default::default()
            };
            assert_eq!(spec.build("git", &ActionInput::new()).args, vec!["stash", "pop"]);
        }
    }
}
