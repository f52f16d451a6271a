//! combos::form
//!
//! Editable state for one [`CommandSpec`]: text for manual flags, inclusion
//! for toggle flags, and the advanced-view switch. The form never mutates
//! the spec; it produces an [`ActionInput`] on demand.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use regex::Regex;

use crate::core::types::{ActionInput, FieldError, ResolvedCommand};

use super::{is_boolean_word, is_truthy, CommandSpec, FlagDef, FlagType, FlagValue};

/// Form state over a spec.
#[derive(Debug, Clone)]
pub struct ComboForm {
    spec: Arc<CommandSpec>,
    values: BTreeMap<String, String>,
    included: BTreeSet<String>,
    show_advanced: bool,
}

impl ComboForm {
    /// Materialize a form: manual flags seeded from defaults, toggles excluded.
    pub fn new(spec: Arc<CommandSpec>, show_advanced: bool) -> Self {
        let values = spec
            .flags
            .iter()
            .filter(|f| !f.is_toggle())
            .map(|f| (f.param_key.clone(), f.default_text()))
            .collect();
        Self {
            spec,
            values,
            included: BTreeSet::new(),
            show_advanced,
        }
    }

    pub fn spec(&self) -> &Arc<CommandSpec> {
        &self.spec
    }

    pub fn show_advanced(&self) -> bool {
        self.show_advanced
    }

    /// Expand or collapse advanced flags.
    pub fn toggle_advanced(&mut self) {
        self.show_advanced = !self.show_advanced;
    }

    /// Flags currently shown, in preview order.
    pub fn visible(&self) -> Vec<&FlagDef> {
        self.spec
            .flags
            .iter()
            .filter(|f| self.show_advanced || !f.advanced)
            .collect()
    }

    /// Flag at a visible index.
    pub fn flag_at(&self, index: usize) -> Option<&FlagDef> {
        self.visible().get(index).copied()
    }

    /// Current text of a manual flag.
    pub fn value(&self, param_key: &str) -> &str {
        self.values.get(param_key).map(String::as_str).unwrap_or("")
    }

    /// Replace the text of a manual flag. Toggle flags are ignored.
    pub fn set_value(&mut self, param_key: &str, text: impl Into<String>) {
        if let Some(slot) = self.values.get_mut(param_key) {
            *slot = text.into();
        }
    }

    pub fn is_included(&self, param_key: &str) -> bool {
        self.included.contains(param_key)
    }

    /// Whether a flag currently contributes to the command.
    pub fn is_active(&self, flag: &FlagDef) -> bool {
        if flag.is_toggle() {
            self.is_included(&flag.param_key)
        } else {
            !self.value(&flag.param_key).trim().is_empty()
        }
    }

    /// Flip inclusion of the toggle flag at a visible index.
    ///
    /// Returns `false` for manual flags and out-of-range indexes. Turning a
    /// flag on clears every flag it is mutually exclusive with (declared on
    /// either side) and turns on what it implies.
    pub fn toggle(&mut self, index: usize) -> bool {
        let Some(flag) = self.flag_at(index).cloned() else {
            return false;
        };
        if !flag.is_toggle() {
            return false;
        }
        if self.included.remove(&flag.param_key) {
            return true;
        }
        let mut visited = BTreeSet::new();
        self.include(&flag, &mut visited);
        true
    }

    fn include(&mut self, flag: &FlagDef, visited: &mut BTreeSet<String>) {
        if !visited.insert(flag.param_key.clone()) {
            return;
        }
        self.included.insert(flag.param_key.clone());

        let spec = Arc::clone(&self.spec);
        for other in spec.flags.iter().filter(|o| o.param_key != flag.param_key) {
            let excludes = flag.mutually_exclusive.iter().any(|r| other.answers_to(r))
                || other.mutually_exclusive.iter().any(|r| flag.answers_to(r));
            if excludes {
                self.included.remove(&other.param_key);
                if let Some(slot) = self.values.get_mut(&other.param_key) {
                    slot.clear();
                }
            }
        }
        for reference in &flag.implies {
            if let Some(implied) = spec.flag(reference).filter(|f| f.is_toggle()) {
                self.include(implied, visited);
            }
        }
    }

    /// Check every visible manual flag.
    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        let errors: Vec<FieldError> = self
            .visible()
            .into_iter()
            .filter(|f| !f.is_toggle())
            .filter_map(|f| check_value(f, self.value(&f.param_key)).err())
            .collect();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Build the input mapping from visible flags.
    ///
    /// Manual flags carry their non-blank text; included toggles carry
    /// their default, or `"true"` when the default is absent or boolean.
    pub fn resolve(&self) -> ActionInput {
        let mut input = ActionInput::new();
        for flag in self.visible() {
            if flag.is_toggle() {
                if !self.is_included(&flag.param_key) {
                    continue;
                }
                let value = match &flag.default {
                    None | Some(FlagValue::Boolean(_)) => "true".to_string(),
                    Some(other) => other.as_text(),
                };
                input.set(&flag.param_key, value);
            } else {
                let text = self.value(&flag.param_key).trim();
                if !text.is_empty() {
                    input.set(&flag.param_key, text);
                }
            }
        }
        input
    }

    /// Resolve and build the command for `program`.
    pub fn build(&self, program: &str) -> ResolvedCommand {
        self.spec.build(program, &self.resolve())
    }

    /// Labels of active visible flags demanding typed confirmation.
    pub fn confirmation_flags(&self) -> Vec<String> {
        self.visible()
            .into_iter()
            .filter(|f| f.confirmation.requires_phrase() && self.is_active(f))
            .map(|f| f.display_label().to_string())
            .collect()
    }

    /// Flags whose declared default is truthy but which start excluded.
    ///
    /// Shown as hints next to the toggle.
    pub fn suggested(&self, flag: &FlagDef) -> bool {
        flag.is_toggle()
            && !self.is_included(&flag.param_key)
            && flag.default.as_ref().is_some_and(is_truthy)
    }
}

fn check_value(flag: &FlagDef, raw: &str) -> Result<(), FieldError> {
    let value = raw.trim();
    let fail = |message: String| Err(FieldError::new(&flag.param_key, message));

    if value.is_empty() {
        return if flag.required {
            fail("is required".to_string())
        } else {
            Ok(())
        };
    }

    match flag.kind {
        FlagType::Integer => {
            let Ok(n) = value.parse::<i64>() else {
                return fail("must be integer".to_string());
            };
            if let Some(c) = &flag.constraints {
                if let Some(min) = c.min.filter(|min| n < *min) {
                    return fail(format!("must be >= {min}"));
                }
                if let Some(max) = c.max.filter(|max| n > *max) {
                    return fail(format!("must be <= {max}"));
                }
            }
        }
        FlagType::Boolean if !is_boolean_word(value) => {
            return fail("must be true or false".to_string());
        }
        _ => {}
    }

    if let Some(pattern) = flag.constraints.as_ref().and_then(|c| c.pattern.as_deref()) {
        match Regex::new(pattern) {
            Ok(re) if re.is_match(value) => {}
            Ok(_) => return fail(format!("must match pattern {pattern}")),
            Err(e) => {
                tracing::warn!(flag = %flag.param_key, error = %e, "invalid validation pattern");
                return fail(format!("has an invalid pattern {pattern}"));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combos::{ConfirmLevel, Constraints};

    fn toggle(key: &str, param: &str) -> FlagDef {
        FlagDef {
            key: key.to_string(),
            param_key: param.to_string(),
            label: param.to_string(),
            ..Default::default()
        }
    }

    fn manual(key: &str, param: &str) -> FlagDef {
        FlagDef {
            manual_only: true,
            ..toggle(key, param)
        }
    }

    fn commit_spec() -> Arc<CommandSpec> {
        Arc::new(CommandSpec {
            action_key: "commit".to_string(),
            flags: vec![
                toggle("-a", "all"),
                FlagDef {
                    required: true,
                    ..manual("-m", "message")
                },
            ],
            ..Default::default()
        })
    }

    mod seeding {
        use super::*;

        #[test]
        fn manual_defaults_and_toggles_excluded() {
            let spec = Arc::new(CommandSpec {
                action_key: "log".to_string(),
                flags: vec![
                    FlagDef {
                        default: Some(FlagValue::Integer(20)),
                        ..manual("-n", "count")
                    },
                    FlagDef {
                        default: Some(FlagValue::Boolean(true)),
                        ..toggle("--oneline", "oneline")
                    },
                ],
                ..Default::default()
            });
            let form = ComboForm::new(spec, false);
            assert_eq!(form.value("count"), "20");
            assert!(!form.is_included("oneline"));
            assert!(form.suggested(form.flag_at(1).unwrap()));
        }

        #[test]
        fn advanced_hidden_until_expanded() {
            let spec = Arc::new(CommandSpec {
                action_key: "push".to_string(),
                flags: vec![
                    toggle("-u", "upstream"),
                    FlagDef {
                        advanced: true,
                        ..toggle("--force", "force")
                    },
                ],
                ..Default::default()
            });
            let mut form = ComboForm::new(spec, false);
            assert_eq!(form.visible().len(), 1);
            form.toggle_advanced();
            assert_eq!(form.visible().len(), 2);
        }

        #[test]
        fn set_value_ignores_toggles() {
            let mut form = ComboForm::new(commit_spec(), false);
            form.set_value("all", "true");
            assert_eq!(form.value("all"), "");
            assert!(!form.is_included("all"));
        }
    }

    mod toggling {
        use super::*;

        #[test]
        fn manual_flags_do_not_toggle() {
            let mut form = ComboForm::new(commit_spec(), false);
            assert!(!form.toggle(1));
            assert!(!form.toggle(9));
        }

        #[test]
        fn mutually_exclusive_cleared_both_ways() {
            let spec = Arc::new(CommandSpec {
                action_key: "reset".to_string(),
                flags: vec![
                    FlagDef {
                        mutually_exclusive: vec!["--hard".to_string()],
                        ..toggle("--soft", "soft")
                    },
                    toggle("--hard", "hard"),
                ],
                ..Default::default()
            });
            let mut form = ComboForm::new(spec, false);
            form.toggle(0);
            assert!(form.is_included("soft"));
            form.toggle(1);
            assert!(form.is_included("hard"));
            assert!(!form.is_included("soft"));
            form.toggle(0);
            assert!(!form.is_included("hard"));
        }

        #[test]
        fn implies_turns_on() {
            let spec = Arc::new(CommandSpec {
                action_key: "clean".to_string(),
                flags: vec![
                    FlagDef {
                        implies: vec!["force".to_string()],
                        ..toggle("-d", "dirs")
                    },
                    toggle("-f", "force"),
                ],
                ..Default::default()
            });
            let mut form = ComboForm::new(spec, false);
            form.toggle(0);
            assert!(form.is_included("force"));
            form.toggle(0);
            assert!(!form.is_included("dirs"));
            assert!(form.is_included("force"));
        }
    }

    mod validation {
        use super::*;

        fn count_form(min: Option<i64>, max: Option<i64>, value: &str) -> ComboForm {
            let spec = Arc::new(CommandSpec {
                action_key: "log".to_string(),
                flags: vec![FlagDef {
                    kind: FlagType::Integer,
                    constraints: Some(Constraints {
                        min,
                        max,
                        pattern: None,
                    }),
                    ..manual("-n", "count")
                }],
                ..Default::default()
            });
            let mut form = ComboForm::new(spec, false);
            form.set_value("count", value);
            form
        }

        fn messages(form: &ComboForm) -> Vec<String> {
            form.validate()
                .err()
                .unwrap_or_default()
                .into_iter()
                .map(|e| e.to_string())
                .collect()
        }

        #[test]
        fn required_blank() {
            let form = ComboForm::new(commit_spec(), false);
            assert_eq!(messages(&form), vec!["message: is required"]);
        }

        #[test]
        fn integer_rules() {
            assert_eq!(messages(&count_form(Some(1), None, "abc")), vec!["count: must be integer"]);
            assert_eq!(messages(&count_form(Some(1), None, "0")), vec!["count: must be >= 1"]);
            assert_eq!(messages(&count_form(None, Some(10), "11")), vec!["count: must be <= 10"]);
            assert!(messages(&count_form(Some(1), Some(10), "5")).is_empty());
        }

        #[test]
        fn pattern_rule() {
            let spec = Arc::new(CommandSpec {
                action_key: "tag".to_string(),
                flags: vec![FlagDef {
                    constraints: Some(Constraints {
                        pattern: Some("^v[0-9]+$".to_string()),
                        ..Default::default()
                    }),
                    ..manual("<name>", "name")
                }],
                ..Default::default()
            });
            let mut form = ComboForm::new(spec, false);
            form.set_value("name", "release");
            assert_eq!(messages(&form), vec!["name: must match pattern ^v[0-9]+$"]);
            form.set_value("name", "v2");
            assert!(messages(&form).is_empty());
        }

        #[test]
        fn boolean_words() {
            let spec = Arc::new(CommandSpec {
                action_key: "x".to_string(),
                flags: vec![FlagDef {
                    kind: FlagType::Boolean,
                    ..manual("--flag", "flag")
                }],
                ..Default::default()
            });
            let mut form = ComboForm::new(spec, false);
            form.set_value("flag", "maybe");
            assert_eq!(messages(&form), vec!["flag: must be true or false"]);
            form.set_value("flag", "FALSE");
            assert!(messages(&form).is_empty());
        }

        #[test]
        fn hidden_flags_not_validated() {
            let spec = Arc::new(CommandSpec {
                action_key: "x".to_string(),
                flags: vec![FlagDef {
                    required: true,
                    advanced: true,
                    ..manual("--x", "x")
                }],
                ..Default::default()
            });
            let form = ComboForm::new(spec, false);
            assert!(form.validate().is_ok());
        }
    }

    mod resolution {
        use super::*;

        #[test]
        fn toggle_and_manual_in_flag_order() {
            let mut form = ComboForm::new(commit_spec(), false);
            form.set_value("message", "x");
            form.toggle(0);
            assert!(form.validate().is_ok());

            let input = form.resolve();
            assert_eq!(input.get("all"), "true");
            assert_eq!(input.get("message"), "x");
            assert_eq!(form.build("git").preview, "git commit -a -m x");
        }

        #[test]
        fn toggle_with_text_default_carries_it() {
            let spec = Arc::new(CommandSpec {
                action_key: "log".to_string(),
                flags: vec![FlagDef {
                    default: Some(FlagValue::Text("oneline".to_string())),
                    ..toggle("--format", "format")
                }],
                ..Default::default()
            });
            let mut form = ComboForm::new(spec, false);
            form.toggle(0);
            assert_eq!(form.build("git").args, vec!["log", "--format", "oneline"]);
        }

        #[test]
        fn confirmation_only_when_active() {
            let spec = Arc::new(CommandSpec {
                action_key: "push".to_string(),
                flags: vec![FlagDef {
                    confirmation: ConfirmLevel::Typed,
                    label: "Force".to_string(),
                    ..toggle("--force", "force")
                }],
                ..Default::default()
            });
            let mut form = ComboForm::new(spec, false);
            assert!(form.confirmation_flags().is_empty());
            form.toggle(0);
            assert_eq!(form.confirmation_flags(), vec!["Force"]);
        }
    }
}
