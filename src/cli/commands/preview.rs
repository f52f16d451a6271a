//! preview command - Resolve an action and print the command it would run

use std::sync::Arc;

use anyhow::{anyhow, bail, Result};

use super::Session;
use crate::actions::ActionDef;
use crate::combos::ComboForm;
use crate::core::types::{is_affirmative, ActionInput, FieldError, ResolvedCommand};
use crate::engine::gate::{GateDecision, SafetyGate};
use crate::ui::output::{self, Verbosity};
use crate::ui::Catalog;

/// What `preview` resolved.
#[derive(Debug, Clone)]
pub struct PreviewReport {
    pub action: String,
    pub command: ResolvedCommand,
    pub decision: GateDecision,
}

/// Parse `key=value` assignments. Later keys replace earlier ones.
pub fn parse_assignments(values: &[String]) -> Result<ActionInput> {
    let mut input = ActionInput::new();
    for raw in values {
        let (key, value) = raw
            .split_once('=')
            .ok_or_else(|| anyhow!("Expected KEY=VALUE, got '{raw}'"))?;
        let key = key.trim();
        if key.is_empty() {
            bail!("Empty key in '{raw}'");
        }
        input.set(key, value);
    }
    Ok(input)
}

/// Resolve `name` with `values` exactly the way the interactive UI would.
///
/// Actions with a combo spec go through a fully expanded form: manual flags
/// take their value, toggle flags are included when the value is truthy.
pub fn preview(catalog: &Catalog, name: &str, values: &ActionInput) -> Result<PreviewReport> {
    let action = resolve_action(catalog, name);
    let gate = SafetyGate::new(catalog.program.clone());

    if let Some(spec) = catalog.combos.get(&action.name) {
        let mut form = ComboForm::new(spec, true);
        for index in 0..form.visible().len() {
            let Some((toggle, key)) = form
                .flag_at(index)
                .map(|f| (f.is_toggle(), f.param_key.clone()))
            else {
                continue;
            };
            let Some(value) = values.get_opt(&key) else {
                continue;
            };
            if !toggle {
                form.set_value(&key, value);
            } else if is_affirmative(value) != form.is_included(&key) {
                form.toggle(index);
            }
        }
        form.validate().map_err(invalid)?;
        let command = form.build(&catalog.program);
        let decision = gate.assess(Some(action.as_ref()), &command, &form.resolve(), Some(&form));
        return Ok(PreviewReport {
            action: action.name.clone(),
            command,
            decision,
        });
    }

    let mut input = action.defaults();
    for (key, value) in values.iter() {
        input.set(key, value);
    }
    action.validate(&input).map_err(invalid)?;
    let command = action.build(&input);
    let decision = gate.assess(Some(action.as_ref()), &command, &input, None);
    Ok(PreviewReport {
        action: action.name.clone(),
        command,
        decision,
    })
}

/// Handler for `gd preview`.
pub fn print_preview(session: &Session, name: &str, values: &[String]) -> Result<()> {
    let input = parse_assignments(values)?;
    let report = preview(&session.catalog, name, &input)?;

    if session.verbosity == Verbosity::Quiet {
        output::result(report.command.render_chain());
        return Ok(());
    }
    output::print(format!("action:       {}", report.action), session.verbosity);
    output::print(format!("command:      {}", report.command.preview), session.verbosity);
    match &report.decision {
        GateDecision::Proceed => {
            output::print("confirmation: not required", session.verbosity);
        }
        GateDecision::Confirm { reasons, backup } => {
            output::print("confirmation: required", session.verbosity);
            output::print(output::format_list(reasons, "  - "), session.verbosity);
            if *backup {
                output::print("backup:       recovery branch before running", session.verbosity);
            }
        }
    }
    Ok(())
}

fn resolve_action(catalog: &Catalog, name: &str) -> Arc<ActionDef> {
    if let Some(action) = catalog.actions.get(name) {
        return action;
    }
    let actions = Arc::clone(&catalog.actions);
    catalog
        .parser
        .parse(name, |n| actions.get(n).is_some())
        .and_then(|n| actions.get(&n))
        .unwrap_or_else(|| Arc::new(ActionDef::generic(&catalog.program, name.trim())))
}

fn invalid(errors: Vec<FieldError>) -> anyhow::Error {
    let list: Vec<String> = errors.iter().map(ToString::to_string).collect();
    anyhow!("Invalid input: {}", list.join("; "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::ActionRegistry;
    use crate::combos::{ComboRegistry, CombosDocument};
    use std::path::Path;

    fn catalog(combos: ComboRegistry) -> Catalog {
        Catalog::new("git", ActionRegistry::with_builtins("git"), combos)
    }

    fn values(pairs: &[&str]) -> ActionInput {
        let owned: Vec<String> = pairs.iter().map(|s| s.to_string()).collect();
        parse_assignments(&owned).unwrap()
    }

    #[test]
    fn assignments_parsed() {
        let input = values(&["message=a=b", "stage=n"]);
        assert_eq!(input.get("message"), "a=b");
        assert_eq!(input.get("stage"), "n");
        assert!(parse_assignments(&["novalue".to_string()]).is_err());
        assert!(parse_assignments(&["=x".to_string()]).is_err());
    }

    #[test]
    fn commit_chain_without_confirmation() {
        let report = preview(&catalog(ComboRegistry::new()), "commit", &values(&["message=x"])).unwrap();
        assert_eq!(report.command.render_chain(), "git add -A && git commit -m x");
        assert_eq!(report.decision, GateDecision::Proceed);
    }

    #[test]
    fn hard_undo_requires_confirmation() {
        let report = preview(&catalog(ComboRegistry::new()), "undo", &values(&["mode=hard"])).unwrap();
        assert!(report.decision.requires_confirmation());
        assert!(report.decision.takes_backup());
    }

    #[test]
    fn missing_required_input_is_an_error() {
        let err = preview(&catalog(ComboRegistry::new()), "commit", &ActionInput::new()).unwrap_err();
        assert!(err.to_string().contains("message: is required"));
    }

    #[test]
    fn phrase_resolves() {
        let report = preview(&catalog(ComboRegistry::new()), "save", &values(&["message=x"])).unwrap();
        assert_eq!(report.action, "commit");
    }

    #[test]
    fn spec_form_used_when_present() {
        let doc = CombosDocument::parse(
            r#"{"commands":[{"action_key":"commit","flags":[
                {"key":"-a","param_key":"all","type":"boolean","previewOrder":1},
                {"key":"-m","param_key":"message","manualOnly":true,"required":true,"previewOrder":2}
            ]}]}"#,
            Path::new("combos.json"),
        )
        .unwrap();
        let catalog = catalog(ComboRegistry::from_document(doc));
        let report = preview(&catalog, "commit", &values(&["all=true", "message=fix"])).unwrap();
        assert_eq!(report.command.args, vec!["commit", "-a", "-m", "fix"]);
    }
}
