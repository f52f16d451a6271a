//! Integration tests for loading combo documents from disk.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use gitdeck::combos::{self, ComboForm, ComboRegistry, FlagType};

fn bundled() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("assets").join("combos.json")
}

#[test]
fn bundled_document_parses() {
    let doc = combos::load_from_file(&bundled()).expect("bundled combos must parse");
    let registry = ComboRegistry::from_document(doc);

    let commit = registry.get("ci").expect("alias resolves");
    assert_eq!(commit.action_key, "commit");
    let message = commit.flag("-m").expect("message flag");
    assert!(message.required);
    assert!(message.manual_only);

    let log = registry.get("log").expect("log spec");
    assert_eq!(log.flag("count").map(|f| f.kind), Some(FlagType::Integer));
    assert!(registry.get("clean").expect("clean spec").declares_destructive());
}

#[test]
fn first_loadable_candidate_wins() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("missing.json");
    let broken = dir.path().join("broken.json");
    let good = dir.path().join("good.json");
    fs::write(&broken, "{ not json").unwrap();
    fs::write(
        &good,
        r#"{"commands":[{"action_key":"status","flags":[{"key":"-s","param_key":"short"}]}]}"#,
    )
    .unwrap();

    let (doc, path) = combos::load_first(&[missing, broken, good.clone()]).expect("good loads");
    assert_eq!(path, good);
    assert_eq!(doc.commands[0].action_key, "status");
}

#[test]
fn nothing_loadable_disables_forms() {
    let dir = TempDir::new().unwrap();
    let broken = dir.path().join("combos.json");
    fs::write(&broken, r#"{"commands":[{"flags":[]}]}"#).unwrap();

    assert!(combos::load_first(&[dir.path().join("absent.json"), broken]).is_none());
}

#[test]
fn bundled_commit_form_builds() {
    let doc = combos::load_from_file(&bundled()).unwrap();
    let registry = ComboRegistry::from_document(doc);
    let mut form = ComboForm::new(registry.get("commit").unwrap(), false);

    assert!(form.validate().is_err());
    form.set_value("message", "fix: tidy");
    form.validate().expect("valid once the message is set");
    assert_eq!(form.build("git").args, vec!["commit", "-m", "fix: tidy"]);

    let all = form.visible().iter().position(|f| f.param_key == "all").unwrap();
    assert!(form.suggested(form.flag_at(all).unwrap()));
    form.toggle(all);
    assert_eq!(form.build("git").args, vec!["commit", "-a", "-m", "fix: tidy"]);
}
