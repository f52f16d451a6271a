//! Integration tests for the `gd` binary's non-interactive commands.
//!
//! Each test runs with a private HOME and working directory so no user
//! configuration, combo document, or audit log leaks in.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

struct Sandbox {
    home: TempDir,
    work: TempDir,
}

impl Sandbox {
    fn new() -> Self {
        Self {
            home: TempDir::new().expect("failed to create home"),
            work: TempDir::new().expect("failed to create work dir"),
        }
    }

    fn gd(&self) -> Command {
        let mut cmd = Command::cargo_bin("gd").expect("binary builds");
        cmd.env("HOME", self.home.path())
            .env("XDG_CONFIG_HOME", self.home.path().join(".config"))
            .env_remove("GITDECK_CONFIG")
            .env_remove("RUST_LOG")
            .arg("--cwd")
            .arg(self.work.path());
        cmd
    }

    fn data_dir(&self) -> std::path::PathBuf {
        self.home.path().join(".gitdeck")
    }
}

fn bundled_combos() -> std::path::PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("assets").join("combos.json")
}

mod actions {
    use super::*;

    #[test]
    fn lists_categories_and_actions() {
        Sandbox::new()
            .gd()
            .arg("actions")
            .assert()
            .success()
            .stdout(predicate::str::contains("basics:"))
            .stdout(predicate::str::contains("commit"))
            .stdout(predicate::str::contains("[form]").not());
    }

    #[test]
    fn marks_actions_with_forms() {
        Sandbox::new()
            .gd()
            .arg("--combos")
            .arg(bundled_combos())
            .args(["actions", "--category", "basics"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[form]"));
    }

    #[test]
    fn unknown_category_fails() {
        Sandbox::new()
            .gd()
            .args(["actions", "--category", "nonsense"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Unknown category"));
    }
}

mod preview {
    use super::*;

    #[test]
    fn quiet_prints_the_chain() {
        Sandbox::new()
            .gd()
            .args(["-q", "preview", "commit", "--set", "message=x"])
            .assert()
            .success()
            .stdout("git add -A && git commit -m x\n");
    }

    #[test]
    fn hard_undo_reports_confirmation() {
        Sandbox::new()
            .gd()
            .args(["preview", "undo", "--set", "mode=hard"])
            .assert()
            .success()
            .stdout(predicate::str::contains("git reset --hard 'HEAD~1'"))
            .stdout(predicate::str::contains("confirmation: required"));
    }

    #[test]
    fn missing_required_value_fails() {
        Sandbox::new()
            .gd()
            .args(["preview", "commit"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("message: is required"));
    }

    #[test]
    fn malformed_assignment_fails() {
        Sandbox::new()
            .gd()
            .args(["preview", "commit", "--set", "message"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("KEY=VALUE"));
    }

    #[test]
    fn configured_program_is_used() {
        let sandbox = Sandbox::new();
        fs::create_dir_all(sandbox.data_dir()).unwrap();
        fs::write(
            sandbox.data_dir().join("config.toml"),
            "git_program = \"/opt/git/bin/git\"\n",
        )
        .unwrap();

        sandbox
            .gd()
            .args(["-q", "preview", "status"])
            .assert()
            .success()
            .stdout("/opt/git/bin/git status\n");
    }

    #[test]
    fn combo_document_in_work_dir_is_picked_up() {
        let sandbox = Sandbox::new();
        fs::copy(bundled_combos(), sandbox.work.path().join("combos.json")).unwrap();

        sandbox
            .gd()
            .args(["-q", "preview", "log", "--set", "graph=yes", "--set", "count=5"])
            .assert()
            .success()
            .stdout("git log --graph -n 5\n");
    }
}

mod config {
    use super::*;

    #[test]
    fn set_then_get() {
        let sandbox = Sandbox::new();
        sandbox
            .gd()
            .args(["config", "set", "timeout_secs", "30"])
            .assert()
            .success();
        sandbox
            .gd()
            .args(["config", "get", "timeout_secs"])
            .assert()
            .success()
            .stdout("30\n");
        assert!(sandbox.data_dir().join("config.toml").exists());
    }

    #[test]
    fn invalid_value_rejected() {
        Sandbox::new()
            .gd()
            .args(["config", "set", "audit", "sometimes"])
            .assert()
            .failure();
    }

    #[test]
    fn malformed_file_is_reported() {
        let sandbox = Sandbox::new();
        fs::create_dir_all(sandbox.data_dir()).unwrap();
        fs::write(sandbox.data_dir().join("config.toml"), "colour = \"red\"\n").unwrap();

        sandbox
            .gd()
            .args(["config", "list"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("configuration"));
    }
}

mod misc {
    use super::*;

    #[test]
    fn empty_history() {
        Sandbox::new()
            .gd()
            .arg("history")
            .assert()
            .success()
            .stdout(predicate::str::contains("No runs recorded"));
    }

    #[test]
    fn bash_completion() {
        Sandbox::new()
            .gd()
            .args(["completion", "bash"])
            .assert()
            .success()
            .stdout(predicate::str::contains("_gd"));
    }

    #[test]
    fn tui_refuses_without_terminal() {
        Sandbox::new().gd().arg("tui").assert().failure();
    }
}
