//! actions::builtin
//!
//! The built-in catalog.
//!
//! Every action here is declarative: the closures only compute argument
//! vectors from their input. Destructiveness is judged per input, so a
//! plain push stays frictionless while a forced one needs confirmation.

use crate::core::types::{ActionInput, BranchName, FieldError, Invocation, ResolvedCommand};

use super::{is_force_flag, split_args, ActionDef, ActionRegistry, Prompt};

/// `(name, category, help, verb tokens, args label, args default)`
type PassthroughRow = (
    &'static str,
    &'static str,
    &'static str,
    &'static [&'static str],
    &'static str,
    &'static str,
);

const PASSTHROUGH: &[PassthroughRow] = &[
    ("rebase", "branching", "Rebase (non-interactive)", &["rebase"], "rebase args (e.g. origin/main)", ""),
    ("diff", "basics", "Show changes", &["diff"], "diff args (e.g. HEAD~1..HEAD)", ""),
    ("log", "history", "Show commit history", &["log"], "log args (e.g. --oneline -n 20)", "--oneline -n 20"),
    ("show", "history", "Show an object", &["show"], "show args (e.g. HEAD:filename)", ""),
    ("branch", "branching", "List, create or delete branches", &["branch"], "branch args (e.g. -a / new-branch)", "-a"),
    ("checkout", "branching", "Switch branches or restore files", &["checkout"], "checkout args (branch or -- file)", ""),
    ("switch", "branching", "Switch branches", &["switch"], "switch args (branch)", ""),
    ("mv", "basics", "Move or rename tracked files", &["mv"], "mv args (src dst)", ""),
    ("restore", "basics", "Restore working tree files", &["restore"], "restore args (e.g. --staged file)", ""),
    ("rm", "basics", "Remove files from the tree and index", &["rm"], "rm args (files)", ""),
    ("tag", "branching", "Create, list or delete tags", &["tag"], "tag args", "-l"),
    ("fetch", "remote", "Fetch from remotes", &["fetch"], "fetch args", ""),
    ("pull", "remote", "Fetch and integrate", &["pull"], "pull args", ""),
    ("remote", "remote", "Manage remotes", &["remote"], "remote args (add origin <url>)", "-v"),
    ("ls-remote", "remote", "List refs in a remote repository", &["ls-remote"], "ls-remote args (remote URL)", ""),
    ("stash", "stash", "Stash operations (list/push/apply/pop/drop)", &["stash"], "stash args (list | push -m <msg> | pop)", "list"),
    ("stash-pop", "stash", "Pop a stash entry", &["stash", "pop"], "pop args (e.g. stash@{0})", "stash@{0}"),
    ("stash-drop", "stash", "Drop a stash entry", &["stash", "drop"], "drop args (e.g. stash@{0})", "stash@{0}"),
    ("stash-list", "stash", "List stash entries", &["stash", "list"], "", ""),
    ("bisect", "history", "Find the commit that introduced a bug", &["bisect"], "bisect args (start/good/bad/reset)", ""),
    ("reflog", "history", "Show the reference log", &["reflog"], "reflog args (e.g. -n 50)", "-n 50"),
    ("blame", "history", "Annotate a file line by line", &["blame"], "blame args (file)", ""),
    ("shortlog", "history", "Summarize commits by author", &["shortlog"], "shortlog args (e.g. -s -n)", "-s -n"),
    ("describe", "history", "Describe a commit by its nearest tag", &["describe"], "describe args (e.g. --tags --long)", ""),
    ("cherry", "history", "Find commits not yet applied upstream", &["cherry"], "cherry args", ""),
    ("grep", "history", "Search tracked files", &["grep"], "grep args", "-n TODO"),
    ("cherry-pick", "branching", "Apply the changes of existing commits", &["cherry-pick"], "cherry-pick args (commit...)", ""),
    ("revert", "branching", "Create commits that revert earlier ones", &["revert"], "revert args (commit...)", ""),
    ("apply", "patches", "Apply a patch", &["apply"], "apply args (path/to/patch)", ""),
    ("am", "patches", "Apply patches from a mailbox", &["am"], "am args (patch-file)", ""),
    ("format-patch", "patches", "Create patch files", &["format-patch"], "format-patch args (range)", ""),
    ("archive", "patches", "Create an archive of a tree", &["archive"], "archive args (--format=zip HEAD)", ""),
    ("bundle", "patches", "Create or unpack a bundle", &["bundle"], "bundle args", ""),
    ("gc", "maintenance", "Garbage-collect the repository", &["gc"], "gc args", ""),
    ("fsck", "maintenance", "Check repository integrity", &["fsck"], "fsck args", ""),
    ("prune", "maintenance", "Prune unreachable objects", &["prune"], "prune args", ""),
    ("count-objects", "maintenance", "Count objects and disk usage", &["count-objects"], "count-objects args", "-v"),
    ("rerere", "maintenance", "Reuse recorded conflict resolutions", &["rerere"], "rerere args", ""),
    ("worktree", "maintenance", "Manage worktrees", &["worktree"], "worktree args (add/list/remove)", "list"),
    ("submodule", "maintenance", "Manage submodules", &["submodule"], "submodule args (add/update/status)", "status"),
    ("config", "maintenance", "Get or set configuration", &["config"], "config args (e.g. --global user.name Me)", "--list"),
    ("help", "maintenance", "Show help for a command", &["help"], "help args (e.g. commit)", ""),
    ("filter-branch", "advanced", "Rewrite branches (dangerous)", &["filter-branch"], "filter-branch args", ""),
];

/// Register the full built-in catalog, every command targeting `program`.
pub fn register_builtins(registry: &mut ActionRegistry, program: &str) {
    let actions = [
        init(program),
        status(program),
        add(program),
        commit(program),
        push(program),
        clone(program),
        undo(program),
        reset(program),
        clean(program),
        merge(program),
        rebase_interactive(program),
        raw(program),
    ];
    for action in actions {
        register(registry, action);
    }

    for (name, category, help, verb, label, default) in PASSTHROUGH {
        register(
            registry,
            ActionDef::passthrough(program, name, category, help, verb, label, default),
        );
    }
}

fn register(registry: &mut ActionRegistry, action: ActionDef) {
    if let Err(e) = registry.register(action) {
        tracing::warn!(error = %e, "skipping built-in action");
    }
}

fn init(program: &str) -> ActionDef {
    let program = program.to_string();
    ActionDef::new(
        "init",
        "basics",
        "Initialize a repository, optionally with an empty first commit",
        move |input| {
            let path = non_blank_or(input, "path", ".");
            let init = ResolvedCommand::new(program.clone(), ["init", path]);
            if !input.is_yes("initial_commit") {
                return init;
            }
            ResolvedCommand::new(
                program.clone(),
                ["-C", path, "commit", "--allow-empty", "-m", "initial commit"],
            )
            .preceded_by(init.primary())
        },
    )
    .prompt(Prompt::required("path", "Directory", "."))
    .prompt(Prompt::new(
        "initial_commit",
        "Create an empty initial commit? (y/N)",
        "n",
    ))
}

fn status(program: &str) -> ActionDef {
    let program = program.to_string();
    ActionDef::new("status", "basics", "Show the working tree status", move |_| {
        ResolvedCommand::new(program.clone(), ["status"])
    })
}

fn add(program: &str) -> ActionDef {
    let program = program.to_string();
    ActionDef::new("add", "basics", "Stage files", move |input| {
        let paths = split_paths(input.get("paths"));
        let mut args = vec!["add".to_string()];
        if paths.is_empty() || paths == ["-A"] {
            args.push("-A".to_string());
        } else {
            args.extend(paths);
        }
        ResolvedCommand::new(program.clone(), args)
    })
    .prompt(Prompt::required(
        "paths",
        "Files to add (comma or space separated)",
        "-A",
    ))
}

fn commit(program: &str) -> ActionDef {
    let program = program.to_string();
    ActionDef::new("commit", "basics", "Create a commit", move |input| {
        let cmd = ResolvedCommand::new(program.clone(), ["commit", "-m", input.get("message")]);
        if input.is_yes("stage") {
            cmd.preceded_by(Invocation::new(program.clone(), ["add", "-A"]))
        } else {
            cmd
        }
    })
    .prompt(Prompt::required("message", "Commit message", ""))
    .prompt(Prompt::new("stage", "Stage all changes first? (y/N)", "y"))
}

fn push(program: &str) -> ActionDef {
    let program = program.to_string();
    ActionDef::new("push", "remote", "Push to a remote", move |input| {
        let mut args = vec!["push"];
        if input.is_yes("force") {
            args.push("--force");
        }
        args.push(non_blank_or(input, "remote", "origin"));
        if !input.trimmed("branch").is_empty() {
            args.push(input.trimmed("branch"));
        }
        ResolvedCommand::new(program.clone(), args)
    })
    .prompt(Prompt::new("remote", "Remote name", "origin"))
    .prompt(Prompt::new("branch", "Branch", "main"))
    .prompt(Prompt::new("force", "Force push? (y/N)", "n"))
    .validate_with(|input| {
        let mut errors = Vec::new();
        if input.get("remote").chars().any(char::is_whitespace) {
            errors.push(FieldError::new("remote", "invalid remote name"));
        }
        let branch = input.trimmed("branch");
        if !branch.is_empty() {
            if let Err(e) = BranchName::new(branch) {
                errors.push(FieldError::new("branch", e.to_string()));
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    })
    .destructive_when(|input| input.is_yes("force"))
}

fn clone(program: &str) -> ActionDef {
    let program = program.to_string();
    ActionDef::new("clone", "remote", "Clone a repository", move |input| {
        let mut args = vec!["clone", input.trimmed("url")];
        if !input.trimmed("path").is_empty() {
            args.push(input.trimmed("path"));
        }
        ResolvedCommand::new(program.clone(), args)
    })
    .prompt(Prompt::required("url", "Repository URL", ""))
    .prompt(Prompt::new("path", "Directory (optional)", ""))
}

fn undo(program: &str) -> ActionDef {
    let program = program.to_string();
    ActionDef::new(
        "undo",
        "history",
        "Undo the last commit (soft/mixed/hard reset to HEAD~1)",
        move |input| {
            ResolvedCommand::new(
                program.clone(),
                ["reset", reset_mode(input.get("mode")), "HEAD~1"],
            )
        },
    )
    .prompt(Prompt::required("mode", "Mode (soft/mixed/hard)", "mixed"))
    .destructive_when(|input| input.trimmed("mode").eq_ignore_ascii_case("hard"))
}

fn reset(program: &str) -> ActionDef {
    let program = program.to_string();
    ActionDef::new(
        "reset",
        "history",
        "Reset the current branch to a ref (soft/mixed/hard)",
        move |input| {
            ResolvedCommand::new(
                program.clone(),
                [
                    "reset",
                    reset_mode(input.get("mode")),
                    non_blank_or(input, "ref", "HEAD~1"),
                ],
            )
        },
    )
    .prompt(Prompt::required("mode", "Mode (soft/mixed/hard)", "mixed"))
    .prompt(Prompt::required(
        "ref",
        "Reference (e.g. HEAD~1 or origin/main)",
        "HEAD~1",
    ))
    .destructive_when(|input| input.trimmed("mode").eq_ignore_ascii_case("hard"))
}

fn clean(program: &str) -> ActionDef {
    ActionDef::passthrough(
        program,
        "clean",
        "maintenance",
        "Remove untracked files (dry run by default)",
        &["clean"],
        "clean args (e.g. -fd)",
        "-n",
    )
    .destructive_when(|input| split_args(input.get("args")).iter().any(|a| is_force_flag(a)))
}

fn merge(program: &str) -> ActionDef {
    let program = program.to_string();
    ActionDef::new(
        "merge",
        "branching",
        "Merge a branch into the current one",
        move |input| {
            let mut args = vec!["merge"];
            let inspect = input.is_yes("no-ff");
            if inspect {
                args.extend(["--no-commit", "--no-ff"]);
            }
            let strategy = input.trimmed("strategy");
            if !strategy.is_empty() && strategy != "default" {
                args.extend(["-s", strategy]);
            }
            args.push(input.trimmed("branch"));
            let cmd = ResolvedCommand::new(program.clone(), args);
            if inspect {
                cmd.with_note("merges with --no-commit so conflicts can be inspected first")
            } else {
                cmd
            }
        },
    )
    .prompt(Prompt::required("branch", "Branch to merge", ""))
    .prompt(Prompt::new("strategy", "Strategy (default/ours/recursive)", ""))
    .prompt(Prompt::new("no-ff", "Stop before committing? (y/N)", "y"))
}

fn rebase_interactive(program: &str) -> ActionDef {
    let program = program.to_string();
    ActionDef::new(
        "rebase-interactive",
        "branching",
        "Interactive rebase (reorder, squash, reword)",
        move |input| {
            let mut args = vec!["rebase", "-i", non_blank_or(input, "base", "HEAD~5")];
            if input.is_yes("autosquash") {
                args.push("--autosquash");
            }
            ResolvedCommand::new(program.clone(), args)
                .with_note("rewrites history; a recovery branch is created first")
        },
    )
    .prompt(Prompt::required("base", "Base ref (e.g. HEAD~5)", "HEAD~5"))
    .prompt(Prompt::new("autosquash", "Autosquash? (y/N)", "n"))
    .destructive_when(|_| true)
}

fn raw(program: &str) -> ActionDef {
    let program = program.to_string();
    let leading = program.clone();
    ActionDef::new(
        "raw",
        "advanced",
        "Run a raw command line (expert mode), without the leading program name",
        move |input| ResolvedCommand::new(program.clone(), raw_args(input, &leading)),
    )
    .prompt(Prompt::required("command", "Command (without leading 'git')", ""))
    .validate_with(|input| {
        match shell_words::split(input.get("command")) {
            Ok(_) => Ok(()),
            Err(_) => Err(vec![FieldError::new("command", "has unbalanced quotes")]),
        }
    })
}

fn raw_args(input: &ActionInput, program: &str) -> Vec<String> {
    let mut args = split_args(input.get("command"));
    if args.first().is_some_and(|first| first == program || first == "git") {
        args.remove(0);
    }
    args
}

fn reset_mode(mode: &str) -> &'static str {
    match mode.trim().to_ascii_lowercase().as_str() {
        "soft" => "--soft",
        "hard" => "--hard",
        _ => "--mixed",
    }
}

fn non_blank_or<'a>(input: &'a ActionInput, key: &str, fallback: &'a str) -> &'a str {
    match input.trimmed(key) {
        "" => fallback,
        value => value,
    }
}

fn split_paths(text: &str) -> Vec<String> {
    text.replace(',', " ")
        .split_whitespace()
        .map(str::to_string)
        .collect()
}
