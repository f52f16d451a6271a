//! config command - Get, set, or list configuration values

use std::path::PathBuf;

use anyhow::{bail, Context as _, Result};

use crate::core::config::{Config, GlobalConfig, RepoConfig, UiDefaults};
use crate::engine::Context;

/// Keys accepted by `config get` and `config set`.
pub const KEYS: &[&str] = &[
    "git_program",
    "combos_path",
    "audit",
    "audit_path",
    "timeout_secs",
    "line_buffer",
    "ui.show_advanced",
];

fn load(ctx: &Context) -> Result<Config> {
    Ok(Config::load(Some(&ctx.work_dir()))
        .context("Failed to load configuration")?
        .config)
}

/// Effective value of `key`, empty when unset.
fn effective(config: &Config, key: &str) -> Result<String> {
    let value = match key {
        "git_program" => config.git_program().to_string(),
        "combos_path" => config
            .repo
            .as_ref()
            .and_then(|r| r.combos_path.clone())
            .or_else(|| config.global.combos_path.clone())
            .map(|p| p.display().to_string())
            .unwrap_or_default(),
        "audit" => config.audit_enabled().to_string(),
        "audit_path" => config
            .audit_path()
            .map(|p| p.display().to_string())
            .unwrap_or_default(),
        "timeout_secs" => config
            .timeout()
            .map(|t| t.as_secs().to_string())
            .unwrap_or_default(),
        "line_buffer" => config.line_buffer().to_string(),
        "ui.show_advanced" => config.show_advanced().to_string(),
        _ => bail!("Unknown configuration key: {key} (known: {})", KEYS.join(", ")),
    };
    Ok(value)
}

/// Get a configuration value.
pub fn get(ctx: &Context, key: &str) -> Result<()> {
    let config = load(ctx)?;
    let value = effective(&config, key)?;
    if !value.is_empty() {
        println!("{}", value);
    }
    Ok(())
}

/// Set a configuration value in the global file, or the repo file with `repo`.
pub fn set(ctx: &Context, key: &str, value: &str, repo: bool) -> Result<()> {
    let config = load(ctx)?;

    let path = if repo {
        let mut repo_config = config.repo.clone().unwrap_or_default();
        apply_repo(&mut repo_config, key, value)?;
        Config::write_repo(&ctx.work_dir(), &repo_config).context("Failed to write config")?
    } else {
        let mut global = config.global.clone();
        apply_global(&mut global, key, value)?;
        Config::write_global(&global).context("Failed to write config")?
    };

    if !ctx.quiet {
        println!("Set {} = {} in {}", key, value, path.display());
    }
    Ok(())
}

/// List all configuration values with their sources.
pub fn list(ctx: &Context) -> Result<()> {
    let config = load(ctx)?;

    println!("# gitdeck configuration");
    match config.global_config_loaded_from() {
        Some(path) => println!("# global: {}", path.display()),
        None => println!("# global: (defaults)"),
    }
    if let Some(path) = config.repo_config_loaded_from() {
        println!("# repo:   {}", path.display());
    }
    for key in KEYS {
        let value = effective(&config, key)?;
        if value.is_empty() {
            println!("{key} = (not set)");
        } else {
            println!("{key} = {value}");
        }
    }
    Ok(())
}

fn apply_global(config: &mut GlobalConfig, key: &str, value: &str) -> Result<()> {
    match key {
        "git_program" => config.git_program = Some(value.to_string()),
        "combos_path" => config.combos_path = Some(PathBuf::from(value)),
        "audit" => config.audit = Some(parse_bool(key, value)?),
        "audit_path" => config.audit_path = Some(PathBuf::from(value)),
        "timeout_secs" => config.timeout_secs = Some(parse_number(key, value)?),
        "line_buffer" => config.line_buffer = Some(parse_number(key, value)?),
        "ui.show_advanced" => {
            config.ui.get_or_insert_with(UiDefaults::default).show_advanced =
                Some(parse_bool(key, value)?)
        }
        _ => bail!("Unknown configuration key: {key} (known: {})", KEYS.join(", ")),
    }
    Ok(())
}

fn apply_repo(config: &mut RepoConfig, key: &str, value: &str) -> Result<()> {
    match key {
        "combos_path" => config.combos_path = Some(PathBuf::from(value)),
        "timeout_secs" => config.timeout_secs = Some(parse_number(key, value)?),
        _ => bail!("'{key}' cannot be set per repository (use combos_path or timeout_secs)"),
    }
    Ok(())
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    value
        .trim()
        .parse()
        .with_context(|| format!("{key} expects true or false, got '{value}'"))
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .trim()
        .parse()
        .with_context(|| format!("{key} expects a number, got '{value}'"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_keys_applied() {
        let mut config = GlobalConfig::default();
        apply_global(&mut config, "timeout_secs", "30").unwrap();
        apply_global(&mut config, "ui.show_advanced", "true").unwrap();
        apply_global(&mut config, "audit", "false").unwrap();
        assert_eq!(config.timeout_secs, Some(30));
        assert_eq!(config.ui.unwrap().show_advanced, Some(true));
        assert_eq!(config.audit, Some(false));
    }

    #[test]
    fn bad_values_rejected() {
        let mut config = GlobalConfig::default();
        assert!(apply_global(&mut config, "audit", "maybe").is_err());
        assert!(apply_global(&mut config, "line_buffer", "lots").is_err());
        assert!(apply_global(&mut config, "colour", "red").is_err());
    }

    #[test]
    fn repo_scope_is_limited() {
        let mut config = RepoConfig::default();
        apply_repo(&mut config, "timeout_secs", "5").unwrap();
        assert_eq!(config.timeout_secs, Some(5));
        assert!(apply_repo(&mut config, "git_program", "hg").is_err());
    }

    #[test]
    fn effective_defaults() {
        let config = Config::default();
        assert_eq!(effective(&config, "git_program").unwrap(), "git");
        assert_eq!(effective(&config, "timeout_secs").unwrap(), "");
        assert!(effective(&config, "nope").is_err());
    }
}
