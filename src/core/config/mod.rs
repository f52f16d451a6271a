//! core::config
//!
//! Configuration schema and loading.
//!
//! # Overview
//!
//! gitdeck has two configuration scopes:
//! - **Global**: User-level settings
//! - **Repo**: Repository-level overrides
//!
//! # Precedence
//!
//! Configuration values are resolved in this order (later overrides earlier):
//! 1. Default values
//! 2. Global config file
//! 3. Repo config file
//! 4. CLI flags (applied by the caller via [`Overrides`])
//!
//! # Global Config Locations
//!
//! Searched in order:
//! 1. `$GITDECK_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/gitdeck/config.toml`
//! 3. `~/.gitdeck/config.toml`
//!
//! # Repo Config Location
//!
//! `.git/gitdeck/config.toml` under the working directory.
//!
//! # Example
//!
//! ```no_run
//! use gitdeck::core::config::Config;
//! use std::path::Path;
//!
//! let result = Config::load(Some(Path::new("/path/to/repo"))).unwrap();
//! let config = result.config;
//!
//! println!("program: {}", config.git_program());
//! println!("audit: {}", config.audit_enabled());
//! ```

pub mod schema;

pub use schema::{GlobalConfig, RepoConfig, UiDefaults};

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

/// Default capacity of the live output channel.
pub const DEFAULT_LINE_BUFFER: usize = 256;

/// File name of the combo document searched in the data dir and working dir.
pub const COMBOS_FILE_NAME: &str = "combos.json";

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("failed to write config file '{path}': {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config value: {0}")]
    InvalidValue(String),

    #[error("home directory not found")]
    NoHomeDir,
}

/// Result of loading configuration.
#[derive(Debug)]
pub struct ConfigLoadResult {
    /// The loaded configuration.
    pub config: Config,
}

/// Values supplied on the command line; they beat every file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub combos_path: Option<PathBuf>,
    pub timeout_secs: Option<u64>,
    pub no_audit: bool,
}

/// Merged configuration from all sources.
///
/// Accessors apply precedence automatically: CLI overrides, then repo
/// config, then global config, then defaults.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Global configuration
    pub global: GlobalConfig,
    /// Repository configuration (if in a repo)
    pub repo: Option<RepoConfig>,
    /// CLI overrides
    pub overrides: Overrides,
    /// Repository root the repo config was resolved against
    repo_root: Option<PathBuf>,
    /// Path to the global config file (if loaded)
    global_path: Option<PathBuf>,
    /// Path to the repo config file (if loaded)
    repo_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from default locations.
    ///
    /// If `repo_path` is provided, also loads repo-specific config.
    ///
    /// # Errors
    ///
    /// Returns an error if config files exist but cannot be parsed or hold
    /// invalid values. Missing config files are not an error.
    pub fn load(repo_path: Option<&Path>) -> Result<ConfigLoadResult, ConfigError> {
        let (global, global_path) = Self::load_global()?;

        let (repo, repo_path_found) = match repo_path {
            Some(path) => Self::load_repo(path)?,
            None => (None, None),
        };

        global.validate()?;
        if let Some(ref r) = repo {
            r.validate()?;
        }

        tracing::debug!(
            global = ?global_path,
            repo = ?repo_path_found,
            "configuration loaded"
        );

        Ok(ConfigLoadResult {
            config: Config {
                global,
                repo,
                overrides: Overrides::default(),
                repo_root: repo_path.map(Path::to_path_buf),
                global_path,
                repo_path: repo_path_found,
            },
        })
    }

    /// Apply command-line overrides.
    pub fn with_overrides(mut self, overrides: Overrides) -> Self {
        self.overrides = overrides;
        self
    }

    fn load_global() -> Result<(GlobalConfig, Option<PathBuf>), ConfigError> {
        // 1. Check $GITDECK_CONFIG
        if let Ok(path) = std::env::var("GITDECK_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                let config = Self::read_toml(&path)?;
                return Ok((config, Some(path)));
            }
        }

        // 2. Check $XDG_CONFIG_HOME/gitdeck/config.toml
        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_home).join("gitdeck/config.toml");
            if path.exists() {
                let config = Self::read_toml(&path)?;
                return Ok((config, Some(path)));
            }
        }

        // 3. Check ~/.gitdeck/config.toml
        if let Some(home) = dirs::home_dir() {
            let path = home.join(".gitdeck/config.toml");
            if path.exists() {
                let config = Self::read_toml(&path)?;
                return Ok((config, Some(path)));
            }
        }

        Ok((GlobalConfig::default(), None))
    }

    fn load_repo(repo_path: &Path) -> Result<(Option<RepoConfig>, Option<PathBuf>), ConfigError> {
        let path = Self::repo_config_path(repo_path);
        if !path.exists() {
            return Ok((None, None));
        }
        let config = Self::read_toml(&path)?;
        Ok((Some(config), Some(path)))
    }

    fn read_toml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Get the canonical path for repo config.
    ///
    /// Returns `.git/gitdeck/config.toml` relative to the given repo path.
    pub fn repo_config_path(repo_path: &Path) -> PathBuf {
        repo_path.join(".git/gitdeck/config.toml")
    }

    /// The per-user data directory (`~/.gitdeck`).
    pub fn data_dir() -> Result<PathBuf, ConfigError> {
        let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
        Ok(home.join(".gitdeck"))
    }

    /// Canonical write location for the global config (`~/.gitdeck/config.toml`).
    pub fn global_config_path() -> Result<PathBuf, ConfigError> {
        Ok(Self::data_dir()?.join("config.toml"))
    }

    /// Write global config atomically, creating parent directories.
    pub fn write_global(config: &GlobalConfig) -> Result<PathBuf, ConfigError> {
        config.validate()?;
        let path = Self::global_config_path()?;
        write_config_atomic(&path, config)?;
        Ok(path)
    }

    /// Write repo config atomically, creating parent directories.
    pub fn write_repo(repo_path: &Path, config: &RepoConfig) -> Result<PathBuf, ConfigError> {
        config.validate()?;
        let path = Self::repo_config_path(repo_path);
        write_config_atomic(&path, config)?;
        Ok(path)
    }

    // =========================================================================
    // Accessor methods with precedence
    // =========================================================================

    /// Program used for every invocation.
    ///
    /// Defaults to "git".
    pub fn git_program(&self) -> &str {
        self.global.git_program.as_deref().unwrap_or("git")
    }

    /// Whether completed runs go to the audit log.
    ///
    /// Defaults to `true`; `--no-audit` wins over any file.
    pub fn audit_enabled(&self) -> bool {
        !self.overrides.no_audit && self.global.audit.unwrap_or(true)
    }

    /// Audit log location.
    ///
    /// Defaults to `~/.gitdeck/audit.log`.
    pub fn audit_path(&self) -> Option<PathBuf> {
        self.global
            .audit_path
            .clone()
            .or_else(|| Self::data_dir().ok().map(|d| d.join("audit.log")))
    }

    /// Diagnostic log location (`~/.gitdeck/gitdeck.log`).
    pub fn log_path(&self) -> Option<PathBuf> {
        Self::data_dir().ok().map(|d| d.join("gitdeck.log"))
    }

    /// Per-run timeout, if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.overrides
            .timeout_secs
            .or_else(|| self.repo.as_ref().and_then(|r| r.timeout_secs))
            .or(self.global.timeout_secs)
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    /// Capacity of the live output channel.
    pub fn line_buffer(&self) -> usize {
        self.global.line_buffer.unwrap_or(DEFAULT_LINE_BUFFER)
    }

    /// Whether combo forms start with advanced flags expanded.
    pub fn show_advanced(&self) -> bool {
        self.global
            .ui
            .as_ref()
            .and_then(|ui| ui.show_advanced)
            .unwrap_or(false)
    }

    /// Ordered candidate locations for the combo document.
    ///
    /// The first one that loads wins: CLI override, repo config, global
    /// config, the data dir, then the working directory.
    pub fn combos_candidates(&self, cwd: &Path) -> Vec<PathBuf> {
        let mut candidates = Vec::new();
        if let Some(path) = &self.overrides.combos_path {
            candidates.push(path.clone());
        }
        if let Some(path) = self.repo.as_ref().and_then(|r| r.combos_path.as_ref()) {
            let root = self.repo_root.as_deref().unwrap_or(cwd);
            candidates.push(root.join(path));
        }
        if let Some(path) = &self.global.combos_path {
            candidates.push(path.clone());
        }
        if let Ok(dir) = Self::data_dir() {
            candidates.push(dir.join(COMBOS_FILE_NAME));
        }
        candidates.push(cwd.join(COMBOS_FILE_NAME));
        candidates.dedup();
        candidates
    }

    /// Get the path to the loaded global config file.
    pub fn global_config_loaded_from(&self) -> Option<&Path> {
        self.global_path.as_deref()
    }

    /// Get the path to the loaded repo config file.
    pub fn repo_config_loaded_from(&self) -> Option<&Path> {
        self.repo_path.as_deref()
    }
}

/// Write to a sibling temp file, sync, then rename over the target.
fn write_config_atomic<T: serde::Serialize>(path: &Path, config: &T) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(write_err(path))?;
    }

    let contents =
        toml::to_string_pretty(config).map_err(|e| ConfigError::InvalidValue(e.to_string()))?;

    let temp_path = path.with_extension("toml.tmp");
    let mut file = fs::File::create(&temp_path).map_err(write_err(&temp_path))?;
    file.write_all(contents.as_bytes())
        .map_err(write_err(&temp_path))?;
    file.sync_all().map_err(write_err(&temp_path))?;
    fs::rename(&temp_path, path).map_err(write_err(path))?;
    Ok(())
}

fn write_err(path: &Path) -> impl FnOnce(std::io::Error) -> ConfigError {
    let path = path.to_path_buf();
    move |source| ConfigError::WriteError { path, source }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_without_files() {
        let config = Config::default();

        assert_eq!(config.git_program(), "git");
        assert!(config.audit_enabled());
        assert!(config.timeout().is_none());
        assert_eq!(config.line_buffer(), DEFAULT_LINE_BUFFER);
        assert!(!config.show_advanced());
    }

    #[test]
    fn load_repo_config() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join(".git/gitdeck");
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("config.toml"),
            r#"
            combos_path = "combos/local.json"
            timeout_secs = 42
            "#,
        )
        .unwrap();

        let result = Config::load(Some(temp.path())).unwrap();
        let config = result.config;

        assert_eq!(config.timeout(), Some(Duration::from_secs(42)));
        assert!(config.repo_config_loaded_from().is_some());
        let candidates = config.combos_candidates(temp.path());
        assert_eq!(candidates[0], temp.path().join("combos/local.json"));
    }

    #[test]
    fn unknown_fields_rejected() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join(".git/gitdeck");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("config.toml"), "mystery = 1").unwrap();

        assert!(Config::load(Some(temp.path())).is_err());
    }

    #[test]
    fn invalid_repo_value_rejected() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join(".git/gitdeck");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("config.toml"), "timeout_secs = 0").unwrap();

        assert!(Config::load(Some(temp.path())).is_err());
    }

    #[test]
    fn precedence_cli_over_repo_over_global() {
        let config = Config {
            global: GlobalConfig {
                timeout_secs: Some(10),
                ..Default::default()
            },
            repo: Some(RepoConfig {
                timeout_secs: Some(20),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert_eq!(config.timeout(), Some(Duration::from_secs(20)));

        let config = config.with_overrides(Overrides {
            timeout_secs: Some(30),
            no_audit: true,
            ..Default::default()
        });
        assert_eq!(config.timeout(), Some(Duration::from_secs(30)));
        assert!(!config.audit_enabled());
    }

    #[test]
    fn cli_combos_path_is_first_candidate() {
        let cwd = Path::new("/work");
        let config = Config::default().with_overrides(Overrides {
            combos_path: Some(PathBuf::from("/tmp/mine.json")),
            ..Default::default()
        });
        let candidates = config.combos_candidates(cwd);
        assert_eq!(candidates.first(), Some(&PathBuf::from("/tmp/mine.json")));
        assert_eq!(candidates.last(), Some(&cwd.join(COMBOS_FILE_NAME)));
    }

    #[test]
    fn write_repo_config_atomic() {
        let temp = TempDir::new().unwrap();
        let config = RepoConfig {
            timeout_secs: Some(15),
            ..Default::default()
        };

        let path = Config::write_repo(temp.path(), &config).unwrap();
        assert!(path.exists());
        assert!(!path.with_extension("toml.tmp").exists());

        let loaded = Config::load(Some(temp.path())).unwrap().config;
        assert_eq!(loaded.repo, Some(config));
    }

    #[test]
    fn write_rejects_invalid_values() {
        let temp = TempDir::new().unwrap();
        let config = RepoConfig {
            timeout_secs: Some(0),
            ..Default::default()
        };
        assert!(Config::write_repo(temp.path(), &config).is_err());
    }
}
