//! core::config::schema
//!
//! Configuration schema types.
//!
//! # Global Config
//!
//! Located at (in order of precedence):
//! 1. `$GITDECK_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/gitdeck/config.toml`
//! 3. `~/.gitdeck/config.toml` (canonical write location)
//!
//! # Repo Config
//!
//! Located at `.git/gitdeck/config.toml`.
//!
//! # Validation
//!
//! Config values are validated after parsing (e.g. the timeout must be
//! positive, the program name must not be blank).

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Upper bound for the live line buffer between a run and the UI.
pub const MAX_LINE_BUFFER: usize = 65_536;

/// Global configuration (user scope).
///
/// # Example
///
/// ```toml
/// git_program = "git"
/// combos_path = "/home/me/.gitdeck/combos.json"
/// audit = true
/// timeout_secs = 600
/// line_buffer = 256
///
/// [ui]
/// show_advanced = false
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct GlobalConfig {
    /// Program used for every invocation (default: "git")
    pub git_program: Option<String>,

    /// Primary combo specification document
    pub combos_path: Option<PathBuf>,

    /// Whether completed runs are written to the audit log
    pub audit: Option<bool>,

    /// Audit log location override
    pub audit_path: Option<PathBuf>,

    /// Per-run timeout in seconds (absent: no timeout)
    pub timeout_secs: Option<u64>,

    /// Capacity of the live output channel
    pub line_buffer: Option<usize>,

    /// Presentation defaults
    pub ui: Option<UiDefaults>,
}

impl GlobalConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(program) = &self.git_program {
            if program.trim().is_empty() {
                return Err(ConfigError::InvalidValue(
                    "git_program cannot be empty".to_string(),
                ));
            }
        }
        validate_timeout(self.timeout_secs)?;
        if let Some(size) = self.line_buffer {
            if size == 0 || size > MAX_LINE_BUFFER {
                return Err(ConfigError::InvalidValue(format!(
                    "line_buffer must be between 1 and {MAX_LINE_BUFFER}, got {size}"
                )));
            }
        }
        Ok(())
    }
}

/// Repository configuration.
///
/// # Example
///
/// ```toml
/// combos_path = "tools/gitdeck-combos.json"
/// timeout_secs = 120
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RepoConfig {
    /// Repository-specific combo document (relative to the repo root)
    pub combos_path: Option<PathBuf>,

    /// Per-run timeout override in seconds
    pub timeout_secs: Option<u64>,
}

impl RepoConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_timeout(self.timeout_secs)
    }
}

/// Presentation defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct UiDefaults {
    /// Start combo forms with advanced flags expanded
    pub show_advanced: Option<bool>,
}

fn validate_timeout(timeout: Option<u64>) -> Result<(), ConfigError> {
    if timeout == Some(0) {
        return Err(ConfigError::InvalidValue(
            "timeout_secs must be positive (omit it to disable the timeout)".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    mod global_config {
        use super::*;

        #[test]
        fn defaults() {
            let config = GlobalConfig::default();
            assert!(config.git_program.is_none());
            assert!(config.audit.is_none());
            assert!(config.timeout_secs.is_none());
            assert!(config.validate().is_ok());
        }

        #[test]
        fn blank_program_rejected() {
            let config = GlobalConfig {
                git_program: Some("  ".to_string()),
                ..Default::default()
            };
            assert!(config.validate().is_err());
        }

        #[test]
        fn zero_timeout_rejected() {
            let config = GlobalConfig {
                timeout_secs: Some(0),
                ..Default::default()
            };
            assert!(config.validate().is_err());
        }

        #[test]
        fn line_buffer_bounds() {
            for (size, ok) in [(0, false), (1, true), (256, true), (MAX_LINE_BUFFER + 1, false)] {
                let config = GlobalConfig {
                    line_buffer: Some(size),
                    ..Default::default()
                };
                assert_eq!(config.validate().is_ok(), ok, "line_buffer = {size}");
            }
        }

        #[test]
        fn roundtrip() {
            let config = GlobalConfig {
                git_program: Some("/usr/bin/git".to_string()),
                combos_path: Some(PathBuf::from("/tmp/combos.json")),
                audit: Some(false),
                audit_path: None,
                timeout_secs: Some(30),
                line_buffer: Some(64),
                ui: Some(UiDefaults {
                    show_advanced: Some(true),
                }),
            };

            let toml = toml::to_string_pretty(&config).unwrap();
            let parsed: GlobalConfig = toml::from_str(&toml).unwrap();
            assert_eq!(config, parsed);
        }
    }

    mod repo_config {
        use super::*;

        #[test]
        fn reject_unknown_fields() {
            let toml = r#"
                timeout_secs = 5
                unknown_field = true
            "#;

            let result: Result<RepoConfig, _> = toml::from_str(toml);
            assert!(result.is_err());
        }

        #[test]
        fn zero_timeout_rejected() {
            let config = RepoConfig {
                timeout_secs: Some(0),
                ..Default::default()
            };
            assert!(config.validate().is_err());
        }
    }
}
