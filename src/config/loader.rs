//! Reading rule-set files from text or disk.

use crate::config::runner::RuleSet;
use crate::config::schema::{RuleSetConfig, ValidationError};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read rule set from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse rule set TOML{}: {source}", located(.path))]
    Toml {
        path: Option<PathBuf>,
        #[source]
        source: toml_edit::de::Error,
    },

    #[error("invalid rule set{}: {source}", located(.path))]
    Validation {
        path: Option<PathBuf>,
        #[source]
        source: ValidationError,
    },
}

impl ConfigError {
    /// The file the error came from, when the input was read from disk.
    pub fn path(&self) -> Option<&Path> {
        match self {
            ConfigError::Io { path, .. } => Some(path.as_path()),
            ConfigError::Toml { path, .. } | ConfigError::Validation { path, .. } => {
                path.as_deref()
            }
        }
    }

    fn in_file(self, file: &Path) -> Self {
        match self {
            ConfigError::Toml { path: None, source } => ConfigError::Toml {
                path: Some(file.to_path_buf()),
                source,
            },
            ConfigError::Validation { path: None, source } => ConfigError::Validation {
                path: Some(file.to_path_buf()),
                source,
            },
            other => other,
        }
    }
}

fn located(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|path| format!(" ({})", path.display()))
        .unwrap_or_default()
}

/// Deserialize and validate a rule set.
pub fn load_from_str(input: &str) -> Result<RuleSetConfig, ConfigError> {
    let config: RuleSetConfig = toml_edit::de::from_str(input)
        .map_err(|source| ConfigError::Toml { path: None, source })?;
    config
        .validate()
        .map_err(|source| ConfigError::Validation { path: None, source })?;
    tracing::debug!(name = %config.meta.name, rules = config.rules.len(), "rule set loaded");
    Ok(config)
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<RuleSetConfig, ConfigError> {
    let file = path.as_ref();
    let text = fs::read_to_string(file).map_err(|source| ConfigError::Io {
        path: file.to_path_buf(),
        source,
    })?;
    load_from_str(&text).map_err(|error| error.in_file(file))
}

/// Read, validate, and compile a rule-set file in one step.
pub fn load_rule_set(path: impl AsRef<Path>) -> Result<RuleSet, ConfigError> {
    let file = path.as_ref();
    let config = load_from_path(file)?;
    RuleSet::compile(&config).map_err(|error| error.in_file(file))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_from_text_have_no_path() {
        let err = load_from_str("rules = 3").unwrap_err();
        assert!(matches!(err, ConfigError::Toml { path: None, .. }));
        assert!(err.path().is_none());
        assert!(err.to_string().starts_with("failed to parse rule set TOML: "));
    }

    #[test]
    fn in_file_fills_a_missing_path_only() {
        let err = load_from_str("[[rules]]\nname = \"x\"\n")
            .unwrap_err()
            .in_file(Path::new("first.toml"))
            .in_file(Path::new("second.toml"));
        assert_eq!(err.path(), Some(Path::new("first.toml")));
        assert!(err.to_string().starts_with("invalid rule set (first.toml): "));
    }

    #[test]
    fn load_rule_set_compiles_every_rule() {
        let dir = tempfile::TempDir::new().unwrap();
        let file = dir.path().join("set.toml");
        fs::write(
            &file,
            "[meta]\nname = \"s\"\n\n[[rules]]\nname = \"a\"\nrule = \"cl=a;tag=div\"\n",
        )
        .unwrap();
        let rule_set = load_rule_set(&file).unwrap();
        assert_eq!(rule_set.name(), "s");
        assert_eq!(rule_set.rules()[0].rule.encode(), "cl=a;tag=div");
    }
}
