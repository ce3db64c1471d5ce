use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::history::NavigationHistory;
use crate::mapping::RenameValidator;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub rename: RenameConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Cap on remembered navigation steps. Unbounded when unset.
    #[serde(default)]
    pub max_depth: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameConfig {
    /// Names rejected as reserved on top of the Java keywords.
    #[serde(default)]
    pub reserved: Vec<String>,
}

impl Config {
    pub fn navigation_history(&self) -> NavigationHistory {
        match self.history.max_depth {
            Some(max) => NavigationHistory::with_max_depth(max),
            None => NavigationHistory::new(),
        }
    }

    pub fn rename_validator(&self) -> RenameValidator {
        RenameValidator::new().with_reserved(self.rename.reserved.iter().cloned())
    }
}

/// Default config file names, searched in order.
const CONFIG_FILENAMES: &[&str] = &[".unscramble/config.toml", "unscramble.toml"];

/// Find the config file for a project.
///
/// If `config_override` is provided, use that path directly.
/// Otherwise, search for config files in the project root.
pub fn find_config_path(project_root: &Path, config_override: Option<&Path>) -> Option<PathBuf> {
    if let Some(override_path) = config_override {
        if override_path.exists() {
            return Some(override_path.to_path_buf());
        }
        return None;
    }

    CONFIG_FILENAMES
        .iter()
        .map(|filename| project_root.join(filename))
        .find(|path| path.exists())
}

/// Load and parse a config from a TOML file.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    parse_config(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Parse a config from a TOML string.
pub fn parse_config(toml_str: &str) -> Result<Config> {
    let config: Config = toml::from_str(toml_str)?;
    Ok(config)
}

/// Load the project's config, or defaults when there is none.
///
/// An explicit override that does not exist is an error.
pub fn load_project_config(project_root: &Path, config_override: Option<&Path>) -> Result<Config> {
    match find_config_path(project_root, config_override) {
        Some(path) => {
            tracing::debug!(path = %path.display(), "loading config");
            load_config(&path)
        }
        None => {
            if let Some(path) = config_override {
                bail!("Config file not found: {}", path.display());
            }
            Ok(Config::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
[history]
max_depth = 50

[rename]
reserved = ["var", "record"]
"#;
        let config = parse_config(toml).unwrap();
        assert_eq!(config.history.max_depth, Some(50));
        assert_eq!(config.rename.reserved, vec!["var", "record"]);
    }

    #[test]
    fn test_parse_empty_config() {
        let config = parse_config("").unwrap();
        assert_eq!(config, Config::default());
        assert!(config.history.max_depth.is_none());
    }

    #[test]
    fn test_parse_invalid_config() {
        assert!(parse_config("[history]\nmax_depth = \"lots\"").is_err());
    }

    #[test]
    fn test_find_config_path_order() {
        let dir = TempDir::new().unwrap();
        assert!(find_config_path(dir.path(), None).is_none());

        std::fs::write(dir.path().join("unscramble.toml"), "").unwrap();
        assert_eq!(
            find_config_path(dir.path(), None),
            Some(dir.path().join("unscramble.toml"))
        );

        std::fs::create_dir(dir.path().join(".unscramble")).unwrap();
        std::fs::write(dir.path().join(".unscramble/config.toml"), "").unwrap();
        assert_eq!(
            find_config_path(dir.path(), None),
            Some(dir.path().join(".unscramble/config.toml"))
        );
    }

    #[test]
    fn test_missing_override_is_an_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(load_project_config(dir.path(), Some(&missing)).is_err());
        assert_eq!(load_project_config(dir.path(), None).unwrap(), Config::default());
    }

    #[test]
    fn test_config_builds_capped_history() {
        let config = parse_config("[history]\nmax_depth = 1").unwrap();
        let mut history = config.navigation_history();
        let reference = crate::model::EntryReference::declaration(crate::model::Entry::Class(
            crate::model::ClassEntry::new("a"),
        ));
        history.push(reference.clone());
        history.push(reference);
        assert_eq!(history.len(), 1);
    }
}
