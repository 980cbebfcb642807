//! Configuration loader with tier-based merging.

use super::merge::deep_merge_all;
use super::types::Config;
use anyhow::{Context, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Configuration tier priority (lowest to highest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConfigTier {
    Defaults = 0,
    Project = 1,
    User = 2,
    Environment = 3,
}

impl std::fmt::Display for ConfigTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigTier::Defaults => write!(f, "defaults"),
            ConfigTier::Project => write!(f, "project"),
            ConfigTier::User => write!(f, "user"),
            ConfigTier::Environment => write!(f, "environment"),
        }
    }
}

/// Directories searched for `config.yaml`.
#[derive(Debug, Clone)]
pub struct ConfigPaths {
    /// Project-level config directory (`./task-deps`).
    pub project_dir: Option<PathBuf>,
    /// User-level config directory (`~/.task-deps`).
    pub user_dir: Option<PathBuf>,
}

impl Default for ConfigPaths {
    fn default() -> Self {
        Self::discover()
    }
}

impl ConfigPaths {
    /// Discover configuration paths from environment and defaults.
    pub fn discover() -> Self {
        let user_dir = std::env::var("TASK_DEPS_USER_DIR")
            .ok()
            .map(PathBuf::from)
            .or_else(|| dirs::home_dir().map(|h| h.join(".task-deps")));

        let project_dir = std::env::var("TASK_DEPS_PROJECT_DIR")
            .ok()
            .map(PathBuf::from)
            .or_else(|| Some(PathBuf::from("task-deps")));

        Self {
            project_dir,
            user_dir,
        }
    }

    pub fn with_dirs(project_dir: Option<PathBuf>, user_dir: Option<PathBuf>) -> Self {
        Self {
            project_dir,
            user_dir,
        }
    }

    fn tier_files(&self) -> Vec<(ConfigTier, PathBuf)> {
        let mut files = Vec::new();
        if let Some(ref dir) = self.project_dir {
            files.push((ConfigTier::Project, dir.join("config.yaml")));
        }
        if let Some(ref dir) = self.user_dir {
            files.push((ConfigTier::User, dir.join("config.yaml")));
        }
        files
    }
}

/// Loads and merges configuration from every tier.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    pub paths: ConfigPaths,
    config: Config,
    /// Highest-priority file that contributed, if any.
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    /// Load configuration from all tiers with proper merging.
    pub fn load() -> Result<Self> {
        Self::load_with_paths(ConfigPaths::discover())
    }

    /// Load configuration with explicit paths.
    ///
    /// `TASK_DEPS_CONFIG_PATH` short-circuits the tiers and names one file.
    pub fn load_with_paths(paths: ConfigPaths) -> Result<Self> {
        if let Ok(explicit) = std::env::var("TASK_DEPS_CONFIG_PATH") {
            return Self::load_file(paths, PathBuf::from(explicit));
        }

        let mut tiers: Vec<Value> = Vec::new();
        let mut config_path = None;

        if let Ok(defaults) = serde_json::to_value(Config::default()) {
            tiers.push(defaults);
        }

        for (tier, file) in paths.tier_files() {
            if !file.exists() {
                continue;
            }
            match read_yaml(&file) {
                Ok(value) => {
                    debug!(tier = %tier, path = %file.display(), "Loaded config tier");
                    tiers.push(value);
                    config_path = Some(file);
                }
                Err(e) => {
                    warn!(tier = %tier, path = %file.display(), error = %e, "Ignoring unreadable config file");
                }
            }
        }

        let mut config: Config = serde_json::from_value(deep_merge_all(tiers))?;
        apply_env_overrides(&mut config, |key| std::env::var(key).ok());
        config.validate()?;

        Ok(Self {
            paths,
            config,
            config_path,
        })
    }

    /// Load exactly one file, layered only over the defaults and environment.
    pub fn load_file(paths: ConfigPaths, path: PathBuf) -> Result<Self> {
        let mut config = Config::load(&path)
            .with_context(|| format!("Failed to load config file {}", path.display()))?;
        apply_env_overrides(&mut config, |key| std::env::var(key).ok());
        config.validate()?;
        Ok(Self {
            paths,
            config,
            config_path: Some(path),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    pub fn into_config(self) -> Config {
        self.config
    }

    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }
}

fn read_yaml(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)?;
    let value: Option<Value> = serde_yaml::from_str(&content)?;
    Ok(value.unwrap_or(Value::Null))
}

/// Apply `TASK_DEPS_*` overrides. Unparseable numbers are ignored with a warning.
pub fn apply_env_overrides(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(db_path) = lookup("TASK_DEPS_DB_PATH") {
        config.server.db_path = PathBuf::from(db_path);
    }

    for (key, slot) in [
        ("TASK_DEPS_MAX_DEPTH", &mut config.analysis.max_depth),
        ("TASK_DEPS_MAX_SUGGESTIONS", &mut config.analysis.max_suggestions),
    ] {
        if let Some(raw) = lookup(key) {
            match raw.trim().parse::<usize>() {
                Ok(value) => *slot = value,
                Err(_) => warn!(key = key, value = %raw, "Ignoring non-numeric environment override"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn write_config(dir: &Path, content: &str) {
        std::fs::create_dir_all(dir).unwrap();
        std::fs::write(dir.join("config.yaml"), content).unwrap();
    }

    #[test]
    fn test_load_defaults_only() {
        let temp = TempDir::new().unwrap();
        let paths = ConfigPaths::with_dirs(
            Some(temp.path().join("project")),
            Some(temp.path().join("user")),
        );

        let loader = ConfigLoader::load_with_paths(paths).unwrap();
        assert_eq!(loader.config().analysis.max_depth, 10);
        assert!(loader.config_path().is_none());
    }

    #[test]
    fn test_user_config_overrides_project() {
        let temp = TempDir::new().unwrap();
        let project_dir = temp.path().join("task-deps");
        let user_dir = temp.path().join("user");
        write_config(
            &project_dir,
            "analysis:\n  max_depth: 5\n  max_suggestions: 3\n",
        );
        write_config(&user_dir, "analysis:\n  max_depth: 7\n");

        let paths = ConfigPaths::with_dirs(Some(project_dir), Some(user_dir.clone()));
        let loader = ConfigLoader::load_with_paths(paths).unwrap();
        let config = loader.config();

        assert_eq!(config.analysis.max_depth, 7);
        assert_eq!(config.analysis.max_suggestions, 3);
        assert_eq!(config.analysis.proximity_window, 100);
        assert_eq!(loader.config_path(), Some(user_dir.join("config.yaml").as_path()));
    }

    #[test]
    fn test_invalid_merged_config_is_rejected() {
        let temp = TempDir::new().unwrap();
        let project_dir = temp.path().join("task-deps");
        write_config(&project_dir, "analysis:\n  high_confidence_threshold: 2.0\n");

        let paths = ConfigPaths::with_dirs(Some(project_dir), None);
        assert!(ConfigLoader::load_with_paths(paths).is_err());
    }

    #[test]
    fn test_load_file_accepts_empty_file() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("empty.yaml");
        std::fs::write(&file, "# nothing here\n").unwrap();

        let loader = ConfigLoader::load_file(ConfigPaths::with_dirs(None, None), file).unwrap();
        assert_eq!(loader.config().analysis.max_suggestions, 10);
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("TASK_DEPS_DB_PATH", "/tmp/deps.db"),
            ("TASK_DEPS_MAX_DEPTH", "3"),
            ("TASK_DEPS_MAX_SUGGESTIONS", "lots"),
        ]);
        let mut config = Config::default();
        apply_env_overrides(&mut config, |key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.server.db_path, PathBuf::from("/tmp/deps.db"));
        assert_eq!(config.analysis.max_depth, 3);
        assert_eq!(config.analysis.max_suggestions, 10);
    }
}
