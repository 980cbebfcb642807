//! Configuration types.

use crate::format::OutputFormat;
use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub analysis: AnalysisConfig,
}

/// Server-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Default output format for the `dependencies` tool.
    #[serde(default)]
    pub default_format: OutputFormat,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            default_format: OutputFormat::default(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("task-deps/tasks.db")
}

/// Tuning for dependency resolution and suggestions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Maximum traversal depth when building the dependency graph.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Maximum suggestions returned per task.
    #[serde(default = "default_max_suggestions")]
    pub max_suggestions: usize,

    /// Character window for keyword-to-title proximity.
    #[serde(default = "default_proximity_window")]
    pub proximity_window: usize,

    /// Suggestions above this confidence count as high confidence.
    #[serde(default = "default_high_confidence_threshold")]
    pub high_confidence_threshold: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            max_suggestions: default_max_suggestions(),
            proximity_window: default_proximity_window(),
            high_confidence_threshold: default_high_confidence_threshold(),
        }
    }
}

fn default_max_depth() -> usize {
    crate::deps::resolver::DEFAULT_MAX_DEPTH
}

fn default_max_suggestions() -> usize {
    crate::deps::engine::DEFAULT_MAX_SUGGESTIONS
}

fn default_proximity_window() -> usize {
    crate::deps::analyzer::DEFAULT_PROXIMITY_WINDOW
}

fn default_high_confidence_threshold() -> f64 {
    crate::deps::engine::DEFAULT_HIGH_CONFIDENCE
}

impl AnalysisConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_depth == 0 {
            bail!("analysis.max_depth must be at least 1");
        }
        if self.max_suggestions == 0 {
            bail!("analysis.max_suggestions must be at least 1");
        }
        if self.proximity_window == 0 {
            bail!("analysis.proximity_window must be at least 1");
        }
        if !(0.0..=1.0).contains(&self.high_confidence_threshold) {
            bail!(
                "analysis.high_confidence_threshold must be between 0 and 1, got {}",
                self.high_confidence_threshold
            );
        }
        Ok(())
    }
}

impl Config {
    /// Load a single configuration file without tier merging.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        // Empty or comment-only files parse as null
        let config: Option<Config> = serde_yaml::from_str(&content)?;
        Ok(config.unwrap_or_default())
    }

    pub fn validate(&self) -> Result<()> {
        self.analysis.validate()
    }

    /// Ensure the database directory exists.
    pub fn ensure_db_dir(&self) -> Result<()> {
        if let Some(parent) = self.server.db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}
