//! Grader configuration.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::grading::{GradingPolicy, DEFAULT_PASS_SCORE, DEFAULT_SIMILARITY_THRESHOLD};

/// Top-level autograde configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutogradeConfig {
    /// Minimum similarity for partial short-answer credit.
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,
    /// Pass score used when a worksheet does not set its own.
    #[serde(default = "default_pass_score")]
    pub default_pass_score: u32,
    /// Max concurrent submissions graded in a batch.
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,
    /// Output directory for reports.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_similarity_threshold() -> f64 {
    DEFAULT_SIMILARITY_THRESHOLD
}
fn default_pass_score() -> u32 {
    DEFAULT_PASS_SCORE
}
fn default_parallelism() -> usize {
    4
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("./autograde-results")
}

impl Default for AutogradeConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: default_similarity_threshold(),
            default_pass_score: default_pass_score(),
            parallelism: default_parallelism(),
            output_dir: default_output_dir(),
        }
    }
}

impl AutogradeConfig {
    /// Grading policy described by this configuration.
    pub fn policy(&self) -> GradingPolicy {
        GradingPolicy {
            similarity_threshold: self.similarity_threshold,
            default_pass_score: self.default_pass_score,
        }
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    while let Some(start) = result.find("${") {
        if let Some(end) = result[start..].find('}') {
            let var_name = &result[start + 2..start + end];
            let value = std::env::var(var_name).unwrap_or_default();
            result = format!(
                "{}{}{}",
                &result[..start],
                value,
                &result[start + end + 1..]
            );
        } else {
            break;
        }
    }
    result
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `autograde.toml` in the current directory
/// 2. `~/.config/autograde/config.toml`
///
/// Environment variable override: `AUTOGRADE_PARALLELISM`.
pub fn load_config() -> Result<AutogradeConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<AutogradeConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("autograde.toml");
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|home| home.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            parse_config(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => AutogradeConfig::default(),
    };

    if let Ok(value) = std::env::var("AUTOGRADE_PARALLELISM") {
        config.parallelism = value
            .parse()
            .with_context(|| format!("invalid AUTOGRADE_PARALLELISM: {value}"))?;
    }

    config.output_dir = PathBuf::from(resolve_env_vars(&config.output_dir.to_string_lossy()));

    Ok(config)
}

/// Parse and sanity-check a TOML configuration document.
pub fn parse_config(content: &str) -> Result<AutogradeConfig> {
    let config: AutogradeConfig = toml::from_str(content)?;
    if !(0.0..=1.0).contains(&config.similarity_threshold) {
        anyhow::bail!(
            "similarity_threshold must be between 0 and 1, got {}",
            config.similarity_threshold
        );
    }
    if config.parallelism == 0 {
        anyhow::bail!("parallelism must be at least 1");
    }
    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("autograde"))
}
