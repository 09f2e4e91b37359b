//! Project configuration, loaded from `salvo.toml` in the current
//! directory. Every field has a sensible default, so an absent file is
//! equivalent to an empty one.

use serde::Deserialize;
use std::path::{Path, PathBuf};

const DEFAULT_CONFIG_NAME: &str = "salvo.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    pub default_adapter: Option<String>,
    pub default_model: Option<String>,
    pub scenarios_dir: PathBuf,
    pub storage_dir: PathBuf,
    pub judge: JudgeConfig,
    pub recording: RecordingConfig,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            default_adapter: None,
            default_model: None,
            scenarios_dir: PathBuf::from("scenarios"),
            storage_dir: PathBuf::from(".salvo"),
            judge: JudgeConfig::default(),
            recording: RecordingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct JudgeConfig {
    pub adapter: Option<String>,
    pub model: Option<String>,
    pub k: u32,
    pub temperature: f64,
    pub default_threshold: f64,
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self { adapter: None, model: None, k: 3, temperature: 0.0, default_threshold: 0.8 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RecordingConfig {
    pub custom_patterns: Vec<String>,
    pub mode: RecordingMode,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self { custom_patterns: Vec::new(), mode: RecordingMode::Full }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordingMode {
    #[default]
    Full,
    MetadataOnly,
}

impl From<RecordingMode> for salvo_types::RecordMode {
    fn from(mode: RecordingMode) -> Self {
        match mode {
            RecordingMode::Full => salvo_types::RecordMode::Full,
            RecordingMode::MetadataOnly => salvo_types::RecordMode::MetadataOnly,
        }
    }
}

impl ProjectConfig {
    /// Load `salvo.toml` from the current directory, or fall back to
    /// defaults if it doesn't exist.
    pub fn load_or_default() -> Result<Self, crate::error::CliError> {
        let path = PathBuf::from(DEFAULT_CONFIG_NAME);
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::from_path(&path)
    }

    pub fn from_path(path: &Path) -> Result<Self, crate::error::CliError> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&text).map_err(|e| crate::error::CliError::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), crate::error::CliError> {
        if self.judge.k % 2 == 0 {
            return Err(crate::error::CliError::Config(format!("judge.k must be odd, got {}", self.judge.k)));
        }
        if self.judge.k == 1 {
            tracing::warn!("judge.k is 1; a single vote has no median to take consensus over");
        }
        Ok(())
    }
}
