use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::services::llm::LlmConfig;

pub const CONFIG_FILE: &str = "config.yml";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_settings_file")]
    pub settings_file: PathBuf,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PipelineConfig {
    #[serde(default = "default_max_parts")]
    pub max_parts: usize,
    #[serde(default = "default_delay_ms")]
    pub part_delay_ms: u64,
    #[serde(default = "default_delay_ms")]
    pub description_delay_ms: u64,
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    #[serde(default = "default_continue_message")]
    pub continue_message: String,
    /// `{TITLE}` is replaced with the story title.
    #[serde(default = "default_description_prompt")]
    pub description_prompt: String,
}

fn default_settings_file() -> PathBuf {
    PathBuf::from("settings.json")
}
fn default_max_parts() -> usize {
    30
}
fn default_delay_ms() -> u64 {
    2000
}
fn default_history_limit() -> usize {
    20
}
fn default_continue_message() -> String {
    "Continue".to_string()
}
fn default_description_prompt() -> String {
    "Create a YouTube description for: {TITLE}. Language: English.".to_string()
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_parts: default_max_parts(),
            part_delay_ms: default_delay_ms(),
            description_delay_ms: default_delay_ms(),
            history_limit: default_history_limit(),
            continue_message: default_continue_message(),
            description_prompt: default_description_prompt(),
        }
    }
}

impl PipelineConfig {
    pub fn part_delay(&self) -> Duration {
        Duration::from_millis(self.part_delay_ms)
    }

    pub fn description_delay(&self) -> Duration {
        Duration::from_millis(self.description_delay_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            settings_file: default_settings_file(),
            llm: LlmConfig::default(),
            pipeline: PipelineConfig::default(),
        }
    }
}

impl Config {
    /// Loads `config.yml` from the working directory, falling back to
    /// defaults when the file does not exist.
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new(CONFIG_FILE))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::info!("{} not found, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Config = serde_yaml_ng::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() -> Result<()> {
        let temp_dir = tempfile::tempdir()?;
        let config = Config::load_from(&temp_dir.path().join("config.yml"))?;

        assert_eq!(config.pipeline.max_parts, 30);
        assert_eq!(config.pipeline.history_limit, 20);
        assert_eq!(config.pipeline.continue_message, "Continue");
        assert_eq!(config.llm.provider, "gemini");
        assert_eq!(config.llm.default_model, "gemini-2.0-flash");
        Ok(())
    }

    #[test]
    fn test_partial_file_fills_defaults() -> Result<()> {
        let temp_dir = tempfile::tempdir()?;
        let path = temp_dir.path().join("config.yml");
        fs::write(
            &path,
            "pipeline:\n  part_delay_ms: 5000\nllm:\n  provider: ollama\n",
        )?;

        let config = Config::load_from(&path)?;
        assert_eq!(config.pipeline.part_delay(), Duration::from_secs(5));
        assert_eq!(config.pipeline.description_delay(), Duration::from_secs(2));
        assert_eq!(config.llm.provider, "ollama");
        assert_eq!(config.settings_file, PathBuf::from("settings.json"));
        Ok(())
    }

    #[test]
    fn test_malformed_file_is_an_error() -> Result<()> {
        let temp_dir = tempfile::tempdir()?;
        let path = temp_dir.path().join("config.yml");
        fs::write(&path, "pipeline: [unterminated")?;

        assert!(Config::load_from(&path).is_err());
        Ok(())
    }
}
