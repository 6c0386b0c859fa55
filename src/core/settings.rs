use anyhow::{Context, Result};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

/// Setting keys, named as in the settings blob on disk.
pub mod keys {
    pub const API_KEY: &str = "apiKey";
    pub const EDGE_TTS_PATH: &str = "edgeTtsPath";
    pub const LAST_VOICE: &str = "lastVoice";
    pub const LAST_LANGUAGE: &str = "lastLanguage";
    pub const LAST_MODEL: &str = "lastModel";
    pub const OUTPUT_DIR: &str = "outputDir";
    pub const PROMPT_PATH: &str = "promptPath";
    pub const HISTORY: &str = "generationHistory";
}

/// Persisted key/value settings. Reads and writes go straight to the
/// backing store; concurrent writers race and the last one wins.
pub trait SettingsStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Value>>;
    fn set(&self, key: &str, value: Value) -> Result<()>;

    /// Returns a non-empty string setting.
    fn get_string(&self, key: &str) -> Result<Option<String>> {
        Ok(match self.get(key)? {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s),
            _ => None,
        })
    }

    fn set_string(&self, key: &str, value: &str) -> Result<()> {
        self.set(key, Value::String(value.to_string()))
    }
}

/// Settings kept as a single JSON object in a file.
#[derive(Debug, Clone)]
pub struct JsonSettingsStore {
    path: PathBuf,
}

impl JsonSettingsStore {
    pub fn at_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn load(&self) -> Result<Map<String, Value>> {
        if !self.path.exists() {
            return Ok(Map::new());
        }
        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read settings: {}", self.path.display()))?;
        if raw.trim().is_empty() {
            return Ok(Map::new());
        }
        let map: Map<String, Value> = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse settings: {}", self.path.display()))?;
        Ok(map)
    }
}

impl SettingsStore for JsonSettingsStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.load()?.remove(key).filter(|v| !v.is_null()))
    }

    fn set(&self, key: &str, value: Value) -> Result<()> {
        let mut map = self.load()?;
        map.insert(key.to_string(), value);

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create dir: {}", parent.display()))?;
            }
        }

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_string_pretty(&map)?)
            .with_context(|| format!("Failed to write settings temp: {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace settings: {}", self.path.display()))?;
        Ok(())
    }
}

/// Settings that live only as long as the process.
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    values: Mutex<HashMap<String, Value>>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, key: &str, value: impl Into<Value>) -> Self {
        if let Ok(mut values) = self.values.lock() {
            values.insert(key.to_string(), value.into());
        }
        self
    }
}

impl SettingsStore for MemorySettingsStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        let values = self
            .values
            .lock()
            .map_err(|_| anyhow::anyhow!("settings lock poisoned"))?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<()> {
        let mut values = self
            .values
            .lock()
            .map_err(|_| anyhow::anyhow!("settings lock poisoned"))?;
        values.insert(key.to_string(), value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_values_survive_reopen() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("nested").join("settings.json");

        let store = JsonSettingsStore::at_path(&path);
        store.set_string(keys::API_KEY, "secret")?;
        store.set(keys::HISTORY, json!([{"title": "a"}]))?;

        let reopened = JsonSettingsStore::at_path(&path);
        assert_eq!(reopened.get_string(keys::API_KEY)?.as_deref(), Some("secret"));
        assert_eq!(reopened.get(keys::HISTORY)?, Some(json!([{"title": "a"}])));
        assert_eq!(reopened.get(keys::EDGE_TTS_PATH)?, None);
        Ok(())
    }

    #[test]
    fn test_set_keeps_other_keys() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let store = JsonSettingsStore::at_path(dir.path().join("settings.json"));

        store.set_string(keys::LAST_VOICE, "en-US-GuyNeural")?;
        store.set_string(keys::LAST_LANGUAGE, "English")?;
        store.set_string(keys::LAST_VOICE, "en-GB-RyanNeural")?;

        assert_eq!(store.get_string(keys::LAST_VOICE)?.as_deref(), Some("en-GB-RyanNeural"));
        assert_eq!(store.get_string(keys::LAST_LANGUAGE)?.as_deref(), Some("English"));
        Ok(())
    }

    #[test]
    fn test_blank_strings_count_as_missing() -> Result<()> {
        let store = MemorySettingsStore::new()
            .with(keys::API_KEY, "   ")
            .with(keys::EDGE_TTS_PATH, 42);

        assert_eq!(store.get_string(keys::API_KEY)?, None);
        assert_eq!(store.get_string(keys::EDGE_TTS_PATH)?, None);
        Ok(())
    }
}
