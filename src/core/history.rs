use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

use crate::core::settings::{keys, SettingsStore};

pub const DEFAULT_HISTORY_LIMIT: usize = 20;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub title: String,
    pub project_name: String,
    pub path: PathBuf,
    pub timestamp: DateTime<Utc>,
}

/// Most-recent-first list of completed runs, kept under the
/// `generationHistory` setting.
#[derive(Clone)]
pub struct HistoryStore {
    settings: Arc<dyn SettingsStore>,
    max_entries: usize,
}

impl HistoryStore {
    pub fn new(settings: Arc<dyn SettingsStore>) -> Self {
        Self {
            settings,
            max_entries: DEFAULT_HISTORY_LIMIT,
        }
    }

    pub fn with_max_entries(mut self, max: usize) -> Self {
        self.max_entries = max.max(1);
        self
    }

    /// An unreadable history is reported as empty.
    pub fn load(&self) -> Result<Vec<HistoryEntry>> {
        let Some(value) = self.settings.get(keys::HISTORY)? else {
            return Ok(Vec::new());
        };
        match serde_json::from_value(value) {
            Ok(entries) => Ok(entries),
            Err(e) => {
                log::warn!("Discarding unreadable history: {}", e);
                Ok(Vec::new())
            }
        }
    }

    pub fn record(&self, entry: HistoryEntry) -> Result<()> {
        let mut entries = self.load()?;
        entries.insert(0, entry);
        entries.truncate(self.max_entries);
        self.settings
            .set(keys::HISTORY, serde_json::to_value(&entries)?)
    }
}
