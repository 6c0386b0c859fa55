use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::path::Path;

/// Filesystem operations used by the pipeline.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn create_dir_all(&self, path: &Path) -> Result<()>;
    async fn read(&self, path: &Path) -> Result<Vec<u8>>;
    async fn write(&self, path: &Path, content: &[u8]) -> Result<()>;
    async fn delete(&self, path: &Path) -> Result<()>;
}

pub struct NativeStorage;

impl NativeStorage {
    pub fn new() -> Self {
        Self
    }
}

impl Default for NativeStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Storage for NativeStorage {
    async fn create_dir_all(&self, path: &Path) -> Result<()> {
        tokio::fs::create_dir_all(path)
            .await
            .with_context(|| format!("Failed to create directory {}", path.display()))
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))
    }

    async fn write(&self, path: &Path, content: &[u8]) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                self.create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))
    }

    async fn delete(&self, path: &Path) -> Result<()> {
        if tokio::fs::try_exists(path).await? {
            if path.is_dir() {
                tokio::fs::remove_dir_all(path).await?;
            } else {
                tokio::fs::remove_file(path).await?;
            }
        }
        Ok(())
    }
}

/// Reads and decodes a JSON file. Missing or malformed input yields `None`.
pub async fn read_json<T: DeserializeOwned>(storage: &dyn Storage, path: &Path) -> Option<T> {
    let bytes = match storage.read(path).await {
        Ok(bytes) => bytes,
        Err(e) => {
            log::debug!("read_json: {:#}", e);
            return None;
        }
    };
    match serde_json::from_slice(&bytes) {
        Ok(value) => Some(value),
        Err(e) => {
            log::warn!("Ignoring malformed JSON in {}: {}", path.display(), e);
            None
        }
    }
}
