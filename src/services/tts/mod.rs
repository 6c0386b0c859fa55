use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;

pub mod edge;

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "PascalCase")]
pub struct Voice {
    pub name: String,
    pub short_name: String,
    pub gender: String,
    pub friendly_name: Option<String>,
}

/// Turns a text file into an audio file.
#[async_trait]
pub trait Narrator: Send + Sync {
    async fn synthesize(&self, text_file: &Path, media_file: &Path, voice: &str) -> Result<()>;
}

/// Narrator for the edge-tts executable configured in the settings.
pub fn create_narrator(executable: &str) -> Box<dyn Narrator> {
    Box::new(edge::EdgeTtsCommand::new(executable))
}

pub async fn fetch_voice_list() -> Result<Vec<Voice>> {
    edge::list_voices().await
}
