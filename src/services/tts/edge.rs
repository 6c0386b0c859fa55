use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use std::path::{Path, PathBuf};
use tokio::process::Command;

use crate::services::tts::{Narrator, Voice};

const TRUSTED_CLIENT_TOKEN: &str = "6A5AA1D4EAFF4E9FB37E23D68491D6F4";
const CHROMIUM_MAJOR_VERSION: &str = "143";
const LIST_VOICES_URL: &str =
    "https://speech.platform.bing.com/consumer/speech/synthesize/readaloud/voices/list";

fn get_user_agent() -> String {
    format!(
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/{}.0.0.0 Safari/537.36 Edg/{}.0.0.0",
        CHROMIUM_MAJOR_VERSION, CHROMIUM_MAJOR_VERSION
    )
}

pub async fn list_voices() -> Result<Vec<Voice>> {
    let url = format!(
        "{}?trustedclienttoken={}",
        LIST_VOICES_URL, TRUSTED_CLIENT_TOKEN
    );
    let client = reqwest::Client::new();
    let mut headers = HeaderMap::new();

    headers.insert(
        "Authority",
        HeaderValue::from_static("speech.platform.bing.com"),
    );
    headers.insert("User-Agent", HeaderValue::from_str(&get_user_agent())?);
    headers.insert("Accept", HeaderValue::from_static("*/*"));
    headers.insert(
        "Accept-Language",
        HeaderValue::from_static("en-US,en;q=0.9"),
    );

    let resp = client.get(&url).headers(headers).send().await?;
    if !resp.status().is_success() {
        return Err(anyhow!("Failed to list voices: {}", resp.status()));
    }
    let mut voices: Vec<Voice> = resp.json().await?;
    voices.sort_by(|a, b| a.short_name.cmp(&b.short_name));
    Ok(voices)
}

/// Runs the edge-tts command line tool:
/// `<exe> --file <text> --write-media <mp3> --voice <voice>`.
pub struct EdgeTtsCommand {
    executable: PathBuf,
}

impl EdgeTtsCommand {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
        }
    }
}

fn diagnostics(stdout: &[u8], stderr: &[u8]) -> String {
    let stderr = String::from_utf8_lossy(stderr).trim().to_string();
    if !stderr.is_empty() {
        return stderr;
    }
    String::from_utf8_lossy(stdout).trim().to_string()
}

#[async_trait]
impl Narrator for EdgeTtsCommand {
    async fn synthesize(&self, text_file: &Path, media_file: &Path, voice: &str) -> Result<()> {
        log::debug!(
            "Running {} --file {} --write-media {} --voice {}",
            self.executable.display(),
            text_file.display(),
            media_file.display(),
            voice
        );

        let output = Command::new(&self.executable)
            .arg("--file")
            .arg(text_file)
            .arg("--write-media")
            .arg(media_file)
            .arg("--voice")
            .arg(voice)
            .output()
            .await
            .with_context(|| format!("Failed to launch {}", self.executable.display()))?;

        if !output.status.success() {
            let detail = diagnostics(&output.stdout, &output.stderr);
            return Err(if detail.is_empty() {
                anyhow!("edge-tts exited with {}", output.status)
            } else {
                anyhow!("edge-tts exited with {}: {}", output.status, detail)
            });
        }

        if !tokio::fs::try_exists(media_file).await.unwrap_or(false) {
            return Err(anyhow!(
                "edge-tts finished but {} was not created",
                media_file.display()
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostics_prefers_stderr() {
        assert_eq!(diagnostics(b"out", b"  bad voice \n"), "bad voice");
        assert_eq!(diagnostics(b" only stdout ", b""), "only stdout");
        assert_eq!(diagnostics(b"", b""), "");
    }

    #[tokio::test]
    async fn test_missing_executable_fails_to_launch() -> Result<()> {
        let temp_dir = tempfile::tempdir()?;
        let narrator = EdgeTtsCommand::new(temp_dir.path().join("no-such-edge-tts"));

        let err = narrator
            .synthesize(
                &temp_dir.path().join("in.txt"),
                &temp_dir.path().join("audio.mp3"),
                "en-US-GuyNeural",
            )
            .await
            .unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to launch"));
        Ok(())
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_non_zero_exit_is_an_error() -> Result<()> {
        let temp_dir = tempfile::tempdir()?;
        let narrator = EdgeTtsCommand::new("false");

        let err = narrator
            .synthesize(
                &temp_dir.path().join("in.txt"),
                &temp_dir.path().join("audio.mp3"),
                "en-US-GuyNeural",
            )
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("edge-tts exited with"));
        Ok(())
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_zero_exit_without_media_is_an_error() -> Result<()> {
        let temp_dir = tempfile::tempdir()?;
        let narrator = EdgeTtsCommand::new("true");

        let err = narrator
            .synthesize(
                &temp_dir.path().join("in.txt"),
                &temp_dir.path().join("audio.mp3"),
                "en-US-GuyNeural",
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("was not created"));
        Ok(())
    }
}
