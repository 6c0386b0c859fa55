use anyhow::{anyhow, Result};
use chrono::Local;
use inquire::{Password, PasswordDisplayMode, Select, Text};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::core::config::Config;
use crate::core::history::{HistoryEntry, HistoryStore};
use crate::core::io::{read_json, Storage};
use crate::core::settings::{keys, SettingsStore};
use crate::core::state::GenerationRequest;
use crate::services::reveal::FolderOpener;
use crate::services::tts::{fetch_voice_list, Voice};

pub const DEFAULT_LANGUAGE: &str = "English";
pub const DEFAULT_VOICE: &str = "en-US-AndrewNeural";

/// Prompt templates keyed by name, read from a JSON object file.
pub async fn load_prompts(storage: &dyn Storage, path: &Path) -> Option<BTreeMap<String, String>> {
    read_json(storage, path).await
}

/// Asks for everything a run needs. `None` means the user backed out.
pub async fn collect_request(
    config: &Config,
    settings: &dyn SettingsStore,
    storage: &dyn Storage,
) -> Result<Option<GenerationRequest>> {
    let prompts = match settings.get_string(keys::PROMPT_PATH)? {
        Some(path) => load_prompts(storage, Path::new(&path)).await,
        None => None,
    };
    let prompts = match prompts {
        Some(p) if !p.is_empty() => p,
        _ => match choose_prompt_file(settings, storage).await? {
            Some(p) => p,
            None => return Ok(None),
        },
    };

    let names: Vec<String> = prompts.keys().cloned().collect();
    let template_key = Select::new("Prompt template:", names).prompt()?;
    let template_text = prompts.get(&template_key).cloned().unwrap_or_default();

    let project_name = Text::new("Project name:").prompt()?;
    let title = Text::new("Story title:").prompt()?;

    let last_voice = settings
        .get_string(keys::LAST_VOICE)?
        .unwrap_or_else(|| DEFAULT_VOICE.to_string());
    let voice = choose_voice(&last_voice).await?;
    settings.set_string(keys::LAST_VOICE, &voice)?;

    let last_language = settings
        .get_string(keys::LAST_LANGUAGE)?
        .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());
    let language = Text::new("Language:").with_default(&last_language).prompt()?;
    settings.set_string(keys::LAST_LANGUAGE, &language)?;

    let last_model = settings
        .get_string(keys::LAST_MODEL)?
        .unwrap_or_else(|| config.llm.default_model.clone());
    let model = Text::new("Model:").with_default(&last_model).prompt()?;
    settings.set_string(keys::LAST_MODEL, &model)?;

    let mut output_prompt = Text::new("Output folder:");
    let last_output = settings.get_string(keys::OUTPUT_DIR)?;
    if let Some(dir) = last_output.as_deref() {
        output_prompt = output_prompt.with_default(dir);
    }
    let output_folder = output_prompt.prompt()?;
    if !output_folder.trim().is_empty() {
        settings.set_string(keys::OUTPUT_DIR, &output_folder)?;
    }

    Ok(Some(GenerationRequest {
        project_name,
        template_text,
        title,
        voice,
        language,
        output_folder: PathBuf::from(output_folder.trim()),
        model_name: Some(model),
    }))
}

async fn choose_prompt_file(
    settings: &dyn SettingsStore,
    storage: &dyn Storage,
) -> Result<Option<BTreeMap<String, String>>> {
    let path = Text::new("Prompt file (JSON):").prompt()?;
    match load_prompts(storage, Path::new(path.trim())).await {
        Some(prompts) if !prompts.is_empty() => {
            settings.set_string(keys::PROMPT_PATH, path.trim())?;
            Ok(Some(prompts))
        }
        _ => {
            eprintln!("Could not read prompt templates from {}", path.trim());
            Ok(None)
        }
    }
}

pub fn voice_label(voice: &Voice) -> String {
    format!(
        "{} ({}) - {}",
        voice.short_name,
        voice.gender,
        voice.friendly_name.as_deref().unwrap_or(&voice.name)
    )
}

fn voice_from_label(label: &str) -> Result<String> {
    label
        .split_whitespace()
        .next()
        .map(str::to_string)
        .ok_or_else(|| anyhow!("Empty voice selection"))
}

async fn choose_voice(last_voice: &str) -> Result<String> {
    let voices = match fetch_voice_list().await {
        Ok(v) if !v.is_empty() => v,
        Ok(_) => return Ok(Text::new("Voice:").with_default(last_voice).prompt()?),
        Err(e) => {
            log::warn!("Voice list unavailable: {:#}", e);
            return Ok(Text::new("Voice:").with_default(last_voice).prompt()?);
        }
    };

    let start = voices
        .iter()
        .position(|v| v.short_name == last_voice)
        .unwrap_or(0);
    let options: Vec<String> = voices.iter().map(voice_label).collect();
    let selection = Select::new("Voice:", options)
        .with_starting_cursor(start)
        .prompt()?;
    voice_from_label(&selection)
}

/// Settings page: credential, narration tool, prompt file.
pub async fn configure(settings: &dyn SettingsStore, storage: &dyn Storage) -> Result<()> {
    const API_KEY: &str = "API key";
    const EDGE_TTS: &str = "Edge TTS path";
    const PROMPT_FILE: &str = "Prompt file";
    const BACK: &str = "Back";

    loop {
        let choice = Select::new("Settings:", vec![API_KEY, EDGE_TTS, PROMPT_FILE, BACK]).prompt()?;
        match choice {
            API_KEY => {
                let key = Password::new("API key:")
                    .without_confirmation()
                    .with_display_mode(PasswordDisplayMode::Masked)
                    .prompt()?;
                settings.set_string(keys::API_KEY, key.trim())?;
                println!("Saved!");
            }
            EDGE_TTS => {
                let mut prompt = Text::new("Path to the edge-tts executable:");
                let current = settings.get_string(keys::EDGE_TTS_PATH)?;
                if let Some(path) = current.as_deref() {
                    prompt = prompt.with_default(path);
                }
                let path = prompt.prompt()?;
                settings.set_string(keys::EDGE_TTS_PATH, path.trim())?;
                println!("Saved!");
            }
            PROMPT_FILE => {
                if let Some(prompts) = choose_prompt_file(settings, storage).await? {
                    println!("Loaded {} template(s).", prompts.len());
                }
            }
            _ => return Ok(()),
        }
    }
}

pub fn history_label(entry: &HistoryEntry) -> String {
    format!(
        "{} | {} | {}",
        entry.title,
        entry.project_name,
        entry.timestamp.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S")
    )
}

/// Lists past runs and opens the one the user picks.
pub fn show_history(history: &HistoryStore, opener: &dyn FolderOpener) -> Result<()> {
    let entries = history.load()?;
    if entries.is_empty() {
        println!("History is empty.");
        return Ok(());
    }

    let mut options: Vec<String> = entries.iter().map(history_label).collect();
    options.push("Back".to_string());
    let selection = Select::new("Open a project folder:", options).raw_prompt()?;

    if let Some(entry) = entries.get(selection.index) {
        opener.open(&entry.path)?;
    }
    Ok(())
}
