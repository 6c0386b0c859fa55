use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::core::config::{Config, PipelineConfig};
use crate::core::error::PipelineError;
use crate::core::history::{HistoryEntry, HistoryStore};
use crate::core::io::Storage;
use crate::core::progress::{LogProgress, ProgressEvent, ProgressSink};
use crate::core::settings::{keys, SettingsStore};
use crate::core::state::{Conversation, GenerationRequest, PipelineResult, Role};
use crate::services::llm::{LlmClient, LlmConnector};
use crate::services::reveal::{FolderOpener, NoopOpener};
use crate::services::script::{clean_part, narration_text, render_template, take_end_sentinel};
use crate::services::tts::{create_narrator, Narrator};

pub const STORY_FILE: &str = "story.txt";
pub const DESCRIPTION_FILE: &str = "description.txt";
pub const AUDIO_FILE: &str = "audio.mp3";
pub const NARRATION_TEMP_FILE: &str = "temp_tts.txt";

pub type NarratorFactory = Box<dyn Fn(&str) -> Box<dyn Narrator> + Send + Sync>;

/// `{project}_{YYYY-MM-DDTHH-MM-SS}`
pub fn project_folder_name(project_name: &str, started: DateTime<Utc>) -> String {
    format!("{}_{}", project_name, started.format("%Y-%m-%dT%H-%M-%S"))
}

/// Story generation pipeline: chat loop, description, narration, history.
pub struct StoryWorkflow {
    config: PipelineConfig,
    default_model: String,
    connector: Box<dyn LlmConnector>,
    narrator_factory: NarratorFactory,
    settings: Arc<dyn SettingsStore>,
    storage: Arc<dyn Storage>,
    opener: Box<dyn FolderOpener>,
    progress: Arc<dyn ProgressSink>,
}

impl StoryWorkflow {
    pub fn new(
        config: &Config,
        connector: Box<dyn LlmConnector>,
        settings: Arc<dyn SettingsStore>,
        storage: Arc<dyn Storage>,
    ) -> Self {
        Self {
            config: config.pipeline.clone(),
            default_model: config.llm.default_model.clone(),
            connector,
            narrator_factory: Box::new(create_narrator),
            settings,
            storage,
            opener: Box::new(NoopOpener),
            progress: Arc::new(LogProgress),
        }
    }

    pub fn with_narrator_factory(mut self, factory: NarratorFactory) -> Self {
        self.narrator_factory = factory;
        self
    }

    pub fn with_opener(mut self, opener: Box<dyn FolderOpener>) -> Self {
        self.opener = opener;
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    fn emit(&self, event: ProgressEvent) {
        self.progress.emit(event);
    }

    /// Runs one request and reports the outcome instead of failing.
    pub async fn run(&self, request: &GenerationRequest) -> PipelineResult {
        let result = self.execute(request).await;
        if let Err(e) = &result {
            self.emit(ProgressEvent::error(format!("Critical error: {}", e)));
        }
        result.into()
    }

    /// Runs one request. Returns the project folder on success.
    pub async fn execute(&self, request: &GenerationRequest) -> Result<PathBuf, PipelineError> {
        let (api_key, edge_tts_path) = self.check_preconditions(request)?;

        let llm = self
            .connector
            .connect(&api_key)
            .map_err(|e| PipelineError::Configuration(format!("{:#}", e)))?;
        let narrator = (self.narrator_factory)(&edge_tts_path);

        let model = request
            .model_name
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(self.default_model.as_str());

        self.emit(ProgressEvent::info(format!("Starting project: {}", request.project_name)));
        self.emit(ProgressEvent::info(format!("Model: {}", model)));

        let project_dir = request
            .output_folder
            .join(project_folder_name(&request.project_name, Utc::now()));
        self.storage
            .create_dir_all(&project_dir)
            .await
            .map_err(PipelineError::filesystem)?;
        log::debug!("Project folder: {}", project_dir.display());

        let mut conversation = Conversation::new(model);

        self.emit(ProgressEvent::info("Generating story..."));
        self.generate_story(llm.as_ref(), &mut conversation, request).await?;
        self.write_text(&project_dir.join(STORY_FILE), &conversation.story).await?;
        self.emit(ProgressEvent::success("Story saved."));

        self.emit(ProgressEvent::info("Generating description..."));
        self.pause(self.config.description_delay()).await;
        let description_prompt = self.config.description_prompt.replace("{TITLE}", &request.title);
        let description = self.send(llm.as_ref(), &mut conversation, &description_prompt).await?;
        self.write_text(&project_dir.join(DESCRIPTION_FILE), &description).await?;
        self.emit(ProgressEvent::success("Description saved."));

        self.emit(ProgressEvent::info(format!("Creating audio ({})...", request.voice)));
        self.narrate(narrator.as_ref(), &project_dir, &conversation.story, &request.voice)
            .await?;

        HistoryStore::new(self.settings.clone())
            .with_max_entries(self.config.history_limit)
            .record(HistoryEntry {
                title: request.title.clone(),
                project_name: request.project_name.clone(),
                path: project_dir.clone(),
                timestamp: Utc::now(),
            })
            .map_err(PipelineError::filesystem)?;

        self.emit(ProgressEvent::success("Done! Opening folder."));
        if let Err(e) = self.opener.open(&project_dir) {
            self.emit(ProgressEvent::warning(format!("Could not open folder: {:#}", e)));
        }

        Ok(project_dir)
    }

    fn check_preconditions(
        &self,
        request: &GenerationRequest,
    ) -> Result<(String, String), PipelineError> {
        let missing = request.missing_fields();
        if !missing.is_empty() {
            return Err(PipelineError::Configuration(format!(
                "Missing required field(s): {}",
                missing.join(", ")
            )));
        }

        let setting = |key: &str| {
            self.settings
                .get_string(key)
                .map_err(|e| PipelineError::Configuration(format!("{:#}", e)))
        };

        let api_key = setting(keys::API_KEY)?.ok_or_else(|| {
            PipelineError::Configuration("API key is missing from the settings.".to_string())
        })?;
        let edge_tts_path = setting(keys::EDGE_TTS_PATH)?.ok_or_else(|| {
            PipelineError::Configuration("Edge TTS path is missing from the settings.".to_string())
        })?;

        Ok((api_key, edge_tts_path))
    }

    async fn generate_story(
        &self,
        llm: &dyn LlmClient,
        conversation: &mut Conversation,
        request: &GenerationRequest,
    ) -> Result<(), PipelineError> {
        let max_parts = self.config.max_parts.max(1);
        let mut message =
            render_template(&request.template_text, &request.title, &request.language);

        loop {
            self.emit(ProgressEvent::info(format!("Generating part {}...", conversation.part)));
            let reply = self.send(llm, conversation, &message).await?;

            let (text, is_end) = take_end_sentinel(&reply);
            conversation.append_part(&clean_part(&text));

            if is_end || conversation.part >= max_parts {
                log::debug!(
                    "Story finished after {} part(s), sentinel: {}",
                    conversation.part,
                    is_end
                );
                break;
            }

            self.pause(self.config.part_delay()).await;
            message = self.config.continue_message.clone();
            conversation.part += 1;
        }

        Ok(())
    }

    async fn send(
        &self,
        llm: &dyn LlmClient,
        conversation: &mut Conversation,
        text: &str,
    ) -> Result<String, PipelineError> {
        conversation.push(Role::User, text);
        match llm.chat(&conversation.model, &conversation.turns).await {
            Ok(reply) => {
                conversation.push(Role::Model, &reply);
                Ok(reply)
            }
            Err(e) => {
                conversation.turns.pop();
                Err(PipelineError::provider(e))
            }
        }
    }

    async fn narrate(
        &self,
        narrator: &dyn Narrator,
        project_dir: &Path,
        story: &str,
        voice: &str,
    ) -> Result<(), PipelineError> {
        let audio_path = project_dir.join(AUDIO_FILE);
        let temp_path = project_dir.join(NARRATION_TEMP_FILE);

        self.write_text(&temp_path, &narration_text(story)).await?;
        let result = narrator
            .synthesize(&temp_path, &audio_path, voice)
            .await
            .map_err(PipelineError::synthesis);

        if let Err(e) = self.storage.delete(&temp_path).await {
            log::warn!("Failed to remove {}: {:#}", temp_path.display(), e);
        }

        result
    }

    async fn write_text(&self, path: &Path, content: &str) -> Result<(), PipelineError> {
        self.storage
            .write(path, content.as_bytes())
            .await
            .map_err(PipelineError::filesystem)
    }

    async fn pause(&self, delay: Duration) {
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}
