use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::core::error::{ErrorKind, PipelineError};

/// Input for one generation run, as collected by the front-end.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub project_name: String,
    /// Story prompt with `{TITLE}` and `{LANGUAGE}` placeholders.
    pub template_text: String,
    pub title: String,
    pub voice: String,
    pub language: String,
    pub output_folder: PathBuf,
    #[serde(default)]
    pub model_name: Option<String>,
}

impl GenerationRequest {
    /// Names of required fields that are blank.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.project_name.trim().is_empty() {
            missing.push("project name");
        }
        if self.title.trim().is_empty() {
            missing.push("title");
        }
        if self.template_text.trim().is_empty() {
            missing.push("prompt template");
        }
        if self.output_folder.as_os_str().is_empty() {
            missing.push("output folder");
        }
        missing
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineResult {
    pub success: bool,
    pub error: Option<String>,
    pub error_kind: Option<ErrorKind>,
    pub project_path: Option<PathBuf>,
}

impl From<Result<PathBuf, PipelineError>> for PipelineResult {
    fn from(result: Result<PathBuf, PipelineError>) -> Self {
        match result {
            Ok(path) => Self {
                success: true,
                error: None,
                error_kind: None,
                project_path: Some(path),
            },
            Err(e) => Self {
                success: false,
                error: Some(e.to_string()),
                error_kind: Some(e.kind()),
                project_path: None,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

/// Chat state of a single run. Never persisted or shared between runs.
#[derive(Debug, Clone)]
pub struct Conversation {
    pub model: String,
    pub turns: Vec<Turn>,
    pub story: String,
    pub part: usize,
}

impl Conversation {
    pub fn new(model: &str) -> Self {
        Self {
            model: model.to_string(),
            turns: Vec::new(),
            story: String::new(),
            part: 1,
        }
    }

    pub fn push(&mut self, role: Role, text: &str) {
        self.turns.push(Turn {
            role,
            text: text.to_string(),
        });
    }

    /// Appends a cleaned story part followed by a blank line.
    pub fn append_part(&mut self, text: &str) {
        if !text.is_empty() {
            self.story.push_str(text);
            self.story.push_str("\n\n");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields() {
        let request = GenerationRequest {
            project_name: "proj".to_string(),
            title: "  ".to_string(),
            ..Default::default()
        };
        assert_eq!(
            request.missing_fields(),
            vec!["title", "prompt template", "output folder"]
        );
    }

    #[test]
    fn test_append_part_skips_empty() {
        let mut conversation = Conversation::new("gemini-2.0-flash");
        conversation.append_part("One.");
        conversation.append_part("");
        conversation.append_part("Two.");
        assert_eq!(conversation.story, "One.\n\nTwo.\n\n");
    }

    #[test]
    fn test_result_from_error() {
        let failed: Result<PathBuf, PipelineError> = Err(PipelineError::Synthesis("exit 1".into()));
        let result = PipelineResult::from(failed);
        assert!(!result.success);
        assert_eq!(result.error_kind, Some(ErrorKind::Synthesis));
        assert_eq!(result.error.as_deref(), Some("Synthesis error: exit 1"));
        assert!(result.project_path.is_none());
    }
}
