use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

use crate::core::state::{Role, Turn};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LlmConfig {
    #[serde(default = "default_provider")]
    pub provider: String, // "gemini", "ollama" or "openai"
    #[serde(default = "default_model")]
    pub default_model: String,
    #[serde(default)]
    pub openai: Option<OpenAIConfig>,
    #[serde(default)]
    pub ollama: Option<OllamaConfig>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OpenAIConfig {
    pub base_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OllamaConfig {
    pub base_url: String,
}

fn default_provider() -> String {
    "gemini".to_string()
}
fn default_model() -> String {
    "gemini-2.0-flash".to_string()
}

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const OLLAMA_BASE_URL: &str = "http://127.0.0.1:11434";

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            default_model: default_model(),
            openai: None,
            ollama: None,
        }
    }
}

/// A chat backend. The caller owns the turn list; every call sends the
/// whole conversation so far and returns the model's reply.
#[async_trait]
pub trait LlmClient: Send + Sync + Debug {
    async fn chat(&self, model: &str, turns: &[Turn]) -> Result<String>;
}

/// Builds a client once the credential is known.
pub trait LlmConnector: Send + Sync {
    fn connect(&self, api_key: &str) -> Result<Box<dyn LlmClient>>;
}

pub struct ProviderConnector {
    config: LlmConfig,
}

impl ProviderConnector {
    pub fn new(config: &LlmConfig) -> Self {
        Self { config: config.clone() }
    }
}

impl LlmConnector for ProviderConnector {
    fn connect(&self, api_key: &str) -> Result<Box<dyn LlmClient>> {
        create_llm(&self.config, api_key)
    }
}

pub fn create_llm(config: &LlmConfig, api_key: &str) -> Result<Box<dyn LlmClient>> {
    match config.provider.as_str() {
        "gemini" => Ok(Box::new(GeminiClient::new(api_key))),
        "ollama" => {
            let base_url = config
                .ollama
                .as_ref()
                .map(|c| c.base_url.as_str())
                .unwrap_or(OLLAMA_BASE_URL);
            Ok(Box::new(OllamaClient::new(base_url)))
        }
        "openai" => {
            let base_url = config.openai.as_ref().and_then(|c| c.base_url.as_deref());
            Ok(Box::new(OpenAIClient::new(api_key, base_url)))
        }
        _ => Err(anyhow!("Unknown LLM provider: {}", config.provider)),
    }
}

// --- Gemini ---
#[derive(Debug)]
struct GeminiClient {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl GeminiClient {
    fn new(api_key: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            base_url: GEMINI_BASE_URL.to_string(),
            client: reqwest::Client::new(),
        }
    }

    #[cfg(test)]
    fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }
}

#[derive(Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
}

#[derive(Serialize)]
struct GeminiContent {
    role: String,
    parts: Vec<GeminiPart>,
}

#[derive(Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
    error: Option<GeminiError>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContentResponse>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct GeminiContentResponse {
    #[serde(default)]
    parts: Vec<GeminiPartResponse>,
}

#[derive(Deserialize)]
struct GeminiPartResponse {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize, Debug)]
struct GeminiError {
    message: String,
}

fn gemini_contents(turns: &[Turn]) -> Vec<GeminiContent> {
    turns
        .iter()
        .map(|t| GeminiContent {
            role: match t.role {
                Role::User => "user".to_string(),
                Role::Model => "model".to_string(),
            },
            parts: vec![GeminiPart { text: t.text.clone() }],
        })
        .collect()
}

fn parse_gemini_response(response_text: &str) -> Result<String> {
    let result: GeminiResponse = serde_json::from_str(response_text).map_err(|e| {
        anyhow!("Failed to parse Gemini response: {}. Body: {}", e, response_text)
    })?;

    if let Some(err) = result.error {
        return Err(anyhow!("Gemini API returned error: {}", err.message));
    }

    if let Some(first) = result.candidates.as_ref().and_then(|c| c.first()) {
        if let Some(content) = &first.content {
            if !content.parts.is_empty() {
                return Ok(content.parts.iter().map(|p| p.text.as_str()).collect());
            }
        }

        let reason = first.finish_reason.as_deref().unwrap_or("UNKNOWN");
        return Err(anyhow!("Gemini response empty. Finish reason: {}", reason));
    }

    Err(anyhow!("Gemini response format unexpected or empty. Body: {}", response_text))
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn chat(&self, model: &str, turns: &[Turn]) -> Result<String> {
        // The key goes in a header: request errors print the URL.
        let url = format!("{}/models/{}:generateContent", self.base_url, model);

        let request_body = GeminiRequest {
            contents: gemini_contents(turns),
        };

        let resp = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request_body)
            .send()
            .await
            .context("Gemini request failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let error_text = resp.text().await?;
            return Err(anyhow!("Gemini API error ({}): {}", status, error_text));
        }

        let response_text = resp.text().await?;
        parse_gemini_response(&response_text)
    }
}

// --- Ollama ---
#[derive(Debug)]
struct OllamaClient {
    base_url: String,
    client: reqwest::Client,
}

impl OllamaClient {
    fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }
}

#[derive(Serialize)]
struct OllamaRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
}

/// Message shape shared by the Ollama and OpenAI chat endpoints.
#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

fn chat_messages(turns: &[Turn]) -> Vec<ChatMessage> {
    turns
        .iter()
        .map(|t| ChatMessage {
            role: match t.role {
                Role::User => "user".to_string(),
                Role::Model => "assistant".to_string(),
            },
            content: t.text.clone(),
        })
        .collect()
}

#[derive(Deserialize)]
struct OllamaResponse {
    message: OllamaMessageResponse,
}

#[derive(Deserialize)]
struct OllamaMessageResponse {
    content: String,
}

#[async_trait]
impl LlmClient for OllamaClient {
    async fn chat(&self, model: &str, turns: &[Turn]) -> Result<String> {
        let url = format!("{}/api/chat", self.base_url);

        let request_body = OllamaRequest {
            model: model.to_string(),
            messages: chat_messages(turns),
            stream: false,
        };

        let resp = self
            .client
            .post(&url)
            .json(&request_body)
            .send()
            .await
            .context("Ollama request failed")?;

        if !resp.status().is_success() {
            let error_text = resp.text().await?;
            return Err(anyhow!("Ollama API error: {}", error_text));
        }

        let result: OllamaResponse = resp.json().await?;
        Ok(result.message.content)
    }
}

// --- OpenAI ---

#[derive(Debug)]
struct OpenAIClient {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl OpenAIClient {
    fn new(api_key: &str, base_url: Option<&str>) -> Self {
        Self {
            api_key: api_key.to_string(),
            base_url: base_url
                .unwrap_or("https://api.openai.com/v1")
                .trim_end_matches('/')
                .to_string(),
            client: reqwest::Client::new(),
        }
    }
}

#[derive(Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<ChatMessage>,
}

#[derive(Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessageResponse,
}

#[derive(Deserialize)]
struct OpenAIMessageResponse {
    content: Option<String>,
}

#[async_trait]
impl LlmClient for OpenAIClient {
    async fn chat(&self, model: &str, turns: &[Turn]) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);

        let request_body = OpenAIRequest {
            model: model.to_string(),
            messages: chat_messages(turns),
        };

        let resp = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request_body)
            .send()
            .await
            .context("OpenAI request failed")?;

        if !resp.status().is_success() {
            let error_text = resp.text().await?;
            return Err(anyhow!("OpenAI API error: {}", error_text));
        }

        let result: OpenAIResponse = resp.json().await?;
        if let Some(choice) = result.choices.first() {
            if let Some(content) = &choice.message.content {
                return Ok(content.clone());
            }
        }

        Err(anyhow!("OpenAI response empty or missing content"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_turns() -> Vec<Turn> {
        vec![
            Turn { role: Role::User, text: "Write a story".to_string() },
            Turn { role: Role::Model, text: "Once upon a time".to_string() },
            Turn { role: Role::User, text: "Continue".to_string() },
        ]
    }

    #[test]
    fn test_gemini_request_uses_model_role() {
        let body = GeminiRequest { contents: gemini_contents(&sample_turns()) };
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["contents"][1]["role"], "model");
        assert_eq!(json["contents"][2]["parts"][0]["text"], "Continue");
    }

    #[test]
    fn test_chat_messages_use_assistant_role() {
        let messages = chat_messages(&sample_turns());
        let json = serde_json::to_value(&messages).unwrap();

        assert_eq!(json[1]["role"], "assistant");
        assert_eq!(json[1]["content"], "Once upon a time");
    }

    #[test]
    fn test_gemini_response_parsing_safety_block() {
        let json = r#"{
            "candidates": [
                {
                    "finishReason": "SAFETY",
                    "index": 0
                }
            ]
        }"#;

        let err = parse_gemini_response(json).unwrap_err();
        assert!(err.to_string().contains("SAFETY"));
    }

    #[test]
    fn test_gemini_response_parsing_empty_content() {
        let json = r#"{
            "candidates": [
                {
                    "content": { "role": "model" },
                    "finishReason": "STOP",
                    "index": 0
                }
            ]
        }"#;

        let err = parse_gemini_response(json).unwrap_err();
        assert!(err.to_string().contains("Finish reason: STOP"));
    }

    #[test]
    fn test_gemini_response_joins_parts() {
        let json = r#"{
            "candidates": [
                {
                    "content": {
                        "parts": [
                            { "text": "Hello " },
                            { "text": "world" }
                        ],
                        "role": "model"
                    },
                    "finishReason": "STOP",
                    "index": 0
                }
            ]
        }"#;

        assert_eq!(parse_gemini_response(json).unwrap(), "Hello world");
    }

    #[test]
    fn test_gemini_error_body() {
        let json = r#"{ "error": { "code": 429, "message": "Resource exhausted" } }"#;
        let err = parse_gemini_response(json).unwrap_err();
        assert_eq!(err.to_string(), "Gemini API returned error: Resource exhausted");
    }

    #[test]
    fn test_openai_response_parsing_success() {
        let json = r#"{
            "id": "chatcmpl-123",
            "object": "chat.completion",
            "choices": [{
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": "Hello there, how may I assist you today?"
                },
                "finish_reason": "stop"
            }]
        }"#;

        let result: OpenAIResponse = serde_json::from_str(json).unwrap();
        assert_eq!(
            result.choices[0].message.content.as_deref(),
            Some("Hello there, how may I assist you today?")
        );
    }

    #[test]
    fn test_unknown_provider() {
        let config = LlmConfig { provider: "bard".to_string(), ..Default::default() };
        assert!(create_llm(&config, "key").is_err());
    }

    #[tokio::test]
    async fn test_gemini_request_error_hides_api_key() {
        let client = GeminiClient::new("SECRETKEY123").with_base_url("http://127.0.0.1:1/v1beta");
        let err = client.chat("gemini-2.0-flash", &sample_turns()).await.unwrap_err();

        let shown = crate::core::error::PipelineError::provider(err).to_string();
        assert!(shown.starts_with("Provider error: Gemini request failed"));
        assert!(!shown.contains("SECRETKEY123"), "key leaked: {}", shown);
    }

    #[test]
    fn test_ollama_section_is_optional() {
        let config = LlmConfig { provider: "ollama".to_string(), ..Default::default() };
        assert!(create_llm(&config, "").is_ok());

        let config = LlmConfig {
            provider: "ollama".to_string(),
            ollama: Some(OllamaConfig { base_url: "http://127.0.0.1:11434/".to_string() }),
            ..Default::default()
        };
        assert!(create_llm(&config, "").is_ok());
    }
}
