//! Chat model clients used for query rephrasing and answer generation.
//!
//! Each client turns one rendered prompt into one completion. Conversation
//! state lives in the prompt itself, never in the client.

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::LlmConfig;
use crate::embedding::qualified_model;
use crate::http;

/// Request envelope shared by the providers.
#[derive(Debug, Clone, Copy)]
pub struct CompletionRequest<'a> {
    pub prompt: &'a str,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
}

/// A text-completion chat model.
#[async_trait]
pub trait ChatModel: Send + Sync {
    fn model_name(&self) -> &str;

    async fn complete(&self, request: CompletionRequest<'_>) -> Result<String>;
}

// ============ Gemini ============

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini via `models/<model>:generateContent`. Requires `GOOGLE_API_KEY`.
pub struct GeminiChat {
    model: String,
    base_url: String,
    api_key: String,
    max_retries: u32,
    client: reqwest::Client,
}

impl GeminiChat {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let model = config
            .model_or_default()
            .ok_or_else(|| anyhow::anyhow!("llm.model required for Google provider"))?;
        Ok(Self {
            model: qualified_model(&model),
            base_url: config
                .url
                .clone()
                .unwrap_or_else(|| GEMINI_BASE_URL.to_string()),
            api_key: http::require_env("GOOGLE_API_KEY")?,
            max_retries: config.max_retries,
            client: http::client(config.timeout_secs)?,
        })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest<'a> {
    contents: Vec<GeminiContent<'a>>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Serialize)]
struct GeminiContent<'a> {
    role: &'a str,
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[async_trait]
impl ChatModel for GeminiChat {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: CompletionRequest<'_>) -> Result<String> {
        let url = format!("{}/{}:generateContent", self.base_url, self.model);
        let body = GeminiRequest {
            contents: vec![GeminiContent {
                role: "user",
                parts: vec![GeminiPart {
                    text: request.prompt,
                }],
            }],
            generation_config: GeminiGenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_tokens,
            },
        };
        let json = http::send_json("Gemini", self.max_retries, || {
            self.client
                .post(&url)
                .header("x-goog-api-key", &self.api_key)
                .json(&body)
        })
        .await?;
        parse_gemini_response(&json)
    }
}

/// Concatenate the text parts of the first candidate.
fn parse_gemini_response(json: &serde_json::Value) -> Result<String> {
    let candidate = json
        .get("candidates")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .ok_or_else(|| {
            let reason = json
                .pointer("/promptFeedback/blockReason")
                .and_then(|r| r.as_str())
                .unwrap_or("no candidates");
            anyhow::anyhow!("Invalid Gemini response: {}", reason)
        })?;

    let parts = candidate
        .pointer("/content/parts")
        .and_then(|p| p.as_array())
        .ok_or_else(|| anyhow::anyhow!("Invalid Gemini response: missing content parts"))?;

    Ok(parts
        .iter()
        .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
        .collect::<Vec<_>>()
        .join(""))
}

// ============ OpenAI ============

/// OpenAI chat completions. Requires `OPENAI_API_KEY`.
pub struct OpenAIChat {
    model: String,
    url: String,
    api_key: String,
    max_retries: u32,
    client: reqwest::Client,
}

impl OpenAIChat {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let model = config
            .model_or_default()
            .ok_or_else(|| anyhow::anyhow!("llm.model required for OpenAI provider"))?;
        let base = config
            .url
            .clone()
            .unwrap_or_else(|| "https://api.openai.com".to_string());
        Ok(Self {
            model,
            url: format!("{}/v1/chat/completions", base.trim_end_matches('/')),
            api_key: http::require_env("OPENAI_API_KEY")?,
            max_retries: config.max_retries,
            client: http::client(config.timeout_secs)?,
        })
    }
}

#[derive(Serialize)]
struct OpenAIRequest<'a> {
    model: &'a str,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    messages: Vec<OpenAIMessage<'a>>,
}

#[derive(Serialize)]
struct OpenAIMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIAssistantMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAIAssistantMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl ChatModel for OpenAIChat {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: CompletionRequest<'_>) -> Result<String> {
        let body = OpenAIRequest {
            model: &self.model,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            messages: vec![OpenAIMessage {
                role: "user",
                content: request.prompt,
            }],
        };
        let json = http::send_json("OpenAI", self.max_retries, || {
            self.client
                .post(&self.url)
                .header("Authorization", format!("Bearer {}", self.api_key.trim()))
                .json(&body)
        })
        .await?;
        parse_openai_response(json)
    }
}

fn parse_openai_response(json: serde_json::Value) -> Result<String> {
    let parsed: OpenAIResponse = serde_json::from_value(json)
        .map_err(|e| anyhow::anyhow!("Invalid OpenAI response: {}", e))?;
    match parsed.choices.into_iter().next() {
        Some(choice) => Ok(choice.message.content.unwrap_or_default()),
        None => bail!("Invalid OpenAI response: no choices"),
    }
}

// ============ Ollama ============

/// A local Ollama instance via `POST /api/generate` (non-streaming).
pub struct OllamaChat {
    model: String,
    url: String,
    max_retries: u32,
    client: reqwest::Client,
}

impl OllamaChat {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let model = config
            .model_or_default()
            .ok_or_else(|| anyhow::anyhow!("llm.model required for Ollama provider"))?;
        Ok(Self {
            model,
            url: config
                .url
                .clone()
                .unwrap_or_else(|| "http://localhost:11434".to_string()),
            max_retries: config.max_retries,
            client: http::client(config.timeout_secs)?,
        })
    }
}

#[async_trait]
impl ChatModel for OllamaChat {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: CompletionRequest<'_>) -> Result<String> {
        let endpoint = format!("{}/api/generate", self.url);
        let mut options = serde_json::json!({ "temperature": request.temperature });
        if let Some(n) = request.max_tokens {
            options["num_predict"] = serde_json::json!(n);
        }
        let body = serde_json::json!({
            "model": self.model,
            "prompt": request.prompt,
            "stream": false,
            "options": options,
        });
        let json = http::send_json("Ollama", self.max_retries, || {
            self.client.post(&endpoint).json(&body)
        })
        .await?;
        json.get("response")
            .and_then(|r| r.as_str())
            .map(str::to_string)
            .ok_or_else(|| anyhow::anyhow!("Invalid Ollama response: missing response"))
    }
}

/// Create the [`ChatModel`] selected by `llm.provider`.
pub fn create_chat_model(config: &LlmConfig) -> Result<Arc<dyn ChatModel>> {
    match config.provider.as_str() {
        "google" => Ok(Arc::new(GeminiChat::new(config)?)),
        "openai" => Ok(Arc::new(OpenAIChat::new(config)?)),
        "ollama" => Ok(Arc::new(OllamaChat::new(config)?)),
        other => bail!("Unknown llm provider: {}", other),
    }
}
