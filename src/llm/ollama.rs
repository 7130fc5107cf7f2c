//! Ollama chat client.
//!
//! Sends non-streaming requests to `/api/chat`. JSON-mode roles ask Ollama
//! to constrain output with `format: "json"`.

use super::{LanguageModel, Prompt, PromptRole};
use crate::error::ModelError;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

/// Connection settings for the Ollama client.
#[derive(Debug, Clone)]
pub struct OllamaConfig {
    pub ollama_url: String,
    pub model_name: String,
    pub temperature: f32,
    pub timeout_seconds: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            ollama_url: "http://localhost:11434".to_string(),
            model_name: "llama3.2".to_string(),
            temperature: 0.0,
            timeout_seconds: 300,
        }
    }
}

impl From<&crate::config::Config> for OllamaConfig {
    fn from(config: &crate::config::Config) -> Self {
        Self {
            ollama_url: config.model.ollama_url.clone(),
            model_name: config.model.name.clone(),
            temperature: config.model.temperature,
            timeout_seconds: config.model.timeout_seconds,
        }
    }
}

/// Message in the chat history.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

/// Ollama chat API request.
#[derive(Debug, Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'static str>,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
}

/// Ollama chat API response.
#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

/// Language model backed by a local Ollama server.
pub struct OllamaClient {
    config: OllamaConfig,
    http_client: reqwest::Client,
}

impl OllamaClient {
    /// Create a client for the given server and model.
    pub fn new(config: OllamaConfig) -> Result<Self> {
        info!(
            "Initializing Ollama client with model {} at {}",
            config.model_name, config.ollama_url
        );

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            config,
            http_client,
        })
    }

    fn chat_url(&self) -> String {
        format!("{}/api/chat", self.config.ollama_url.trim_end_matches('/'))
    }

    fn build_request<'a>(&'a self, role: PromptRole, prompt: &Prompt) -> OllamaChatRequest<'a> {
        OllamaChatRequest {
            model: &self.config.model_name,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: prompt.system.clone(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: prompt.user.clone(),
                },
            ],
            stream: false,
            format: role.expects_json().then_some("json"),
            options: OllamaOptions {
                temperature: self.config.temperature,
            },
        }
    }
}

#[async_trait]
impl LanguageModel for OllamaClient {
    async fn generate(&self, role: PromptRole, prompt: &Prompt) -> Result<String, ModelError> {
        let request = self.build_request(role, prompt);
        debug!("Sending {:?} prompt to {}", role, self.config.model_name);

        let response = self
            .http_client
            .post(self.chat_url())
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ModelError::Timeout(self.config.timeout_seconds)
                } else if e.is_connect() {
                    ModelError::Unavailable(format!(
                        "Cannot connect to Ollama at {}. Is Ollama running?",
                        self.config.ollama_url
                    ))
                } else {
                    ModelError::Unavailable(format!("Failed to send request: {}", e))
                }
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::Http { status, body });
        }

        let chat_response: OllamaChatResponse = response
            .json()
            .await
            .map_err(|e| ModelError::Unavailable(format!("Failed to parse Ollama response: {}", e)))?;

        Ok(chat_response.message.content)
    }
}
