//! Language-model collaborator.
//!
//! The research core only sees the [`LanguageModel`] trait; the Ollama
//! client is one implementation of it.

pub mod ollama;
pub mod parse;

pub use ollama::{OllamaClient, OllamaConfig};

use crate::error::ModelError;
use async_trait::async_trait;
use std::time::Duration;

/// What a prompt is for. Lets implementations pick output modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptRole {
    /// Writes a search query, answers in JSON.
    QueryWriter,
    /// Polishes a follow-up query, answers in JSON.
    QueryRefiner,
    /// Folds new sources into the running summary, answers in prose.
    Summarizer,
    /// Looks for a knowledge gap, answers in JSON.
    Reflector,
}

impl PromptRole {
    /// Whether the model should be constrained to JSON output.
    pub fn expects_json(&self) -> bool {
        !matches!(self, PromptRole::Summarizer)
    }
}

/// A system/user prompt pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

impl Prompt {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
        }
    }
}

#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Run one prompt and return the raw model text.
    async fn generate(&self, role: PromptRole, prompt: &Prompt) -> Result<String, ModelError>;
}

/// Run `generate` under a deadline. An elapsed deadline is a `ModelError::Timeout`.
pub async fn generate_with_timeout(
    model: &dyn LanguageModel,
    role: PromptRole,
    prompt: &Prompt,
    timeout: Duration,
) -> Result<String, ModelError> {
    match tokio::time::timeout(timeout, model.generate(role, prompt)).await {
        Ok(result) => result,
        Err(_) => Err(ModelError::Timeout(timeout.as_secs())),
    }
}
