//! Summarization of newly retrieved sources into the running summary.
//!
//! Only the current cycle's new sources are sent; the existing summary
//! carries everything learned before. The model's reply is reduced to the
//! material it adds, so the summary can only grow.

use super::prompts;
use crate::error::ResearchError;
use crate::llm::parse::clean;
use crate::llm::{generate_with_timeout, LanguageModel, PromptRole};
use crate::models::SourceRecord;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Per-source content limit sent to the model (about 1000 tokens).
pub const MAX_CHARS_PER_SOURCE: usize = 4000;

pub struct Summarizer {
    model: Arc<dyn LanguageModel>,
    strip_thinking: bool,
    timeout: Duration,
}

impl Summarizer {
    pub fn new(model: Arc<dyn LanguageModel>, strip_thinking: bool, timeout: Duration) -> Self {
        Self {
            model,
            strip_thinking,
            timeout,
        }
    }

    /// Return the text to append to `existing` for `batch`.
    ///
    /// `first_citation` is the 1-based citation number of `batch[0]`.
    /// Returns `Ok(None)` when there is nothing to add, including for an
    /// empty batch, which does not call the model at all.
    pub async fn summarize(
        &self,
        topic: &str,
        existing: &str,
        batch: &[SourceRecord],
        first_citation: usize,
    ) -> Result<Option<String>, ResearchError> {
        if batch.is_empty() {
            debug!("No new sources this cycle, summary unchanged");
            return Ok(None);
        }

        let formatted = format_sources(batch, first_citation);
        let prompt = prompts::summarize(topic, existing, &formatted);

        let raw = generate_with_timeout(
            self.model.as_ref(),
            PromptRole::Summarizer,
            &prompt,
            self.timeout,
        )
        .await
        .map_err(|e| ResearchError::SummarizerFailure(e.to_string()))?;

        let reply = clean(&raw, self.strip_thinking);
        if reply.is_empty() {
            return Err(ResearchError::SummarizerFailure(
                "model returned an empty summary".to_string(),
            ));
        }

        Ok(extension_of(existing, &reply))
    }
}

/// The part of `reply` that extends `existing`.
///
/// A reply that restates the existing summary as its prefix contributes only
/// its suffix; anything else is new material in full.
fn extension_of(existing: &str, reply: &str) -> Option<String> {
    let existing = existing.trim();
    let addition = if !existing.is_empty() && reply.starts_with(existing) {
        reply[existing.len()..].trim()
    } else {
        reply.trim()
    };
    (!addition.is_empty()).then(|| addition.to_string())
}

/// Render sources with their global citation numbers.
pub fn format_sources(batch: &[SourceRecord], first_citation: usize) -> String {
    let mut out = String::new();

    for (offset, source) in batch.iter().enumerate() {
        let content = truncate_chars(source.content(), MAX_CHARS_PER_SOURCE);
        out.push_str(&format!(
            "[{}] {}\nURL: {}\nContent: {}\n\n",
            first_citation + offset,
            source.title,
            source.original_url,
            content
        ));
    }

    out.trim_end().to_string()
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}... [truncated]", &text[..cut]),
        None => text.to_string(),
    }
}
