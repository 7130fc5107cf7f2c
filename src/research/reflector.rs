//! Gap analysis over the running summary.

use super::prompts;
use crate::llm::parse::{parse_reflection, ReflectionReply};
use crate::llm::{generate_with_timeout, LanguageModel, PromptRole};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Verdict of one reflection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GapVerdict {
    /// Research should continue with this query.
    FollowUp(String),
    /// Nothing important is missing.
    NoGap,
}

/// A verdict plus whether it came from the fallback path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reflection {
    pub verdict: GapVerdict,
    pub fell_back: bool,
}

pub struct Reflector {
    model: Arc<dyn LanguageModel>,
    strip_thinking: bool,
    timeout: Duration,
}

impl Reflector {
    pub fn new(model: Arc<dyn LanguageModel>, strip_thinking: bool, timeout: Duration) -> Self {
        Self {
            model,
            strip_thinking,
            timeout,
        }
    }

    /// Inspect `summary` against `topic`.
    ///
    /// A failed or unreadable reply falls back to a generic follow-up on the
    /// topic; the controller's repeat guard stops that from looping.
    pub async fn reflect(&self, topic: &str, summary: &str) -> Reflection {
        let prompt = prompts::reflect(topic, summary);
        let reply = match generate_with_timeout(
            self.model.as_ref(),
            PromptRole::Reflector,
            &prompt,
            self.timeout,
        )
        .await
        {
            Ok(raw) => parse_reflection(&raw, self.strip_thinking),
            Err(e) => {
                warn!("Reflection failed: {}", e);
                ReflectionReply::Unparseable
            }
        };

        match reply {
            ReflectionReply::Gap(query) => {
                info!("Knowledge gap found, follow-up: {}", query);
                Reflection {
                    verdict: GapVerdict::FollowUp(query),
                    fell_back: false,
                }
            }
            ReflectionReply::NoGap => {
                info!("No knowledge gap found");
                Reflection {
                    verdict: GapVerdict::NoGap,
                    fell_back: false,
                }
            }
            ReflectionReply::Unparseable => {
                let query = fallback_query(topic);
                warn!("Using fallback follow-up query: {}", query);
                Reflection {
                    verdict: GapVerdict::FollowUp(query),
                    fell_back: true,
                }
            }
        }
    }
}

fn fallback_query(topic: &str) -> String {
    format!("{} detailed analysis", topic.trim())
}
