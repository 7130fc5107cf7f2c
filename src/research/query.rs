//! Query generation.
//!
//! The first cycle derives a query from the topic and strategy alone. Later
//! cycles use the pending gap when there is one, otherwise they ask the
//! model for a fresh query based on the running summary.

use super::prompts;
use super::state::ResearchState;
use crate::error::ResearchError;
use crate::llm::parse::parse_query;
use crate::llm::{generate_with_timeout, LanguageModel, Prompt, PromptRole};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Attempts per query before giving up (one retry).
const GENERATION_ATTEMPTS: usize = 2;

pub struct QueryGenerator {
    model: Arc<dyn LanguageModel>,
    strip_thinking: bool,
    refine_gaps: bool,
    timeout: Duration,
}

impl QueryGenerator {
    pub fn new(
        model: Arc<dyn LanguageModel>,
        strip_thinking: bool,
        refine_gaps: bool,
        timeout: Duration,
    ) -> Self {
        Self {
            model,
            strip_thinking,
            refine_gaps,
            timeout,
        }
    }

    /// Produce the next query and store it as the state's current query.
    pub async fn generate(&self, state: &mut ResearchState) -> Result<(), ResearchError> {
        let query = if state.loop_count() == 0 {
            let prompt = prompts::initial_query(state.topic(), state.strategy());
            self.ask(PromptRole::QueryWriter, &prompt).await?
        } else if let Some(gap) = state.take_pending_gap() {
            self.from_gap(state, gap).await
        } else {
            let prompt = prompts::continuation_query(
                state.topic(),
                state.strategy(),
                state.running_summary(),
                state.current_query(),
            );
            self.ask(PromptRole::QueryWriter, &prompt).await?
        };

        info!("Search query: {}", query);
        state.set_current_query(query);
        Ok(())
    }

    async fn from_gap(&self, state: &ResearchState, gap: String) -> String {
        if !self.refine_gaps {
            return gap;
        }

        let prompt = prompts::refine_gap(state.topic(), state.strategy(), &gap);
        match self.ask(PromptRole::QueryRefiner, &prompt).await {
            Ok(refined) => {
                debug!("Refined follow-up query: {} -> {}", gap, refined);
                refined
            }
            Err(e) => {
                warn!("Keeping unrefined follow-up query: {}", e);
                gap
            }
        }
    }

    async fn ask(&self, role: PromptRole, prompt: &Prompt) -> Result<String, ResearchError> {
        let mut last_problem = String::new();

        for attempt in 1..=GENERATION_ATTEMPTS {
            match generate_with_timeout(self.model.as_ref(), role, prompt, self.timeout).await {
                Ok(raw) => match parse_query(&raw, self.strip_thinking) {
                    Some(query) => return Ok(query),
                    None => {
                        last_problem = "model returned no usable query".to_string();
                        warn!("Attempt {}: {}", attempt, last_problem);
                    }
                },
                Err(e) => {
                    warn!("Attempt {}: query generation failed: {}", attempt, e);
                    last_problem = e.to_string();
                }
            }
        }

        Err(ResearchError::GenerationFailure(last_problem))
    }
}
