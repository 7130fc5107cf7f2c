//! The state threaded through one research run.
//!
//! Each field has a single owning stage and is only changed through the
//! method that stage calls:
//!
//! - `current_query`, `pending_gap` (consume): query generator
//! - `sources`: deduplicator
//! - `running_summary`: summarizer, append-only
//! - `loop_count`, `pending_gap` (set), `terminated`: loop controller

use super::dedup::{MergeOutcome, SourceStore};
use crate::models::{ResearchStrategy, SourceRecord};
use serde::Serialize;
use std::fmt;

/// Controller states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Stage {
    Init,
    Generating,
    Researching,
    Summarizing,
    Reflecting,
    Finalizing,
    Failed,
}

impl Stage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Finalizing | Stage::Failed)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Init => "Starting",
            Stage::Generating => "Generating query",
            Stage::Researching => "Searching the web",
            Stage::Summarizing => "Summarizing sources",
            Stage::Reflecting => "Looking for knowledge gaps",
            Stage::Finalizing => "Finalizing report",
            Stage::Failed => "Failed",
        };
        write!(f, "{}", name)
    }
}

/// Mutable aggregate for one run. Never shared between runs.
#[derive(Debug, Clone, Serialize)]
pub struct ResearchState {
    topic: String,
    strategy: ResearchStrategy,
    loop_count: usize,
    current_query: String,
    sources: SourceStore,
    running_summary: String,
    pending_gap: Option<String>,
    terminated: bool,
}

impl ResearchState {
    pub fn new(topic: impl Into<String>, strategy: ResearchStrategy) -> Self {
        Self {
            topic: topic.into(),
            strategy,
            loop_count: 0,
            current_query: String::new(),
            sources: SourceStore::new(),
            running_summary: String::new(),
            pending_gap: None,
            terminated: false,
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn strategy(&self) -> ResearchStrategy {
        self.strategy
    }

    /// Completed cycles.
    pub fn loop_count(&self) -> usize {
        self.loop_count
    }

    pub fn current_query(&self) -> &str {
        &self.current_query
    }

    pub fn sources(&self) -> &SourceStore {
        &self.sources
    }

    pub fn running_summary(&self) -> &str {
        &self.running_summary
    }

    #[cfg(test)]
    pub fn pending_gap(&self) -> Option<&str> {
        self.pending_gap.as_deref()
    }

    #[cfg(test)]
    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    pub(crate) fn set_current_query(&mut self, query: String) {
        self.current_query = query;
    }

    /// Take the pending gap, clearing it.
    pub(crate) fn take_pending_gap(&mut self) -> Option<String> {
        self.pending_gap.take()
    }

    pub(crate) fn set_pending_gap(&mut self, gap: String) {
        self.pending_gap = Some(gap);
    }

    pub(crate) fn merge_sources(&mut self, batch: Vec<SourceRecord>) -> MergeOutcome {
        self.sources.merge(batch)
    }

    pub(crate) fn sources_mut(&mut self) -> &mut SourceStore {
        &mut self.sources
    }

    /// Append new material to the running summary. The summary never shrinks.
    pub(crate) fn extend_summary(&mut self, addition: &str) {
        let addition = addition.trim();
        if addition.is_empty() {
            return;
        }
        if !self.running_summary.is_empty() {
            self.running_summary.push_str("\n\n");
        }
        self.running_summary.push_str(addition);
    }

    pub(crate) fn complete_cycle(&mut self, max_loops: usize) {
        debug_assert!(self.loop_count < max_loops, "loop budget overrun");
        self.loop_count += 1;
    }

    pub(crate) fn terminate(&mut self) {
        debug_assert!(!self.terminated, "state terminated twice");
        self.terminated = true;
    }
}
