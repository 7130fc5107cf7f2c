//! Data models for the research assistant.
//!
//! This module contains the value types shared across the pipeline:
//! strategies, retrieved sources, termination reasons and the final report.

use crate::error::FailureKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Framing policy for query generation, fixed for a run.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ResearchStrategy {
    /// General overview queries
    #[default]
    Broad,
    /// Narrowly scoped technical queries
    Deep,
    /// Queries naming two or more entities to contrast
    Comparative,
}

impl fmt::Display for ResearchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResearchStrategy::Broad => write!(f, "broad"),
            ResearchStrategy::Deep => write!(f, "deep"),
            ResearchStrategy::Comparative => write!(f, "comparative"),
        }
    }
}

/// Output format for the report.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
    /// Standalone HTML page
    Html,
}

impl OutputFormat {
    /// Conventional file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Markdown => "md",
            OutputFormat::Json => "json",
            OutputFormat::Html => "html",
        }
    }
}

/// Credibility tier assigned by the source verifier.
///
/// Ordered from least to most trusted so tiers compare naturally.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum CredibilityTier {
    /// Not assessed, or assessment failed
    #[default]
    Unverified,
    Low,
    Medium,
    High,
}

impl fmt::Display for CredibilityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredibilityTier::Unverified => write!(f, "Unverified"),
            CredibilityTier::Low => write!(f, "Low"),
            CredibilityTier::Medium => write!(f, "Medium"),
            CredibilityTier::High => write!(f, "High"),
        }
    }
}

impl CredibilityTier {
    /// Returns an emoji representation of the tier.
    pub fn emoji(&self) -> &'static str {
        match self {
            CredibilityTier::Unverified => "⚪",
            CredibilityTier::Low => "🔴",
            CredibilityTier::Medium => "🟡",
            CredibilityTier::High => "🟢",
        }
    }

    /// All tiers, most trusted first.
    pub fn all() -> [CredibilityTier; 4] {
        [
            CredibilityTier::High,
            CredibilityTier::Medium,
            CredibilityTier::Low,
            CredibilityTier::Unverified,
        ]
    }
}

/// One retrieved web result, normalized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRecord {
    /// Normalized URL, the deduplication key.
    pub url: String,
    /// URL exactly as returned by the search backend, used for links.
    pub original_url: String,
    pub title: String,
    pub snippet: String,
    /// Full page text, present only when full-page fetch is enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_content: Option<String>,
    /// 1-based cycle that introduced this source.
    pub fetched_at_loop: usize,
    #[serde(default)]
    pub credibility_tier: CredibilityTier,
}

impl SourceRecord {
    /// Best available text for this source: full page if fetched, else snippet.
    pub fn content(&self) -> &str {
        self.full_content.as_deref().unwrap_or(&self.snippet)
    }

    /// Host part of the link, without a leading `www.`.
    pub fn domain(&self) -> String {
        url::Url::parse(&self.original_url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.trim_start_matches("www.").to_string()))
            .unwrap_or_else(|| self.url.clone())
    }
}

/// Why the loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", content = "kind", rename_all = "snake_case")]
pub enum TerminationReason {
    LoopBudgetExhausted,
    NoGapFound,
    CallerCancelled,
    FatalError(FailureKind),
}

impl TerminationReason {
    /// True for `FatalError`; such runs produce no report.
    pub fn is_fatal(&self) -> bool {
        matches!(self, TerminationReason::FatalError(_))
    }
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminationReason::LoopBudgetExhausted => write!(f, "Loop budget exhausted"),
            TerminationReason::NoGapFound => write!(f, "No knowledge gap found"),
            TerminationReason::CallerCancelled => write!(f, "Cancelled by caller"),
            TerminationReason::FatalError(kind) => write!(f, "Failed: {}", kind),
        }
    }
}

/// Observability counters for a single run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    /// Search transport calls, including retries.
    pub search_attempts: usize,
    /// Results dropped because fetching or normalizing them failed.
    pub fetch_drops: usize,
    /// Results discarded as duplicates of known sources.
    pub duplicates_discarded: usize,
    /// Cycles whose summary update was skipped.
    pub summarizer_failures: usize,
    /// Reflection calls that fell back to the topic query.
    pub reflection_fallbacks: usize,
    /// Times the anti-stall guard forced termination.
    pub stall_overrides: usize,
    /// Sources left unverified because the verifier failed.
    pub verifier_failures: usize,
}

/// Metadata about the research report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub topic: String,
    pub strategy: ResearchStrategy,
    pub model_used: String,
    pub generated_at: DateTime<Utc>,
    pub loops_completed: usize,
    pub max_loops: usize,
    pub termination: TerminationReason,
    pub duration_seconds: f64,
    pub stats: RunStats,
}

/// The complete research report handed to the renderer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchReport {
    pub metadata: ReportMetadata,
    pub summary: String,
    /// Sources in citation order: `sources[i]` is cited as `[i + 1]`.
    pub sources: Vec<SourceRecord>,
}
