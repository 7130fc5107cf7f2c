//! Error types for the research pipeline.
//!
//! Collaborators (model, search, fetch, verifier, renderer) each get their
//! own error type. The controller classifies every collaborator failure into
//! exactly one [`ResearchError`] kind before deciding the next stage.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Failure from the language-model collaborator.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model unavailable: {0}")]
    Unavailable(String),

    #[error("model request timed out after {0}s")]
    Timeout(u64),

    #[error("model API error {status}: {body}")]
    Http { status: u16, body: String },
}

/// Failure of the search transport itself (not of a single result).
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("search transport failed: {0}")]
    Transport(String),

    #[error("search timed out after {0}s")]
    Timeout(u64),

    #[error("invalid search response: {0}")]
    InvalidResponse(String),

    #[error("search backend not configured: {0}")]
    NotConfigured(String),
}

/// Failure fetching a single page.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("fetch failed: {0}")]
    Http(String),

    #[error("fetch timed out after {0}s")]
    Timeout(u64),

    #[error("page had no readable content")]
    Empty,
}

#[derive(Debug, Error)]
#[error("source verification failed: {0}")]
pub struct VerifierError(pub String);

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Tag for fatal stage failures, carried by `TerminationReason::FatalError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    GenerationFailure,
    SearchUnavailable,
    DanglingCitation,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::GenerationFailure => write!(f, "GenerationFailure"),
            FailureKind::SearchUnavailable => write!(f, "SearchUnavailable"),
            FailureKind::DanglingCitation => write!(f, "DanglingCitation"),
        }
    }
}

/// The run-level error taxonomy.
#[derive(Debug, Error)]
pub enum ResearchError {
    /// No usable query could be produced.
    #[error("query generation failed: {0}")]
    GenerationFailure(String),

    /// The search transport failed on every attempt.
    #[error("search unavailable after {attempts} attempts: {source}")]
    SearchUnavailable {
        attempts: usize,
        #[source]
        source: SearchError,
    },

    /// Recoverable: the prior summary is kept.
    #[error("summarizer failed: {0}")]
    SummarizerFailure(String),

    /// Recoverable: one result was dropped.
    #[error("dropped {url}: {source}")]
    FetchDrop {
        url: String,
        #[source]
        source: FetchError,
    },

    #[error("summary cites [{index}] but only {available} sources exist")]
    DanglingCitation { index: usize, available: usize },

    #[error("research cancelled by caller")]
    CallerCancelled,

    #[error("failed to render report: {0}")]
    Render(#[from] RenderError),
}

impl ResearchError {
    /// Fatal kind for this error, `None` for recoverable or graceful ones.
    pub fn fatal_kind(&self) -> Option<FailureKind> {
        match self {
            ResearchError::GenerationFailure(_) => Some(FailureKind::GenerationFailure),
            ResearchError::SearchUnavailable { .. } => Some(FailureKind::SearchUnavailable),
            ResearchError::DanglingCitation { .. } => Some(FailureKind::DanglingCitation),
            ResearchError::SummarizerFailure(_)
            | ResearchError::FetchDrop { .. }
            | ResearchError::CallerCancelled
            | ResearchError::Render(_) => None,
        }
    }
}
