//! Turns the final research state into a rendered report.
//!
//! Every citation in the summary must resolve to a collected source before
//! anything is rendered.

use super::{RenderedReport, Renderer};
use crate::error::ResearchError;
use crate::models::{OutputFormat, ReportMetadata, ResearchReport, RunStats, TerminationReason};
use crate::research::dedup::SourceStore;
use crate::research::state::ResearchState;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub struct Finalizer {
    renderer: Arc<dyn Renderer>,
    format: OutputFormat,
    model_name: String,
    max_loops: usize,
}

impl Finalizer {
    pub fn new(
        renderer: Arc<dyn Renderer>,
        format: OutputFormat,
        model_name: impl Into<String>,
        max_loops: usize,
    ) -> Self {
        Self {
            renderer,
            format,
            model_name: model_name.into(),
            max_loops,
        }
    }

    /// Build and render the report for a run that ended with `termination`.
    pub fn finalize(
        &self,
        state: &ResearchState,
        termination: TerminationReason,
        stats: &RunStats,
        elapsed: Duration,
    ) -> Result<RenderedReport, ResearchError> {
        check_citations(state.running_summary(), state.sources())?;

        let report = ResearchReport {
            metadata: ReportMetadata {
                topic: state.topic().to_string(),
                strategy: state.strategy(),
                model_used: self.model_name.clone(),
                generated_at: Utc::now(),
                loops_completed: state.loop_count(),
                max_loops: self.max_loops,
                termination,
                duration_seconds: elapsed.as_secs_f64(),
                stats: stats.clone(),
            },
            summary: state.running_summary().to_string(),
            sources: state.sources().records().to_vec(),
        };

        let content = self.renderer.render(&report, self.format)?;
        info!(
            "Report ready: {} sources, {} cycles ({})",
            report.sources.len(),
            report.metadata.loops_completed,
            termination
        );

        Ok(RenderedReport {
            format: self.format,
            content,
            report,
        })
    }
}

/// Fail if any citation in `summary` does not resolve to a stored source.
pub fn check_citations(summary: &str, sources: &SourceStore) -> Result<(), ResearchError> {
    match citation_markers(summary)
        .into_iter()
        .find(|&index| sources.cited(index).is_none())
    {
        Some(index) => Err(ResearchError::DanglingCitation {
            index,
            available: sources.len(),
        }),
        None => Ok(()),
    }
}

/// Citation numbers referenced in `text`, in order of appearance.
///
/// Recognizes `[3]` and grouped forms like `[1, 2]`. Brackets holding
/// anything other than comma-separated numbers are not citations.
pub fn citation_markers(text: &str) -> Vec<usize> {
    let mut markers = Vec::new();
    let mut rest = text;

    while let Some(open) = rest.find('[') {
        let after = &rest[open + 1..];
        let Some(close) = after.find(']') else {
            break;
        };
        let inner = &after[..close];

        // A nested '[' means this bracket was not closed by `close`
        if let Some(nested) = inner.find('[') {
            rest = &after[nested..];
            continue;
        }

        let numbers: Option<Vec<usize>> = inner
            .split(',')
            .map(|part| {
                let part = part.trim();
                if !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit()) {
                    part.parse().ok()
                } else {
                    None
                }
            })
            .collect();
        if let Some(numbers) = numbers {
            markers.extend(numbers);
        }

        rest = &after[close + 1..];
    }

    markers
}
