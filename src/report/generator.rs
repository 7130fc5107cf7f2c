//! Markdown and JSON report generation.
//!
//! This module generates the research report documents from the final
//! summary and source list.

use super::{html, Renderer};
use crate::analysis::{full_content_ratio, group_by_loop, tier_distribution, top_domains};
use crate::error::RenderError;
use crate::models::{
    CredibilityTier, OutputFormat, ReportMetadata, ResearchReport, RunStats, SourceRecord,
};

/// The default renderer, supporting every [`OutputFormat`].
#[derive(Debug, Clone, Default)]
pub struct ReportRenderer;

impl ReportRenderer {
    pub fn new() -> Self {
        Self
    }
}

impl Renderer for ReportRenderer {
    fn render(&self, report: &ResearchReport, format: OutputFormat) -> Result<String, RenderError> {
        match format {
            OutputFormat::Markdown => Ok(generate_markdown_report(report)),
            OutputFormat::Json => generate_json_report(report),
            OutputFormat::Html => Ok(html::generate_html_report(report)),
        }
    }
}

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &ResearchReport) -> String {
    let mut output = String::new();

    // Title
    output.push_str(&format!("# Research Report: {}\n\n", report.metadata.topic));

    // Metadata section
    output.push_str(&generate_metadata_section(&report.metadata));

    // Table of contents
    output.push_str(&generate_table_of_contents(report));

    // Findings
    output.push_str(&generate_summary_section(&report.summary));

    // Sources by cycle
    output.push_str(&generate_sources_section(&report.sources));

    // Statistics
    output.push_str(&generate_statistics_section(report));

    // Footer
    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Topic:** {}\n", metadata.topic));
    section.push_str(&format!("- **Strategy:** {}\n", metadata.strategy));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Model Used:** `{}`\n", metadata.model_used));
    section.push_str(&format!(
        "- **Research Cycles:** {} of {}\n",
        metadata.loops_completed, metadata.max_loops
    ));
    section.push_str(&format!("- **Stopped Because:** {}\n", metadata.termination));
    section.push_str(&format!(
        "- **Research Duration:** {:.1}s\n",
        metadata.duration_seconds
    ));
    section.push('\n');

    section
}

/// Generate the table of contents.
fn generate_table_of_contents(report: &ResearchReport) -> String {
    let mut toc = String::new();

    toc.push_str("## Table of Contents\n\n");
    toc.push_str("- [Metadata](#metadata)\n");
    toc.push_str("- [Findings](#findings)\n");
    toc.push_str("- [Sources](#sources)\n");

    for cycle in group_by_loop(&report.sources).keys() {
        toc.push_str(&format!("  - [Cycle {}](#cycle-{})\n", cycle, cycle));
    }

    toc.push_str("- [Statistics](#statistics)\n");
    toc.push('\n');

    toc
}

/// Generate the findings section.
fn generate_summary_section(summary: &str) -> String {
    let mut section = String::new();

    section.push_str("## Findings\n\n");
    if summary.trim().is_empty() {
        section.push_str("*No findings were summarized for this topic.*\n\n");
    } else {
        section.push_str(summary.trim());
        section.push_str("\n\n");
    }

    section
}

/// Generate the sources section, grouped by the cycle that found them.
fn generate_sources_section(sources: &[SourceRecord]) -> String {
    let mut section = String::new();

    section.push_str("## Sources\n\n");

    if sources.is_empty() {
        section.push_str("No sources were collected.\n\n");
        return section;
    }

    for (cycle, entries) in group_by_loop(sources) {
        section.push_str(&format!("### Cycle {}\n\n", cycle));
        for (citation, source) in entries {
            section.push_str(&generate_source_line(citation, source));
        }
        section.push('\n');
    }

    section
}

/// Generate a single numbered source entry.
fn generate_source_line(citation: usize, source: &SourceRecord) -> String {
    let mut line = format!(
        "{}. [{}] [{}]({})",
        citation, citation, source.title, source.original_url
    );

    if source.credibility_tier != CredibilityTier::Unverified {
        line.push_str(&format!(
            " {} *{} credibility*",
            source.credibility_tier.emoji(),
            source.credibility_tier
        ));
    }
    line.push('\n');

    line
}

/// Generate the statistics section.
fn generate_statistics_section(report: &ResearchReport) -> String {
    let mut section = String::new();

    section.push_str("## Statistics\n\n");

    // Tier breakdown
    let tiers = tier_distribution(&report.sources);
    section.push_str("### Source Credibility\n\n");
    let all = CredibilityTier::all();
    section.push_str(&format!(
        "| {} High | {} Medium | {} Low | {} Unverified | **Total** |\n",
        all[0].emoji(),
        all[1].emoji(),
        all[2].emoji(),
        all[3].emoji(),
    ));
    section.push_str("|:---:|:---:|:---:|:---:|:---:|\n");
    let counts: Vec<usize> = all
        .iter()
        .map(|tier| tiers.get(tier).copied().unwrap_or(0))
        .collect();
    section.push_str(&format!(
        "| {} | {} | {} | {} | **{}** |\n\n",
        counts[0],
        counts[1],
        counts[2],
        counts[3],
        report.sources.len()
    ));

    // Domains
    let domains = top_domains(&report.sources, 5);
    if !domains.is_empty() {
        section.push_str("### Top Domains\n\n");
        section.push_str("| Domain | Sources |\n");
        section.push_str("|:---|:---:|\n");

        for (domain, count) in domains {
            section.push_str(&format!("| {} | {} |\n", domain, count));
        }
        section.push('\n');
    }

    section.push_str(&generate_run_stats(
        &report.metadata.stats,
        full_content_ratio(&report.sources),
    ));

    section
}

fn generate_run_stats(stats: &RunStats, full_content_pct: f64) -> String {
    let mut block = String::new();

    block.push_str("### Run\n\n");
    block.push_str(&format!("- Search attempts: {}\n", stats.search_attempts));
    block.push_str(&format!("- Duplicates discarded: {}\n", stats.duplicates_discarded));
    block.push_str(&format!("- Results dropped: {}\n", stats.fetch_drops));
    block.push_str(&format!(
        "- Sources with full page text: {:.0}%\n",
        full_content_pct
    ));
    if stats.summarizer_failures > 0 {
        block.push_str(&format!(
            "- Summary updates skipped: {}\n",
            stats.summarizer_failures
        ));
    }
    if stats.reflection_fallbacks > 0 {
        block.push_str(&format!(
            "- Reflection fallbacks: {}\n",
            stats.reflection_fallbacks
        ));
    }
    if stats.verifier_failures > 0 {
        block.push_str(&format!(
            "- Sources left unverified: {}\n",
            stats.verifier_failures
        ));
    }
    block.push('\n');

    block
}

/// Generate the report footer.
fn generate_footer() -> String {
    let mut footer = String::new();

    footer.push_str("---\n\n");
    footer.push_str("*Report generated by DeepResearcher*\n");

    footer
}

/// Generate a JSON report.
pub fn generate_json_report(report: &ResearchReport) -> Result<String, RenderError> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}
