//! Standalone HTML report.

use crate::models::{CredibilityTier, ResearchReport, SourceRecord};

const STYLE: &str = "body{font-family:system-ui,sans-serif;max-width:50rem;margin:2rem auto;\
padding:0 1rem;line-height:1.6;color:#222}h1{border-bottom:2px solid #ddd}\
.meta{color:#555;font-size:.9rem}.tier{font-size:.8rem;color:#666}\
a.cite{text-decoration:none;font-size:.8rem;vertical-align:super}";

/// Generate a self-contained HTML page for the report.
pub fn generate_html_report(report: &ResearchReport) -> String {
    let meta = &report.metadata;
    let mut page = String::new();

    page.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    page.push_str(&format!(
        "<title>Research Report: {}</title>\n",
        escape(&meta.topic)
    ));
    page.push_str(&format!("<style>{}</style>\n</head>\n<body>\n", STYLE));

    page.push_str(&format!(
        "<h1>Research Report: {}</h1>\n",
        escape(&meta.topic)
    ));
    page.push_str(&format!(
        "<p class=\"meta\">{} strategy &middot; {} of {} cycles &middot; {} &middot; model <code>{}</code> &middot; {}</p>\n",
        meta.strategy,
        meta.loops_completed,
        meta.max_loops,
        escape(&meta.termination.to_string()),
        escape(&meta.model_used),
        meta.generated_at.format("%Y-%m-%d %H:%M UTC")
    ));

    page.push_str("<h2>Findings</h2>\n");
    let paragraphs: Vec<&str> = report
        .summary
        .split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();
    if paragraphs.is_empty() {
        page.push_str("<p><em>No findings were summarized for this topic.</em></p>\n");
    }
    for paragraph in paragraphs {
        page.push_str(&format!("<p>{}</p>\n", link_citations(&escape(paragraph))));
    }

    page.push_str("<h2>Sources</h2>\n<ol>\n");
    for (i, source) in report.sources.iter().enumerate() {
        page.push_str(&source_item(i + 1, source));
    }
    page.push_str("</ol>\n</body>\n</html>\n");

    page
}

fn source_item(citation: usize, source: &SourceRecord) -> String {
    let tier = if source.credibility_tier == CredibilityTier::Unverified {
        String::new()
    } else {
        format!(
            " <span class=\"tier\">{} {}</span>",
            source.credibility_tier.emoji(),
            source.credibility_tier
        )
    };
    format!(
        "<li id=\"source-{}\"><a href=\"{}\">{}</a>{}</li>\n",
        citation,
        escape(&source.original_url),
        escape(&source.title),
        tier
    )
}

/// Turn `[n]` markers into links to the matching source entry.
fn link_citations(escaped: &str) -> String {
    let mut out = String::with_capacity(escaped.len());
    let mut rest = escaped;

    while let Some(open) = rest.find('[') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let digits = after.chars().take_while(char::is_ascii_digit).count();

        if digits > 0 && after[digits..].starts_with(']') {
            let n = &after[..digits];
            out.push_str(&format!(
                "<a class=\"cite\" href=\"#source-{}\">[{}]</a>",
                n, n
            ));
            rest = &after[digits + 1..];
        } else {
            out.push('[');
            rest = after;
        }
    }
    out.push_str(rest);

    out
}

/// Escape text for HTML element content and attribute values.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
