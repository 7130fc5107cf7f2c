//! Post-processing of raw model output.
//!
//! Models wrap answers in reasoning spans, stray prose or half-valid JSON.
//! These helpers turn that into a query, a gap verdict, or nothing.

use serde_json::Value;

const THINK_OPEN: &str = "<think>";
const THINK_CLOSE: &str = "</think>";

/// Remove every `<think>...</think>` span, including its content.
pub fn strip_thinking_tokens(text: &str) -> String {
    let mut out = text.to_string();
    while let Some(start) = out.find(THINK_OPEN) {
        let Some(rel_end) = out[start..].find(THINK_CLOSE) else {
            break;
        };
        let end = start + rel_end + THINK_CLOSE.len();
        out.replace_range(start..end, "");
    }
    out
}

/// Apply thinking-token stripping when enabled, then trim.
pub fn clean(text: &str, strip_thinking: bool) -> String {
    if strip_thinking {
        strip_thinking_tokens(text).trim().to_string()
    } else {
        text.trim().to_string()
    }
}

fn is_blank(text: &str) -> bool {
    matches!(text.trim(), "" | "{}" | "[]")
}

fn first_quoted(text: &str) -> Option<&str> {
    let start = text.find('"')? + 1;
    let len = text[start..].find('"')?;
    let quoted = text[start..start + len].trim();
    (!quoted.is_empty()).then_some(quoted)
}

fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Extract a search query from a query-writer reply.
///
/// Tries `{"query": ...}` first, then the first quoted string, then the
/// cleaned text itself. Returns `None` when nothing usable remains.
pub fn parse_query(raw: &str, strip_thinking: bool) -> Option<String> {
    let content = clean(raw, strip_thinking);
    if is_blank(&content) {
        return None;
    }

    if let Ok(json) = serde_json::from_str::<Value>(&content) {
        return json
            .get("query")
            .and_then(Value::as_str)
            .map(single_line)
            .filter(|q| !is_blank(q));
    }

    let query = first_quoted(&content)
        .map(single_line)
        .unwrap_or_else(|| single_line(&content));
    (!is_blank(&query)).then_some(query)
}

/// Outcome of parsing a reflection reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReflectionReply {
    /// A follow-up query for the identified gap.
    Gap(String),
    /// The model reports nothing left to research.
    NoGap,
    /// Nothing usable in the reply.
    Unparseable,
}

/// Extract a gap verdict from a reflection reply.
///
/// The JSON shape is `{"knowledge_gap": "...", "follow_up_query": "..."}`.
/// An empty follow-up, or a gap of `"none"`, is an explicit "no gap".
pub fn parse_reflection(raw: &str, strip_thinking: bool) -> ReflectionReply {
    let content = clean(raw, strip_thinking);
    if is_blank(&content) {
        return ReflectionReply::Unparseable;
    }

    if let Ok(json) = serde_json::from_str::<Value>(&content) {
        let gap = json.get("knowledge_gap").and_then(Value::as_str).map(str::trim);
        if matches!(gap, Some(g) if g.is_empty() || g.eq_ignore_ascii_case("none")) {
            return ReflectionReply::NoGap;
        }
        return match json.get("follow_up_query") {
            Some(Value::String(q)) if !is_blank(q) => ReflectionReply::Gap(single_line(q)),
            Some(Value::String(_)) | Some(Value::Null) => ReflectionReply::NoGap,
            _ => ReflectionReply::Unparseable,
        };
    }

    // Prose reply: a question line is the best guess, then a quoted phrase
    if let Some(question) = content
        .lines()
        .map(str::trim)
        .find(|line| line.ends_with('?') && line.len() > 1)
    {
        return ReflectionReply::Gap(single_line(question));
    }
    match first_quoted(&content) {
        Some(quoted) => ReflectionReply::Gap(single_line(quoted)),
        None => ReflectionReply::Unparseable,
    }
}

/// Normalize a query for equality checks: lowercase, collapsed whitespace,
/// no surrounding punctuation.
pub fn normalize_query(query: &str) -> String {
    single_line(&query.to_lowercase())
        .trim_matches(|c: char| !c.is_alphanumeric())
        .to_string()
}
