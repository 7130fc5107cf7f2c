//! Prompt templates for each model role.

use crate::llm::Prompt;
use crate::models::ResearchStrategy;
use chrono::Local;

fn current_date() -> String {
    Local::now().format("%B %d, %Y").to_string()
}

fn strategy_guidance(strategy: ResearchStrategy) -> &'static str {
    match strategy {
        ResearchStrategy::Broad => {
            "Write a general overview query that surfaces introductory and \
             survey material covering the main aspects of the topic."
        }
        ResearchStrategy::Deep => {
            "Write a narrowly scoped technical query that targets specific \
             mechanisms, measurements, or implementation details of the topic."
        }
        ResearchStrategy::Comparative => {
            "Write a query that names two or more concrete entities, approaches \
             or options within the topic so that results contrast them directly."
        }
    }
}

const QUERY_FORMAT: &str = r#"Respond with a JSON object and nothing else:
{"query": "the search query", "rationale": "one sentence on why it helps"}"#;

/// Initial query from the topic alone.
pub fn initial_query(topic: &str, strategy: ResearchStrategy) -> Prompt {
    let system = format!(
        "You write web search queries for a research assistant.\n\
         Today is {}.\n\n\
         {}\n\
         Keep the query under 12 words and prefer recent information.\n\n\
         {}",
        current_date(),
        strategy_guidance(strategy),
        QUERY_FORMAT
    );
    let user = format!("Research topic: {}\n\nGenerate a query for web search.", topic);
    Prompt::new(system, user)
}

/// Next query when no gap was proposed, derived from what is already known.
pub fn continuation_query(
    topic: &str,
    strategy: ResearchStrategy,
    summary: &str,
    previous_query: &str,
) -> Prompt {
    let system = format!(
        "You write web search queries for a research assistant.\n\
         Today is {}.\n\n\
         {}\n\
         The new query must explore something the existing summary does not \
         cover and must differ from the previous query.\n\n\
         {}",
        current_date(),
        strategy_guidance(strategy),
        QUERY_FORMAT
    );
    let user = format!(
        "Research topic: {}\n\nPrevious query: {}\n\nExisting summary:\n{}\n\n\
         Generate the next query for web search.",
        topic, previous_query, summary
    );
    Prompt::new(system, user)
}

/// Polish a follow-up query proposed by reflection.
pub fn refine_gap(topic: &str, strategy: ResearchStrategy, gap_query: &str) -> Prompt {
    let system = format!(
        "You improve web search queries for a research assistant.\n\n\
         {}\n\
         Keep the intent of the proposed query; only make it more precise for a \
         search engine.\n\n\
         {}",
        strategy_guidance(strategy),
        QUERY_FORMAT
    );
    let user = format!(
        "Research topic: {}\n\nProposed follow-up query: {}",
        topic, gap_query
    );
    Prompt::new(system, user)
}

const SUMMARIZER_SYSTEM: &str = "You maintain a running research summary.\n\
Incorporate the new sources into the existing knowledge. Do not restate or \
rewrite what the existing summary already says: write only the new paragraphs \
that should be appended to it.\n\
Cite every claim with the bracketed number of its source, for example [3]. \
Only use the numbers given with the sources. Square brackets are reserved for \
citations: write years, quantities and other numbers without them.\n\
Write plain prose without a preamble or a title.";

/// Fold a batch of numbered sources into the running summary.
pub fn summarize(topic: &str, existing_summary: &str, formatted_sources: &str) -> Prompt {
    let user = if existing_summary.is_empty() {
        format!(
            "Research topic: {}\n\n<Sources>\n{}\n</Sources>\n\n\
             Write the first paragraphs of the summary from these sources.",
            topic, formatted_sources
        )
    } else {
        format!(
            "Research topic: {}\n\n<Existing Summary>\n{}\n</Existing Summary>\n\n\
             <New Sources>\n{}\n</New Sources>\n\n\
             Write the paragraphs to append to the existing summary.",
            topic, existing_summary, formatted_sources
        )
    };
    Prompt::new(SUMMARIZER_SYSTEM, user)
}

/// Look for a knowledge gap in the summary.
pub fn reflect(topic: &str, summary: &str) -> Prompt {
    let system = format!(
        "You are reviewing a research summary about: {}\n\n\
         Identify the most important knowledge gap or missing detail, and write \
         a self-contained web search query that would close it.\n\
         If the summary already covers the topic well, report no gap.\n\n\
         Respond with a JSON object and nothing else:\n\
         {{\"knowledge_gap\": \"what is missing, or none\", \"follow_up_query\": \"query, or empty\"}}",
        topic
    );
    let user = format!(
        "Reflect on the existing summary:\n===\n{}\n===\n\
         Identify a knowledge gap and generate a follow-up web search query.",
        summary
    );
    Prompt::new(system, user)
}
