//! Perplexity answer API used as a search backend.
//!
//! Perplexity answers with prose plus a citation list. The answer becomes
//! the content of the first hit and each remaining citation its own hit.

use super::{http_client, map_transport_error, SearchClient, SearchHit};
use crate::error::SearchError;
use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

const ENDPOINT: &str = "https://api.perplexity.ai/chat/completions";
const MODEL: &str = "sonar";

pub struct PerplexityClient {
    api_key: String,
    http_client: reqwest::Client,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct PerplexityResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    citations: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: String,
}

impl PerplexityClient {
    pub fn new(api_key: String, timeout: Duration) -> Result<Self> {
        Ok(Self {
            api_key,
            http_client: http_client(timeout)?,
            timeout,
        })
    }
}

fn into_hits(response: PerplexityResponse, limit: usize) -> Vec<SearchHit> {
    let answer = response
        .choices
        .into_iter()
        .next()
        .map(|c| c.message.content)
        .unwrap_or_default();

    response
        .citations
        .into_iter()
        .take(limit)
        .enumerate()
        .map(|(i, url)| {
            if i == 0 {
                SearchHit {
                    url,
                    title: "Perplexity answer, source 1".to_string(),
                    snippet: answer.chars().take(300).collect(),
                    content: Some(answer.clone()).filter(|a| !a.is_empty()),
                }
            } else {
                SearchHit {
                    url,
                    title: format!("Perplexity answer, source {}", i + 1),
                    snippet: "See source 1 for the full answer".to_string(),
                    content: None,
                }
            }
        })
        .collect()
}

#[async_trait]
impl SearchClient for PerplexityClient {
    async fn search(
        &self,
        query: &str,
        limit: usize,
        _fetch_full_page: bool,
    ) -> Result<Vec<SearchHit>, SearchError> {
        let request = json!({
            "model": MODEL,
            "messages": [
                {"role": "system", "content": "Search the web and provide factual information with sources."},
                {"role": "user", "content": query}
            ]
        });

        let response = self
            .http_client
            .post(ENDPOINT)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| map_transport_error(e, self.timeout))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::Transport(format!(
                "Perplexity API error {}: {}",
                status, body
            )));
        }

        let body: PerplexityResponse = response
            .json()
            .await
            .map_err(|e| SearchError::InvalidResponse(e.to_string()))?;

        Ok(into_hits(body, limit))
    }
}
