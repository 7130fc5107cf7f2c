//! Tavily search API.
//!
//! Tavily can return the page body itself (`raw_content`), which spares
//! the executor a separate fetch.

use super::{http_client, map_transport_error, SearchClient, SearchHit};
use crate::error::SearchError;
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const ENDPOINT: &str = "https://api.tavily.com/search";

pub struct TavilyClient {
    api_key: String,
    http_client: reqwest::Client,
    timeout: Duration,
}

#[derive(Debug, Serialize)]
struct TavilyRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    max_results: usize,
    include_raw_content: bool,
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Debug, Deserialize)]
struct TavilyResult {
    url: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    raw_content: Option<String>,
}

impl TavilyClient {
    pub fn new(api_key: String, timeout: Duration) -> Result<Self> {
        Ok(Self {
            api_key,
            http_client: http_client(timeout)?,
            timeout,
        })
    }
}

fn into_hits(response: TavilyResponse, limit: usize) -> Vec<SearchHit> {
    response
        .results
        .into_iter()
        .take(limit)
        .map(|r| SearchHit {
            url: r.url,
            title: r.title,
            snippet: r.content,
            content: r.raw_content.filter(|c| !c.trim().is_empty()),
        })
        .collect()
}

#[async_trait]
impl SearchClient for TavilyClient {
    async fn search(
        &self,
        query: &str,
        limit: usize,
        fetch_full_page: bool,
    ) -> Result<Vec<SearchHit>, SearchError> {
        let request = TavilyRequest {
            api_key: &self.api_key,
            query,
            max_results: limit,
            include_raw_content: fetch_full_page,
        };

        let response = self
            .http_client
            .post(ENDPOINT)
            .json(&request)
            .send()
            .await
            .map_err(|e| map_transport_error(e, self.timeout))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::Transport(format!(
                "Tavily API error {}: {}",
                status, body
            )));
        }

        let body: TavilyResponse = response
            .json()
            .await
            .map_err(|e| SearchError::InvalidResponse(e.to_string()))?;

        Ok(into_hits(body, limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_hits_keeps_raw_content() {
        let body: TavilyResponse = serde_json::from_str(
            r#"{"results": [
                {"url": "https://a.org", "title": "A", "content": "snip", "raw_content": "full text"},
                {"url": "https://b.org", "title": "B", "content": "snip", "raw_content": "  "},
                {"url": "https://c.org", "title": "C", "content": "snip", "raw_content": null}
            ]}"#,
        )
        .unwrap();

        let hits = into_hits(body, 5);
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].content.as_deref(), Some("full text"));
        assert_eq!(hits[1].content, None);
        assert_eq!(hits[2].content, None);
    }
}
