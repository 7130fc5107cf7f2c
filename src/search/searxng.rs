//! SearXNG metasearch over its JSON API.

use super::{http_client, map_transport_error, SearchClient, SearchHit};
use crate::error::SearchError;
use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

pub struct SearxngClient {
    base_url: String,
    http_client: reqwest::Client,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct SearxngResponse {
    #[serde(default)]
    results: Vec<SearxngResult>,
}

#[derive(Debug, Deserialize)]
struct SearxngResult {
    #[serde(default)]
    url: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: String,
}

impl SearxngClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http_client: http_client(timeout)?,
            timeout,
        })
    }
}

fn into_hits(response: SearxngResponse, limit: usize) -> Vec<SearchHit> {
    response
        .results
        .into_iter()
        .take(limit)
        .map(|r| SearchHit {
            url: r.url,
            title: r.title,
            snippet: r.content,
            content: None,
        })
        .collect()
}

#[async_trait]
impl SearchClient for SearxngClient {
    async fn search(
        &self,
        query: &str,
        limit: usize,
        _fetch_full_page: bool,
    ) -> Result<Vec<SearchHit>, SearchError> {
        let url = format!("{}/search", self.base_url);

        let response = self
            .http_client
            .get(&url)
            .query(&[("q", query), ("format", "json")])
            .send()
            .await
            .map_err(|e| map_transport_error(e, self.timeout))?;

        if !response.status().is_success() {
            return Err(SearchError::Transport(format!(
                "SearXNG at {} returned {}",
                self.base_url,
                response.status()
            )));
        }

        let body: SearxngResponse = response
            .json()
            .await
            .map_err(|e| SearchError::InvalidResponse(e.to_string()))?;

        Ok(into_hits(body, limit))
    }
}
