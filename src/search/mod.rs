//! Web search collaborators.
//!
//! [`SearchClient`] runs one query against a backend; [`PageFetcher`]
//! retrieves a single page as readable text. Both are injected into the
//! research executor so tests can substitute deterministic stubs.

pub mod duckduckgo;
pub mod fetch;
pub mod perplexity;
pub mod searxng;
pub mod tavily;

pub use duckduckgo::DuckDuckGoClient;
pub use fetch::HttpPageFetcher;
pub use perplexity::PerplexityClient;
pub use searxng::SearxngClient;
pub use tavily::TavilyClient;

use crate::config::Config;
use crate::error::{FetchError, SearchError};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// User agent sent by every HTTP search backend.
pub(crate) const USER_AGENT: &str = concat!("deepresearcher/", env!("CARGO_PKG_VERSION"));

/// Available search backends.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum SearchApi {
    /// DuckDuckGo HTML results (no API key)
    #[default]
    #[value(name = "duckduckgo")]
    DuckDuckGo,
    /// Self-hosted SearXNG instance
    Searxng,
    /// Tavily search API
    Tavily,
    /// Perplexity answer API
    Perplexity,
}

impl fmt::Display for SearchApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchApi::DuckDuckGo => write!(f, "duckduckgo"),
            SearchApi::Searxng => write!(f, "searxng"),
            SearchApi::Tavily => write!(f, "tavily"),
            SearchApi::Perplexity => write!(f, "perplexity"),
        }
    }
}

/// One raw search result as returned by a backend.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SearchHit {
    pub url: String,
    pub title: String,
    pub snippet: String,
    /// Full page content, when the backend already provides it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

#[async_trait]
pub trait SearchClient: Send + Sync {
    /// Run `query`, returning at most `limit` hits in rank order.
    ///
    /// An empty list is a valid answer. Backends that can return page
    /// content themselves do so when `fetch_full_page` is set.
    async fn search(
        &self,
        query: &str,
        limit: usize,
        fetch_full_page: bool,
    ) -> Result<Vec<SearchHit>, SearchError>;
}

#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch `url` and return its readable text.
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .context("Failed to create HTTP client")
}

pub(crate) fn map_transport_error(e: reqwest::Error, timeout: Duration) -> SearchError {
    if e.is_timeout() {
        SearchError::Timeout(timeout.as_secs())
    } else {
        SearchError::Transport(e.to_string())
    }
}

/// Build the search client selected in the configuration.
pub fn build_search_client(config: &Config) -> Result<Arc<dyn SearchClient>> {
    let timeout = Duration::from_secs(config.research.search_timeout_seconds);

    let client: Arc<dyn SearchClient> = match config.search.api {
        SearchApi::DuckDuckGo => Arc::new(DuckDuckGoClient::new(timeout)?),
        SearchApi::Searxng => Arc::new(SearxngClient::new(&config.search.searxng_url, timeout)?),
        SearchApi::Tavily => {
            let key = config.search.tavily_api_key.clone().ok_or_else(|| {
                SearchError::NotConfigured("tavily needs TAVILY_API_KEY".into())
            })?;
            Arc::new(TavilyClient::new(key, timeout)?)
        }
        SearchApi::Perplexity => {
            let key = config.search.perplexity_api_key.clone().ok_or_else(|| {
                SearchError::NotConfigured("perplexity needs PERPLEXITY_API_KEY".into())
            })?;
            Arc::new(PerplexityClient::new(key, timeout)?)
        }
    };

    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigOverrides;

    #[test]
    fn test_search_api_names() {
        let api: SearchApi = serde_json::from_str("\"duckduckgo\"").unwrap();
        assert_eq!(api, SearchApi::DuckDuckGo);
        assert_eq!(SearchApi::Searxng.to_string(), "searxng");

        use clap::ValueEnum;
        let parsed = SearchApi::from_str("duckduckgo", true).unwrap();
        assert_eq!(parsed, SearchApi::DuckDuckGo);
    }

    #[test]
    fn test_build_search_client() {
        let config = Config::default();
        assert!(build_search_client(&config).is_ok());

        let config = Config::resolve(
            None,
            &ConfigOverrides {
                search_api: Some(SearchApi::Tavily),
                tavily_api_key: Some("tvly-test".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
        assert!(build_search_client(&config).is_ok());

        let mut config = Config::default();
        config.search.api = SearchApi::Perplexity;
        let err = build_search_client(&config).err().unwrap();
        assert!(matches!(
            err.downcast_ref::<SearchError>(),
            Some(SearchError::NotConfigured(_))
        ));
    }
}
