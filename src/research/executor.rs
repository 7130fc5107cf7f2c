//! Research execution: one search call per cycle, then optional full-page
//! retrieval for each hit.
//!
//! Page fetches run concurrently, bounded by the per-cycle source limit.
//! Results come back in search rank order regardless of completion order,
//! and a failed fetch only drops that one result.

use super::dedup::normalize_url;
use crate::error::{FetchError, ResearchError, SearchError};
use crate::models::{CredibilityTier, SourceRecord};
use crate::search::{PageFetcher, SearchClient, SearchHit};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Records produced by one cycle, before deduplication.
#[derive(Debug, Clone, Default)]
pub struct ResearchBatch {
    pub records: Vec<SourceRecord>,
    /// Hits dropped because they were incomplete or their fetch failed.
    pub dropped: usize,
}

pub struct ResearchExecutor {
    search: Arc<dyn SearchClient>,
    fetcher: Arc<dyn PageFetcher>,
    max_sources: usize,
    fetch_full_page: bool,
    search_timeout: Duration,
    fetch_timeout: Duration,
}

impl ResearchExecutor {
    pub fn new(
        search: Arc<dyn SearchClient>,
        fetcher: Arc<dyn PageFetcher>,
        max_sources: usize,
        fetch_full_page: bool,
        search_timeout: Duration,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            search,
            fetcher,
            max_sources: max_sources.max(1),
            fetch_full_page,
            search_timeout,
            fetch_timeout,
        }
    }

    /// One search transport call under the search timeout.
    pub async fn search(&self, query: &str) -> Result<Vec<SearchHit>, SearchError> {
        let call = self
            .search
            .search(query, self.max_sources, self.fetch_full_page);

        match tokio::time::timeout(self.search_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(SearchError::Timeout(self.search_timeout.as_secs())),
        }
    }

    /// Turn ranked hits into source records for cycle `loop_index` (1-based).
    pub async fn collect(&self, hits: Vec<SearchHit>, loop_index: usize) -> ResearchBatch {
        let results: Vec<Option<SourceRecord>> = stream::iter(hits.into_iter().take(self.max_sources))
            .map(|hit| self.materialize(hit, loop_index))
            .buffered(self.max_sources)
            .collect()
            .await;

        let total = results.len();
        let records: Vec<SourceRecord> = results.into_iter().flatten().collect();
        let dropped = total - records.len();

        debug!(
            "Cycle {}: {} sources collected, {} dropped",
            loop_index,
            records.len(),
            dropped
        );

        ResearchBatch { records, dropped }
    }

    async fn materialize(&self, hit: SearchHit, loop_index: usize) -> Option<SourceRecord> {
        if hit.url.trim().is_empty() {
            warn!("Dropping search result without a URL: {:?}", hit.title);
            return None;
        }

        let full_content = if !self.fetch_full_page {
            None
        } else if let Some(content) = hit.content.clone() {
            Some(content)
        } else {
            match self.fetch(&hit.url).await {
                Ok(text) => Some(text),
                Err(source) => {
                    let drop = ResearchError::FetchDrop {
                        url: hit.url.clone(),
                        source,
                    };
                    warn!("{}", drop);
                    return None;
                }
            }
        };

        let title = if hit.title.trim().is_empty() {
            hit.url.clone()
        } else {
            hit.title.trim().to_string()
        };

        Some(SourceRecord {
            url: normalize_url(&hit.url),
            original_url: hit.url,
            title,
            snippet: hit.snippet.trim().to_string(),
            full_content,
            fetched_at_loop: loop_index,
            credibility_tier: CredibilityTier::Unverified,
        })
    }

    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        match tokio::time::timeout(self.fetch_timeout, self.fetcher.fetch(url)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout(self.fetch_timeout.as_secs())),
        }
    }
}
