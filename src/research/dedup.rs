//! Source deduplication.
//!
//! Sources are keyed by a normalized URL. The store is append-only: the
//! first record seen for a key wins, and insertion order is the citation
//! order for the whole run.

use crate::models::{CredibilityTier, SourceRecord};
use serde::Serialize;
use std::collections::HashMap;
use std::ops::Range;

/// Normalize a URL into a deduplication key.
///
/// Scheme, host and path are lowercased; default ports, the fragment and a
/// trailing slash are removed. The query string is kept as-is. Input that
/// does not parse as a URL gets the same treatment textually.
pub fn normalize_url(raw: &str) -> String {
    let trimmed = raw.trim();

    match url::Url::parse(trimmed) {
        Ok(parsed) if parsed.has_host() => {
            let mut key = format!(
                "{}://{}",
                parsed.scheme(),
                parsed.host_str().unwrap_or_default().to_lowercase()
            );
            // `port()` is None when the port is the scheme default
            if let Some(port) = parsed.port() {
                key.push_str(&format!(":{}", port));
            }
            key.push_str(parsed.path().to_lowercase().trim_end_matches('/'));
            if let Some(query) = parsed.query().filter(|q| !q.is_empty()) {
                key.push('?');
                key.push_str(query);
            }
            key
        }
        _ => {
            let without_fragment = trimmed.split('#').next().unwrap_or_default();
            without_fragment.to_lowercase().trim_end_matches('/').to_string()
        }
    }
}

/// Result of merging one batch into the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Store positions (0-based) of the records accepted from this batch.
    pub accepted: Range<usize>,
    /// Records discarded as duplicates.
    pub discarded: usize,
}

impl MergeOutcome {
    pub fn accepted_count(&self) -> usize {
        self.accepted.len()
    }
}

/// Ordered set of sources keyed by normalized URL.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SourceStore {
    records: Vec<SourceRecord>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl SourceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All records in citation order.
    pub fn records(&self) -> &[SourceRecord] {
        &self.records
    }

    /// Record cited as `[citation]` (1-based).
    pub fn cited(&self, citation: usize) -> Option<&SourceRecord> {
        citation.checked_sub(1).and_then(|i| self.records.get(i))
    }

    /// Merge a batch, keeping the first record seen for each key.
    ///
    /// Running the same batch twice against an unchanged store leaves the
    /// store as it was after the first run.
    pub fn merge(&mut self, batch: Vec<SourceRecord>) -> MergeOutcome {
        let start = self.records.len();
        let mut discarded = 0;

        for mut record in batch {
            let key = normalize_url(&record.url);
            if self.index.contains_key(&key) {
                discarded += 1;
                continue;
            }
            record.url = key.clone();
            self.index.insert(key, self.records.len());
            self.records.push(record);
        }

        MergeOutcome {
            accepted: start..self.records.len(),
            discarded,
        }
    }

    /// Set the credibility tier of the record at `position` (0-based).
    pub fn set_tier(&mut self, position: usize, tier: CredibilityTier) {
        if let Some(record) = self.records.get_mut(position) {
            record.credibility_tier = tier;
        }
    }
}
