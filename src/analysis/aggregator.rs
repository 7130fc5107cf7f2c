//! Source aggregation and statistics.
//!
//! This module provides utilities for grouping the final source list and
//! computing the breakdowns shown in the report.

use crate::models::{CredibilityTier, SourceRecord};
use std::collections::{BTreeMap, HashMap};

/// Group sources by the cycle that introduced them, keeping citation numbers.
///
/// Each entry is `(citation, source)` with the 1-based citation.
pub fn group_by_loop(sources: &[SourceRecord]) -> BTreeMap<usize, Vec<(usize, &SourceRecord)>> {
    let mut grouped: BTreeMap<usize, Vec<(usize, &SourceRecord)>> = BTreeMap::new();

    for (i, source) in sources.iter().enumerate() {
        grouped
            .entry(source.fetched_at_loop)
            .or_default()
            .push((i + 1, source));
    }

    grouped
}

/// Count sources per credibility tier.
pub fn tier_distribution(sources: &[SourceRecord]) -> HashMap<CredibilityTier, usize> {
    let mut dist: HashMap<CredibilityTier, usize> = HashMap::new();

    for source in sources {
        *dist.entry(source.credibility_tier).or_default() += 1;
    }

    dist
}

/// Count sources per domain.
pub fn domain_distribution(sources: &[SourceRecord]) -> HashMap<String, usize> {
    let mut dist: HashMap<String, usize> = HashMap::new();

    for source in sources {
        *dist.entry(source.domain()).or_default() += 1;
    }

    dist
}

/// The `n` domains contributing the most sources.
///
/// Ties are broken alphabetically so the output is stable.
pub fn top_domains(sources: &[SourceRecord], n: usize) -> Vec<(String, usize)> {
    let mut domains: Vec<(String, usize)> = domain_distribution(sources).into_iter().collect();

    domains.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    domains.truncate(n);

    domains
}

/// Share of sources that carry fetched page text, as a percentage.
pub fn full_content_ratio(sources: &[SourceRecord]) -> f64 {
    if sources.is_empty() {
        return 0.0;
    }
    let with_content = sources.iter().filter(|s| s.full_content.is_some()).count();
    with_content as f64 / sources.len() as f64 * 100.0
}
