//! Source credibility assessment.
//!
//! Runs once over the final source list, just before the report is built.
//! A source the verifier cannot assess stays `Unverified`; verification
//! never fails a run.

use super::dedup::SourceStore;
use crate::error::VerifierError;
use crate::models::{CredibilityTier, SourceRecord};
use tracing::{debug, warn};

/// Assigns a credibility tier to a single source.
pub trait SourceVerifier: Send + Sync {
    fn assess(&self, source: &SourceRecord) -> Result<CredibilityTier, VerifierError>;
}

const TRUSTED_SUFFIXES: &[&str] = &[".edu", ".gov", ".ac.uk", ".int"];

const TRUSTED_DOMAINS: &[&str] = &[
    "wikipedia.org",
    "nature.com",
    "science.org",
    "sciencedirect.com",
    "arxiv.org",
    "ieee.org",
    "acm.org",
    "springer.com",
    "nih.gov",
    "who.int",
    "reuters.com",
    "apnews.com",
    "bbc.co.uk",
    "bbc.com",
];

const SOCIAL_DOMAINS: &[&str] = &[
    "twitter.com",
    "x.com",
    "facebook.com",
    "instagram.com",
    "tiktok.com",
    "reddit.com",
    "pinterest.com",
    "quora.com",
];

const RESEARCH_TERMS: &[&str] = &[
    "study",
    "research",
    "journal",
    "peer-reviewed",
    "published",
    "university",
    "dataset",
    "methodology",
];

/// Content length above which a source counts as substantial.
const SUBSTANTIAL_CONTENT_CHARS: usize = 500;

/// Heuristic verifier scoring the domain, the scheme and the content.
#[derive(Debug, Clone, Default)]
pub struct DomainReputationVerifier;

impl DomainReputationVerifier {
    pub fn new() -> Self {
        Self
    }

    /// Credibility score in percentage points, clamped to `0..=100`.
    pub fn score(&self, source: &SourceRecord) -> Result<u32, VerifierError> {
        let parsed = url::Url::parse(&source.original_url)
            .map_err(|e| VerifierError(format!("{}: {}", source.original_url, e)))?;
        let host = parsed
            .host_str()
            .ok_or_else(|| VerifierError(format!("{}: no host", source.original_url)))?
            .to_lowercase();

        let mut score: i32 = 50;

        if is_trusted(&host) {
            score += 30;
        }
        if source.content().chars().count() > SUBSTANTIAL_CONTENT_CHARS {
            score += 10;
        }
        let text = format!("{} {}", source.title, source.content()).to_lowercase();
        if RESEARCH_TERMS.iter().any(|term| text.contains(term)) {
            score += 10;
        }
        if matches_domain(&host, SOCIAL_DOMAINS) {
            score -= 15;
        }
        if parsed.scheme() == "http" {
            score -= 5;
        }

        Ok(score.clamp(0, 100) as u32)
    }
}

impl SourceVerifier for DomainReputationVerifier {
    fn assess(&self, source: &SourceRecord) -> Result<CredibilityTier, VerifierError> {
        let score = self.score(source)?;
        let tier = if score >= 80 {
            CredibilityTier::High
        } else if score >= 60 {
            CredibilityTier::Medium
        } else {
            CredibilityTier::Low
        };
        debug!("{} scored {} ({})", source.url, score, tier);
        Ok(tier)
    }
}

fn is_trusted(host: &str) -> bool {
    TRUSTED_SUFFIXES.iter().any(|suffix| host.ends_with(suffix))
        || matches_domain(host, TRUSTED_DOMAINS)
}

/// True when `host` is one of `domains` or a subdomain of one.
fn matches_domain(host: &str, domains: &[&str]) -> bool {
    domains
        .iter()
        .any(|d| host == *d || host.ends_with(&format!(".{}", d)))
}

/// Assess every source in the store. Returns how many could not be assessed.
pub fn verify_sources(verifier: &dyn SourceVerifier, store: &mut SourceStore) -> usize {
    let assessments: Vec<_> = store
        .records()
        .iter()
        .map(|source| verifier.assess(source))
        .collect();

    let mut failures = 0;
    for (position, assessment) in assessments.into_iter().enumerate() {
        match assessment {
            Ok(tier) => store.set_tier(position, tier),
            Err(e) => {
                warn!("Could not verify source: {}", e);
                store.set_tier(position, CredibilityTier::Unverified);
                failures += 1;
            }
        }
    }
    failures
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(url: &str, title: &str, content: &str) -> SourceRecord {
        SourceRecord {
            url: url.to_lowercase(),
            original_url: url.to_string(),
            title: title.to_string(),
            snippet: content.to_string(),
            full_content: None,
            fetched_at_loop: 1,
            credibility_tier: CredibilityTier::Unverified,
        }
    }

    #[test]
    fn test_trusted_research_source_is_high() {
        let verifier = DomainReputationVerifier::new();
        let s = source(
            "https://energy.mit.edu/paper",
            "Peer-reviewed study of cell efficiency",
            &"x".repeat(600),
        );
        assert_eq!(verifier.assess(&s).unwrap(), CredibilityTier::High);
    }

    #[test]
    fn test_subdomain_of_trusted_domain() {
        let verifier = DomainReputationVerifier::new();
        let s = source("https://en.wikipedia.org/wiki/Solar", "Solar", "short");
        assert_eq!(verifier.assess(&s).unwrap(), CredibilityTier::High);
        assert!(!matches_domain("notwikipedia.org", TRUSTED_DOMAINS));
    }

    #[test]
    fn test_plain_blog_is_medium_or_low() {
        let verifier = DomainReputationVerifier::new();
        let research_blog = source("https://blog.example.com", "Our research", "short");
        assert_eq!(verifier.assess(&research_blog).unwrap(), CredibilityTier::Medium);

        let plain = source("http://blog.example.com", "Thoughts", "short");
        assert_eq!(verifier.assess(&plain).unwrap(), CredibilityTier::Low);
    }

    #[test]
    fn test_social_media_is_low() {
        let verifier = DomainReputationVerifier::new();
        let s = source("https://www.reddit.com/r/solar", "Panels?", "short");
        assert_eq!(verifier.assess(&s).unwrap(), CredibilityTier::Low);
    }

    #[test]
    fn test_unparseable_url_is_error() {
        let verifier = DomainReputationVerifier::new();
        let s = source("not a url", "x", "y");
        assert!(verifier.assess(&s).is_err());
    }

    #[test]
    fn test_verify_sources_counts_failures() {
        let mut store = SourceStore::new();
        store.merge(vec![
            source("https://nasa.gov/a", "A", "study"),
            source("garbage", "B", "b"),
        ]);

        let failures = verify_sources(&DomainReputationVerifier::new(), &mut store);

        assert_eq!(failures, 1);
        assert_eq!(store.records()[0].credibility_tier, CredibilityTier::High);
        assert_eq!(store.records()[1].credibility_tier, CredibilityTier::Unverified);
    }
}
