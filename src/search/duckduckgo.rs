//! DuckDuckGo search over the HTML endpoint.
//!
//! No API key is needed. Result links point at a DuckDuckGo redirect whose
//! `uddg` parameter carries the real target URL.

use super::{http_client, map_transport_error, SearchClient, SearchHit};
use crate::error::SearchError;
use anyhow::{Context, Result};
use async_trait::async_trait;
use regex::Regex;
use std::time::Duration;
use tracing::{debug, warn};

const ENDPOINT: &str = "https://html.duckduckgo.com/html/";

pub struct DuckDuckGoClient {
    http_client: reqwest::Client,
    timeout: Duration,
    title_re: Regex,
    href_re: Regex,
    snippet_re: Regex,
    tag_re: Regex,
}

impl DuckDuckGoClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        Ok(Self {
            http_client: http_client(timeout)?,
            timeout,
            title_re: Regex::new(r#"(?s)<a([^>]*class="result__a"[^>]*)>(.*?)</a>"#)
                .context("Invalid title pattern")?,
            href_re: Regex::new(r#"href="([^"]+)""#).context("Invalid href pattern")?,
            snippet_re: Regex::new(r#"(?s)<a[^>]*class="result__snippet"[^>]*>(.*?)</a>"#)
                .context("Invalid snippet pattern")?,
            tag_re: Regex::new(r"<[^>]+>").context("Invalid tag pattern")?,
        })
    }

    /// Extract ranked hits from a results page.
    fn parse_results(&self, html: &str, limit: usize) -> Vec<SearchHit> {
        let titles: Vec<_> = self.title_re.captures_iter(html).collect();
        let mut hits = Vec::new();

        for (i, caps) in titles.iter().enumerate() {
            if hits.len() >= limit {
                break;
            }
            let (Some(whole), Some(attrs), Some(inner)) = (caps.get(0), caps.get(1), caps.get(2))
            else {
                continue;
            };

            let Some(url) = self
                .href_re
                .captures(attrs.as_str())
                .and_then(|c| c.get(1))
                .and_then(|href| resolve_redirect(&decode_entities(href.as_str())))
            else {
                continue;
            };

            // Sponsored results route through an ad tracker
            if url.contains("duckduckgo.com/y.js") {
                debug!("Skipping sponsored result");
                continue;
            }

            // The snippet belongs to this result if it appears before the next title
            let block_end = titles
                .get(i + 1)
                .and_then(|next| next.get(0))
                .map(|m| m.start())
                .unwrap_or(html.len());
            let snippet = self
                .snippet_re
                .captures(&html[whole.end()..block_end])
                .and_then(|c| c.get(1))
                .map(|m| self.plain_text(m.as_str()))
                .unwrap_or_default();

            hits.push(SearchHit {
                url,
                title: self.plain_text(inner.as_str()),
                snippet,
                content: None,
            });
        }

        hits
    }

    fn plain_text(&self, fragment: &str) -> String {
        let stripped = self.tag_re.replace_all(fragment, "");
        decode_entities(stripped.trim())
    }
}

/// Turn a DuckDuckGo redirect link into the target URL.
fn resolve_redirect(href: &str) -> Option<String> {
    let absolute = if href.starts_with("//") {
        format!("https:{}", href)
    } else {
        href.to_string()
    };

    let parsed = url::Url::parse(&absolute).ok()?;
    if parsed.host_str() == Some("duckduckgo.com") && parsed.path() == "/l/" {
        return parsed
            .query_pairs()
            .find(|(k, _)| k == "uddg")
            .map(|(_, v)| v.into_owned());
    }
    Some(absolute)
}

fn decode_entities(text: &str) -> String {
    text.replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

#[async_trait]
impl SearchClient for DuckDuckGoClient {
    async fn search(
        &self,
        query: &str,
        limit: usize,
        _fetch_full_page: bool,
    ) -> Result<Vec<SearchHit>, SearchError> {
        let response = self
            .http_client
            .get(ENDPOINT)
            .query(&[("q", query)])
            .send()
            .await
            .map_err(|e| map_transport_error(e, self.timeout))?;

        if !response.status().is_success() {
            return Err(SearchError::Transport(format!(
                "DuckDuckGo returned {}",
                response.status()
            )));
        }

        let html = response
            .text()
            .await
            .map_err(|e| SearchError::InvalidResponse(e.to_string()))?;

        let hits = self.parse_results(&html, limit);
        if hits.is_empty() {
            warn!("DuckDuckGo returned no parseable results for: {}", query);
        }
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESULTS_PAGE: &str = r#"
<div class="result results_links">
  <h2 class="result__title">
    <a rel="nofollow" class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fwww.nrel.gov%2Fpv%2Fcell-efficiency&amp;rut=abc">Best Research-Cell <b>Efficiency</b> Chart</a>
  </h2>
  <a class="result__snippet" href="x">NREL maintains a chart of the highest confirmed conversion efficiencies &amp; more.</a>
</div>
<div class="result results_links">
  <h2 class="result__title">
    <a rel="nofollow" class="result__a" href="https://duckduckgo.com/y.js?ad_provider=x">Sponsored</a>
  </h2>
</div>
<div class="result results_links">
  <h2 class="result__title">
    <a rel="nofollow" class="result__a" href="https://en.wikipedia.org/wiki/Solar_cell_efficiency">Solar-cell efficiency - Wikipedia</a>
  </h2>
</div>
"#;

    fn client() -> DuckDuckGoClient {
        DuckDuckGoClient::new(Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_parse_results() {
        let hits = client().parse_results(RESULTS_PAGE, 10);
        assert_eq!(hits.len(), 2);

        assert_eq!(hits[0].url, "https://www.nrel.gov/pv/cell-efficiency");
        assert_eq!(hits[0].title, "Best Research-Cell Efficiency Chart");
        assert!(hits[0].snippet.contains("conversion efficiencies & more"));

        assert_eq!(hits[1].url, "https://en.wikipedia.org/wiki/Solar_cell_efficiency");
        // No snippet markup before the end of the page
        assert!(hits[1].snippet.is_empty());
    }

    #[test]
    fn test_parse_results_respects_limit() {
        let hits = client().parse_results(RESULTS_PAGE, 1);
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn test_resolve_redirect() {
        assert_eq!(
            resolve_redirect("//duckduckgo.com/l/?uddg=https%3A%2F%2Fexample.com%2Fa").as_deref(),
            Some("https://example.com/a")
        );
        assert_eq!(
            resolve_redirect("https://example.com/b").as_deref(),
            Some("https://example.com/b")
        );
        assert_eq!(resolve_redirect("not a url"), None);
    }
}
