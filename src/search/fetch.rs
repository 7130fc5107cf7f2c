//! Full-page retrieval.

use super::{http_client, PageFetcher};
use crate::error::FetchError;
use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// Line width used when flattening HTML to text.
const TEXT_WIDTH: usize = 100;

/// Fetches pages over HTTP and flattens HTML into plain text.
pub struct HttpPageFetcher {
    http_client: reqwest::Client,
    timeout: Duration,
}

impl HttpPageFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        Ok(Self {
            http_client: http_client(timeout)?,
            timeout,
        })
    }
}

/// Convert an HTML document to readable text.
pub fn html_to_text(html: &str) -> String {
    html2text::from_read(html.as_bytes(), TEXT_WIDTH)
        .trim()
        .to_string()
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        debug!("Fetching full page: {}", url);

        let response = self.http_client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout(self.timeout.as_secs())
            } else {
                FetchError::Http(e.to_string())
            }
        })?;

        if !response.status().is_success() {
            return Err(FetchError::Http(format!("{} returned {}", url, response.status())));
        }

        let is_html = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.contains("html"))
            .unwrap_or(true);

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::Http(e.to_string()))?;

        let text = if is_html {
            html_to_text(&body)
        } else {
            body.trim().to_string()
        };

        if text.is_empty() {
            return Err(FetchError::Empty);
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_to_text() {
        let html = "<html><body><h1>Solar</h1><p>Panels convert <b>light</b>.</p>\
                    <script>var x = 1;</script></body></html>";
        let text = html_to_text(html);
        assert!(text.contains("Solar"));
        assert!(text.contains("Panels convert"));
        assert!(text.contains("light"));
    }
}
