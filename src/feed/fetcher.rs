//! Feed fetching for newswire.
//!
//! Retrieves one source's feed document over HTTP with bounded timeouts
//! and size limits, parses it, and normalizes each entry independently.

use chrono::Utc;
use feed_rs::parser;
use reqwest::Client;
use std::time::Duration;
use tracing::warn;

use crate::config::IngestConfig;
use crate::error::NewswireError;
use crate::feed::normalize::normalize_entry;
use crate::feed::types::NewFeedItem;
use crate::Result;

/// User agent string for feed fetching.
const USER_AGENT: &str = "newswire/0.1 (feed ingester)";

/// Feed fetcher with a shared HTTP client.
pub struct FeedFetcher {
    client: Client,
    max_feed_size: u64,
}

impl FeedFetcher {
    /// Create a fetcher from ingestion configuration.
    pub fn new(config: &IngestConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.fetch_timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| NewswireError::Fetch(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            max_feed_size: config.max_feed_size_bytes,
        })
    }

    /// Fetch one source's document and return its normalized entries.
    ///
    /// Network and document-level failures are errors; a malformed entry
    /// inside an otherwise valid document is logged and skipped.
    pub async fn fetch(&self, source: &str, url: &str) -> Result<Vec<NewFeedItem>> {
        validate_url(url)?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| NewswireError::Fetch(format!("failed to fetch {source}: {e}")))?;

        if !response.status().is_success() {
            return Err(NewswireError::Fetch(format!(
                "HTTP error from {source}: {}",
                response.status()
            )));
        }

        if let Some(content_length) = response.content_length() {
            if content_length > self.max_feed_size {
                return Err(NewswireError::Fetch(format!(
                    "feed too large from {source}: {content_length} bytes (max {} bytes)",
                    self.max_feed_size
                )));
            }
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| NewswireError::Fetch(format!("failed to read response from {source}: {e}")))?;

        if bytes.len() as u64 > self.max_feed_size {
            return Err(NewswireError::Fetch(format!(
                "feed too large from {source}: {} bytes (max {} bytes)",
                bytes.len(),
                self.max_feed_size
            )));
        }

        parse_and_normalize(source, &bytes)
    }
}

/// Parse a feed document and normalize its entries.
///
/// Entry granularity isolation: a failing entry never discards the rest
/// of the batch. Batch order follows document order.
pub fn parse_and_normalize(source: &str, bytes: &[u8]) -> Result<Vec<NewFeedItem>> {
    let feed = parser::parse(bytes)
        .map_err(|e| NewswireError::Fetch(format!("failed to parse feed for {source}: {e}")))?;

    let now = Utc::now();
    let mut items = Vec::with_capacity(feed.entries.len());
    for entry in &feed.entries {
        match normalize_entry(source, entry, now) {
            Ok(item) => items.push(item),
            Err(e) => {
                warn!("Skipping malformed entry in {}: {}", source, e);
            }
        }
    }

    Ok(items)
}

/// Validate a configured source URL.
///
/// Only http and https schemes with a host are accepted. Sources are
/// operator-configured, so no further reachability checks happen here.
pub fn validate_url(url: &str) -> Result<()> {
    let parsed =
        url::Url::parse(url).map_err(|e| NewswireError::Fetch(format!("invalid URL: {e}")))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(NewswireError::Fetch(format!(
                "unsupported URL scheme: {scheme}"
            )));
        }
    }

    if parsed.host().is_none() {
        return Err(NewswireError::Fetch("URL has no host".to_string()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url_valid() {
        assert!(validate_url("https://example.com/feed.xml").is_ok());
        assert!(validate_url("http://example.com/feed.xml").is_ok());
    }

    #[test]
    fn test_validate_url_invalid_scheme() {
        let result = validate_url("ftp://example.com/feed.xml");
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("unsupported URL scheme"));
    }

    #[test]
    fn test_validate_url_not_a_url() {
        assert!(validate_url("not a url").is_err());
    }

    #[test]
    fn test_parse_and_normalize_rss() {
        let rss = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Test Feed</title>
    <item>
      <title>First Article</title>
      <link>https://example.com/1</link>
      <guid>g1</guid>
      <description>&lt;p&gt;Description&lt;/p&gt;</description>
    </item>
    <item>
      <title>Second Article</title>
      <link>https://example.com/2</link>
      <guid>g2</guid>
    </item>
  </channel>
</rss>"#;

        let items = parse_and_normalize("wires", rss.as_bytes()).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].external_id, "g1");
        assert_eq!(items[0].title, "First Article");
        assert_eq!(items[0].summary, Some("Description".to_string()));
        assert_eq!(items[1].external_id, "g2");
    }

    #[test]
    fn test_parse_and_normalize_atom() {
        let atom = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Atom Feed</title>
  <entry>
    <id>urn:uuid:1</id>
    <title>Atom Entry</title>
    <link href="https://example.com/entry"/>
    <summary>Entry summary</summary>
    <author><name>Author Name</name></author>
    <updated>2025-01-01T00:00:00Z</updated>
  </entry>
</feed>"#;

        let items = parse_and_normalize("wires", atom.as_bytes()).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].external_id, "urn:uuid:1");
        assert_eq!(items[0].author, Some("Author Name".to_string()));
    }

    #[test]
    fn test_parse_and_normalize_skips_malformed_entry() {
        // Middle entry has no link and is skipped; the rest survive
        let atom = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Atom Feed</title>
  <entry>
    <id>a1</id>
    <title>Good One</title>
    <link href="https://example.com/a1"/>
    <updated>2025-01-01T00:00:00Z</updated>
  </entry>
  <entry>
    <id>a2</id>
    <title>Broken, no link</title>
    <updated>2025-01-01T00:00:00Z</updated>
  </entry>
  <entry>
    <id>a3</id>
    <title>Good Two</title>
    <link href="https://example.com/a3"/>
    <updated>2025-01-01T00:00:00Z</updated>
  </entry>
</feed>"#;

        let items = parse_and_normalize("wires", atom.as_bytes()).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].external_id, "a1");
        assert_eq!(items[1].external_id, "a3");
    }

    #[test]
    fn test_parse_and_normalize_invalid_document() {
        assert!(parse_and_normalize("wires", b"This is not XML").is_err());
    }

    #[tokio::test]
    async fn test_fetch_rejects_bad_scheme_without_network() {
        let fetcher = FeedFetcher::new(&crate::config::IngestConfig::default()).unwrap();
        let result = fetcher.fetch("wires", "ftp://example.com/feed.xml").await;
        assert!(result.is_err());
    }
}
