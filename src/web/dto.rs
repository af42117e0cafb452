//! Request and response DTOs for the newswire web layer.

use serde::{Deserialize, Serialize};

use crate::feed::types::FeedItem;

/// Generic API response wrapper.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a new API response.
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

/// Query parameters for the poll endpoint.
#[derive(Debug, Deserialize)]
pub struct ItemsQuery {
    /// Restrict to one source; all sources when omitted.
    pub source: Option<String>,
    /// Maximum number of items to return.
    pub limit: Option<usize>,
}

/// A feed item in API responses and live pushes.
#[derive(Debug, Clone, Serialize)]
pub struct FeedItemResponse {
    /// Source identifier.
    pub source: String,
    /// External identifier.
    pub external_id: String,
    /// Item title.
    pub title: String,
    /// Link to the original article.
    pub link: String,
    /// Short text excerpt.
    pub summary: Option<String>,
    /// Author attribution.
    pub author: Option<String>,
    /// Ordered category labels.
    pub categories: Vec<String>,
    /// ISO 8601 publication timestamp.
    pub published_at: String,
    /// ISO 8601 ingestion timestamp.
    pub fetched_at: String,
}

impl From<FeedItem> for FeedItemResponse {
    fn from(item: FeedItem) -> Self {
        Self {
            source: item.source,
            external_id: item.external_id,
            title: item.title,
            link: item.link,
            summary: item.summary,
            author: item.author,
            categories: item.categories,
            published_at: item.published_at.to_rfc3339(),
            fetched_at: item.fetched_at.to_rfc3339(),
        }
    }
}

/// Response for the on-demand refresh endpoint.
#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    /// Source that was refreshed.
    pub source: String,
    /// Number of newly inserted items.
    pub inserted: usize,
}
