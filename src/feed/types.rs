//! Feed item types for newswire.

use chrono::{DateTime, Utc};

/// Maximum length for an item summary.
pub const MAX_SUMMARY_LENGTH: usize = 10000;

/// Default number of items returned by a recency listing.
pub const DEFAULT_LIST_LIMIT: usize = 100;

/// Hard cap on the number of items a recency listing may return.
pub const MAX_LIST_LIMIT: usize = 500;

/// The canonical ingested record.
///
/// Identity is the `(source, external_id)` pair; re-ingesting the same
/// external document updates the existing row in place.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedItem {
    /// Row ID.
    pub id: i64,
    /// Identifier of the originating feed source.
    pub source: String,
    /// The source's own identifier for the item (guid, else the link).
    pub external_id: String,
    /// Item title.
    pub title: String,
    /// Link to the original article.
    pub link: String,
    /// Short text excerpt (HTML tags stripped).
    pub summary: Option<String>,
    /// Author attribution.
    pub author: Option<String>,
    /// Ordered category labels.
    pub categories: Vec<String>,
    /// When the item was published; ingestion time if the source omits it.
    pub published_at: DateTime<Utc>,
    /// When the item was last ingested. Server-assigned, refreshed on upsert.
    pub fetched_at: DateTime<Utc>,
    /// Upsert conflict counter; 0 means the row has only ever been inserted.
    pub revision: i64,
}

impl FeedItem {
    /// Whether this row was a first-time insert for the upsert that returned it.
    pub fn is_newly_inserted(&self) -> bool {
        self.revision == 0
    }
}

/// A normalized item ready for storage.
#[derive(Debug, Clone, PartialEq)]
pub struct NewFeedItem {
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
    /// Publication timestamp.
    pub published_at: DateTime<Utc>,
}

impl NewFeedItem {
    /// Create a new item.
    pub fn new(
        source: impl Into<String>,
        external_id: impl Into<String>,
        title: impl Into<String>,
        link: impl Into<String>,
        published_at: DateTime<Utc>,
    ) -> Self {
        Self {
            source: source.into(),
            external_id: external_id.into(),
            title: title.into(),
            link: link.into(),
            summary: None,
            author: None,
            categories: Vec::new(),
            published_at,
        }
    }

    /// Set the summary.
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        let summary = summary.into();
        // Truncate if too long
        if summary.len() > MAX_SUMMARY_LENGTH {
            self.summary = Some(summary.chars().take(MAX_SUMMARY_LENGTH).collect());
        } else {
            self.summary = Some(summary);
        }
        self
    }

    /// Set the author.
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    /// Set the category labels.
    pub fn with_categories(mut self, categories: Vec<String>) -> Self {
        self.categories = categories;
        self
    }
}
