//! Feed item repository for newswire.

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use tracing::error;

use crate::db::DbPool;
use crate::feed::types::{FeedItem, NewFeedItem};
use crate::{NewswireError, Result};

/// Row type for a feed item from the database.
#[derive(Debug, Clone, sqlx::FromRow)]
struct FeedItemRow {
    id: i64,
    source: String,
    external_id: String,
    title: String,
    link: String,
    summary: Option<String>,
    author: Option<String>,
    categories: String,
    published_at: String,
    fetched_at: String,
    revision: i64,
}

impl From<FeedItemRow> for FeedItem {
    fn from(row: FeedItemRow) -> Self {
        FeedItem {
            id: row.id,
            source: row.source,
            external_id: row.external_id,
            title: row.title,
            link: row.link,
            summary: row.summary,
            author: row.author,
            categories: serde_json::from_str(&row.categories).unwrap_or_default(),
            published_at: parse_datetime(&row.published_at).unwrap_or_else(Utc::now),
            fetched_at: parse_datetime(&row.fetched_at).unwrap_or_else(Utc::now),
            revision: row.revision,
        }
    }
}

/// Repository for feed item persistence.
///
/// The atomic upsert-on-conflict here is the only synchronization point
/// between concurrent fetch cycles and the retention sweep.
pub struct FeedItemRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> FeedItemRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Upsert one item keyed by `(source, external_id)`.
    ///
    /// Inserts if absent; otherwise updates the mutable fields (title,
    /// link, summary, author, categories) and refreshes `fetched_at`,
    /// bumping `revision`. The returned row's `revision` is 0 exactly
    /// when this call inserted it.
    pub async fn upsert(&self, item: &NewFeedItem) -> Result<FeedItem> {
        let categories = serde_json::to_string(&item.categories)
            .map_err(|e| NewswireError::Database(format!("categories encode: {e}")))?;
        let fetched_at = fmt_datetime(Utc::now());

        let row = sqlx::query_as::<_, FeedItemRow>(
            r#"
            INSERT INTO feed_items
                (source, external_id, title, link, summary, author, categories, published_at, fetched_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (source, external_id) DO UPDATE SET
                title = excluded.title,
                link = excluded.link,
                summary = excluded.summary,
                author = excluded.author,
                categories = excluded.categories,
                fetched_at = excluded.fetched_at,
                revision = feed_items.revision + 1
            RETURNING id, source, external_id, title, link, summary, author, categories,
                      published_at, fetched_at, revision
            "#,
        )
        .bind(&item.source)
        .bind(&item.external_id)
        .bind(&item.title)
        .bind(&item.link)
        .bind(&item.summary)
        .bind(&item.author)
        .bind(&categories)
        .bind(fmt_datetime(item.published_at))
        .bind(&fetched_at)
        .fetch_one(self.pool)
        .await
        .map_err(|e| NewswireError::Database(e.to_string()))?;

        Ok(FeedItem::from(row))
    }

    /// Upsert a batch, returning only the rows that were first-time inserts.
    ///
    /// A store failure on one item is logged and skips that item only;
    /// the rest of the batch is still persisted. Returned order follows
    /// batch order.
    pub async fn upsert_batch(&self, items: &[NewFeedItem]) -> Result<Vec<FeedItem>> {
        let mut inserted = Vec::new();
        for item in items {
            match self.upsert(item).await {
                Ok(row) => {
                    if row.is_newly_inserted() {
                        inserted.push(row);
                    }
                }
                Err(e) => {
                    error!(
                        "Failed to store item {}/{}: {}",
                        item.source, item.external_id, e
                    );
                }
            }
        }
        Ok(inserted)
    }

    /// Get an item by identity.
    pub async fn get_by_identity(
        &self,
        source: &str,
        external_id: &str,
    ) -> Result<Option<FeedItem>> {
        let row = sqlx::query_as::<_, FeedItemRow>(
            r#"
            SELECT id, source, external_id, title, link, summary, author, categories,
                   published_at, fetched_at, revision
            FROM feed_items
            WHERE source = $1 AND external_id = $2
            "#,
        )
        .bind(source)
        .bind(external_id)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| NewswireError::Database(e.to_string()))?;

        Ok(row.map(FeedItem::from))
    }

    /// List items by recency, optionally filtered to one source.
    ///
    /// Ordered by `published_at` descending, ties broken by `fetched_at`
    /// descending.
    pub async fn list_recent(&self, source: Option<&str>, limit: usize) -> Result<Vec<FeedItem>> {
        let rows = match source {
            Some(source) => {
                sqlx::query_as::<_, FeedItemRow>(
                    r#"
                    SELECT id, source, external_id, title, link, summary, author, categories,
                           published_at, fetched_at, revision
                    FROM feed_items
                    WHERE source = $1
                    ORDER BY published_at DESC, fetched_at DESC, id DESC
                    LIMIT $2
                    "#,
                )
                .bind(source)
                .bind(limit as i64)
                .fetch_all(self.pool)
                .await
            }
            None => {
                sqlx::query_as::<_, FeedItemRow>(
                    r#"
                    SELECT id, source, external_id, title, link, summary, author, categories,
                           published_at, fetched_at, revision
                    FROM feed_items
                    ORDER BY published_at DESC, fetched_at DESC, id DESC
                    LIMIT $1
                    "#,
                )
                .bind(limit as i64)
                .fetch_all(self.pool)
                .await
            }
        }
        .map_err(|e| NewswireError::Database(e.to_string()))?;

        Ok(rows.into_iter().map(FeedItem::from).collect())
    }

    /// Count all items.
    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM feed_items")
            .fetch_one(self.pool)
            .await
            .map_err(|e| NewswireError::Database(e.to_string()))?;

        Ok(count)
    }

    /// Delete items whose `fetched_at` is older than the horizon.
    pub async fn purge_older_than(&self, horizon: Duration) -> Result<u64> {
        let cutoff = fmt_datetime(Utc::now() - horizon);
        let result = sqlx::query("DELETE FROM feed_items WHERE fetched_at < $1")
            .bind(&cutoff)
            .execute(self.pool)
            .await
            .map_err(|e| NewswireError::Database(e.to_string()))?;

        Ok(result.rows_affected())
    }
}

/// Format a datetime for storage.
///
/// Fixed-width UTC so that lexicographic comparison in SQL matches
/// chronological order.
pub(crate) fn fmt_datetime(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a stored datetime string.
fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    // Try RFC3339 first
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // Try SQLite datetime format
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(DateTime::from_naive_utc_and_offset(naive, Utc));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::types::DEFAULT_LIST_LIMIT;
    use crate::Database;
    use chrono::TimeZone;

    async fn setup_db() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    fn item(source: &str, external_id: &str, title: &str) -> NewFeedItem {
        NewFeedItem::new(
            source,
            external_id,
            title,
            format!("https://example.com/{external_id}"),
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_upsert_inserts() {
        let db = setup_db().await;
        let repo = FeedItemRepository::new(db.pool());

        let stored = repo.upsert(&item("wires", "g1", "Headline")).await.unwrap();
        assert!(stored.id > 0);
        assert_eq!(stored.source, "wires");
        assert_eq!(stored.external_id, "g1");
        assert_eq!(stored.revision, 0);
        assert!(stored.is_newly_inserted());
    }

    #[tokio::test]
    async fn test_upsert_twice_keeps_one_row() {
        let db = setup_db().await;
        let repo = FeedItemRepository::new(db.pool());

        let first = repo.upsert(&item("wires", "g1", "Headline")).await.unwrap();
        let second = repo.upsert(&item("wires", "g1", "Headline")).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.revision, 1);
        assert!(!second.is_newly_inserted());
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_upsert_updates_mutable_fields() {
        let db = setup_db().await;
        let repo = FeedItemRepository::new(db.pool());

        repo.upsert(&item("wires", "g1", "Old Title")).await.unwrap();

        let changed = item("wires", "g1", "New Title")
            .with_summary("fresh summary")
            .with_categories(vec!["markets".to_string()]);
        let updated = repo.upsert(&changed).await.unwrap();

        assert_eq!(updated.title, "New Title");
        assert_eq!(updated.summary, Some("fresh summary".to_string()));
        assert_eq!(updated.categories, vec!["markets"]);
        assert!(!updated.is_newly_inserted());
    }

    #[tokio::test]
    async fn test_upsert_preserves_published_at() {
        let db = setup_db().await;
        let repo = FeedItemRepository::new(db.pool());

        let original = Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap();
        let mut first = item("wires", "g1", "Headline");
        first.published_at = original;
        repo.upsert(&first).await.unwrap();

        let mut replay = item("wires", "g1", "Headline");
        replay.published_at = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let updated = repo.upsert(&replay).await.unwrap();

        assert_eq!(updated.published_at, original);
    }

    #[tokio::test]
    async fn test_upsert_refreshes_fetched_at() {
        let db = setup_db().await;
        let repo = FeedItemRepository::new(db.pool());

        let first = repo.upsert(&item("wires", "g1", "Headline")).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let second = repo.upsert(&item("wires", "g1", "Headline")).await.unwrap();

        assert!(second.fetched_at >= first.fetched_at);
    }

    #[tokio::test]
    async fn test_same_external_id_different_sources() {
        let db = setup_db().await;
        let repo = FeedItemRepository::new(db.pool());

        repo.upsert(&item("wires", "g1", "A")).await.unwrap();
        repo.upsert(&item("marketwatch-top", "g1", "B")).await.unwrap();

        assert_eq!(repo.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_upsert_batch_reports_inserts_only() {
        let db = setup_db().await;
        let repo = FeedItemRepository::new(db.pool());

        // Seed one existing row
        repo.upsert(&item("wires", "g1", "Existing")).await.unwrap();

        let batch = vec![
            item("wires", "g1", "Existing"),
            item("wires", "g2", "Fresh"),
            item("wires", "g3", "Also Fresh"),
        ];
        let inserted = repo.upsert_batch(&batch).await.unwrap();

        let ids: Vec<&str> = inserted.iter().map(|i| i.external_id.as_str()).collect();
        assert_eq!(ids, vec!["g2", "g3"]);
        assert_eq!(repo.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_upsert_batch_idempotent() {
        let db = setup_db().await;
        let repo = FeedItemRepository::new(db.pool());

        let batch = vec![item("wires", "g1", "A"), item("wires", "g2", "B")];

        let first = repo.upsert_batch(&batch).await.unwrap();
        assert_eq!(first.len(), 2);

        let second = repo.upsert_batch(&batch).await.unwrap();
        assert!(second.is_empty());
        assert_eq!(repo.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_get_by_identity() {
        let db = setup_db().await;
        let repo = FeedItemRepository::new(db.pool());

        repo.upsert(&item("wires", "g1", "Headline")).await.unwrap();

        let found = repo.get_by_identity("wires", "g1").await.unwrap();
        assert!(found.is_some());
        assert_eq!(found.unwrap().title, "Headline");

        let missing = repo.get_by_identity("wires", "nope").await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_list_recent_orders_by_published_desc() {
        let db = setup_db().await;
        let repo = FeedItemRepository::new(db.pool());

        for (id, hour) in [("g1", 9), ("g2", 11), ("g3", 10)] {
            let mut it = item("wires", id, id);
            it.published_at = Utc.with_ymd_and_hms(2025, 1, 1, hour, 0, 0).unwrap();
            repo.upsert(&it).await.unwrap();
        }

        let items = repo.list_recent(None, DEFAULT_LIST_LIMIT).await.unwrap();
        let ids: Vec<&str> = items.iter().map(|i| i.external_id.as_str()).collect();
        assert_eq!(ids, vec!["g2", "g3", "g1"]);
    }

    #[tokio::test]
    async fn test_list_recent_filters_by_source() {
        let db = setup_db().await;
        let repo = FeedItemRepository::new(db.pool());

        repo.upsert(&item("wires", "g1", "A")).await.unwrap();
        repo.upsert(&item("marketwatch-top", "m1", "B")).await.unwrap();

        let items = repo
            .list_recent(Some("wires"), DEFAULT_LIST_LIMIT)
            .await
            .unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].source, "wires");
    }

    #[tokio::test]
    async fn test_list_recent_respects_limit() {
        let db = setup_db().await;
        let repo = FeedItemRepository::new(db.pool());

        for i in 0..10 {
            repo.upsert(&item("wires", &format!("g{i}"), "x")).await.unwrap();
        }

        let items = repo.list_recent(None, 3).await.unwrap();
        assert_eq!(items.len(), 3);
    }

    #[tokio::test]
    async fn test_list_recent_ties_broken_by_fetched_at() {
        let db = setup_db().await;
        let repo = FeedItemRepository::new(db.pool());

        let published = Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0).unwrap();
        for id in ["g1", "g2"] {
            let mut it = item("wires", id, id);
            it.published_at = published;
            repo.upsert(&it).await.unwrap();
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }

        let items = repo.list_recent(None, DEFAULT_LIST_LIMIT).await.unwrap();
        // g2 was fetched later, so it wins the tie
        assert_eq!(items[0].external_id, "g2");
        assert_eq!(items[1].external_id, "g1");
    }

    #[tokio::test]
    async fn test_purge_older_than() {
        let db = setup_db().await;
        let repo = FeedItemRepository::new(db.pool());

        repo.upsert(&item("wires", "old", "Old")).await.unwrap();

        // Backdate the stored row beyond the horizon
        sqlx::query("UPDATE feed_items SET fetched_at = $1 WHERE external_id = 'old'")
            .bind(fmt_datetime(Utc::now() - Duration::days(40)))
            .execute(db.pool())
            .await
            .unwrap();

        repo.upsert(&item("wires", "fresh", "Fresh")).await.unwrap();

        let purged = repo.purge_older_than(Duration::days(30)).await.unwrap();
        assert_eq!(purged, 1);

        let remaining = repo.list_recent(None, DEFAULT_LIST_LIMIT).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].external_id, "fresh");
    }

    #[test]
    fn test_fmt_datetime_fixed_width() {
        let dt = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(fmt_datetime(dt), "2025-01-01T00:00:00.000000Z");
    }

    #[test]
    fn test_parse_datetime_roundtrip() {
        let dt = Utc.with_ymd_and_hms(2025, 3, 4, 5, 6, 7).unwrap();
        assert_eq!(parse_datetime(&fmt_datetime(dt)), Some(dt));
    }

    #[test]
    fn test_parse_datetime_sqlite_format() {
        let parsed = parse_datetime("2025-01-01 12:30:00").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2025, 1, 1, 12, 30, 0).unwrap());
    }

    #[test]
    fn test_parse_datetime_invalid() {
        assert!(parse_datetime("not a date").is_none());
    }
}
