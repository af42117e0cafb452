//! Retention sweep for newswire.
//!
//! A background task that periodically deletes items whose `fetched_at`
//! is older than the configured horizon. The store's atomic upsert keeps
//! the sweep safe against concurrent re-ingestion of the same key.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::db::Database;
use crate::feed::repository::FeedItemRepository;

/// Default sweep period in seconds (1 hour).
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 3600;

/// Background retention sweeper.
pub struct RetentionSweeper {
    db: Arc<Database>,
    horizon_days: i64,
    period: Duration,
}

impl RetentionSweeper {
    /// Create a sweeper with the given horizon and sweep period.
    pub fn new(db: Arc<Database>, horizon_days: i64, period: Duration) -> Self {
        Self {
            db,
            horizon_days,
            period,
        }
    }

    /// Run the sweep loop.
    pub async fn run(&self) {
        info!(
            "Retention sweeper started (horizon {} day(s), period {}s)",
            self.horizon_days,
            self.period.as_secs()
        );

        let mut timer = interval(self.period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            timer.tick().await;
            self.sweep_once().await;
        }
    }

    /// Run one sweep.
    async fn sweep_once(&self) {
        let repo = FeedItemRepository::new(self.db.pool());
        match repo
            .purge_older_than(chrono::Duration::days(self.horizon_days))
            .await
        {
            Ok(0) => debug!("Retention sweep: nothing to purge"),
            Ok(purged) => info!("Retention sweep purged {} item(s)", purged),
            Err(e) => error!("Retention sweep failed: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::repository::fmt_datetime;
    use crate::feed::types::NewFeedItem;
    use chrono::Utc;

    #[tokio::test]
    async fn test_sweep_once_purges_expired() {
        let db = Arc::new(Database::open_in_memory().await.unwrap());
        let repo = FeedItemRepository::new(db.pool());

        let item = NewFeedItem::new("wires", "old", "Old", "https://example.com/old", Utc::now());
        repo.upsert(&item).await.unwrap();
        sqlx::query("UPDATE feed_items SET fetched_at = $1")
            .bind(fmt_datetime(Utc::now() - chrono::Duration::days(10)))
            .execute(db.pool())
            .await
            .unwrap();

        let sweeper = RetentionSweeper::new(db.clone(), 7, Duration::from_secs(3600));
        sweeper.sweep_once().await;

        assert_eq!(repo.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_sweep_once_keeps_fresh() {
        let db = Arc::new(Database::open_in_memory().await.unwrap());
        let repo = FeedItemRepository::new(db.pool());

        let item =
            NewFeedItem::new("wires", "fresh", "Fresh", "https://example.com/f", Utc::now());
        repo.upsert(&item).await.unwrap();

        let sweeper = RetentionSweeper::new(db.clone(), 7, Duration::from_secs(3600));
        sweeper.sweep_once().await;

        assert_eq!(repo.count().await.unwrap(), 1);
    }
}
