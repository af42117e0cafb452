//! Ingestion scheduling for newswire.
//!
//! A fixed-period timer fans out one fetch task per configured source.
//! Per-source mutual exclusion lives in the coordinator so that the
//! scheduled cycle and the on-demand refresh endpoint can never run
//! concurrently against the same source.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::SourceConfig;
use crate::db::Database;
use crate::feed::fetcher::FeedFetcher;
use crate::feed::outbox::Outbox;
use crate::feed::repository::FeedItemRepository;
use crate::feed::types::NewFeedItem;
use crate::Result;

/// Default fetch cycle period in seconds (10 minutes).
pub const DEFAULT_CYCLE_INTERVAL_SECS: u64 = 600;

/// Outcome of one ingestion attempt for a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// The cycle ran; counts cover this batch.
    Completed {
        /// Rows newly inserted (and therefore broadcast).
        inserted: usize,
        /// Entries in the normalized batch.
        total: usize,
    },
    /// A cycle for this source was already running.
    Skipped,
}

/// Coordinates fetch cycles across sources.
///
/// Owns the per-source locks; both the scheduler and the refresh
/// endpoint go through [`IngestCoordinator::ingest_source`].
pub struct IngestCoordinator {
    db: Arc<Database>,
    fetcher: FeedFetcher,
    outbox: Outbox,
    sources: Vec<SourceConfig>,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl IngestCoordinator {
    /// Create a new coordinator.
    pub fn new(
        db: Arc<Database>,
        fetcher: FeedFetcher,
        outbox: Outbox,
        sources: Vec<SourceConfig>,
    ) -> Self {
        Self {
            db,
            fetcher,
            outbox,
            sources,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// All configured sources.
    pub fn sources(&self) -> &[SourceConfig] {
        &self.sources
    }

    /// Look up a configured source by name.
    pub fn source(&self, name: &str) -> Option<&SourceConfig> {
        self.sources.iter().find(|s| s.name == name)
    }

    /// Get the lock guarding one source's fetch cycle.
    pub async fn source_lock(&self, name: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Run one fetch cycle for a source.
    ///
    /// Skips without fetching when a cycle for the same source is still
    /// running. Items upserted before a mid-cycle failure stay persisted.
    pub async fn ingest_source(&self, source: &SourceConfig) -> Result<IngestOutcome> {
        let lock = self.source_lock(&source.name).await;
        let _guard = match lock.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                debug!("Skipping {}: previous cycle still running", source.name);
                return Ok(IngestOutcome::Skipped);
            }
        };

        let batch = self.fetcher.fetch(&source.name, &source.url).await?;
        self.store_and_publish(&source.name, batch).await
    }

    /// Store a normalized batch and enqueue newly-inserted rows for push.
    ///
    /// Only first-time inserts reach the outbound queue; updated rows are
    /// persisted silently.
    pub async fn store_and_publish(
        &self,
        source_name: &str,
        batch: Vec<NewFeedItem>,
    ) -> Result<IngestOutcome> {
        let total = batch.len();
        let repo = FeedItemRepository::new(self.db.pool());
        let inserted = repo.upsert_batch(&batch).await?;
        let inserted_count = inserted.len();

        for item in inserted {
            self.outbox.push(item).await;
        }

        if inserted_count > 0 {
            info!(
                "Ingested {}: {} new of {} entries",
                source_name, inserted_count, total
            );
        } else {
            debug!("Ingested {}: no new entries of {}", source_name, total);
        }

        Ok(IngestOutcome::Completed {
            inserted: inserted_count,
            total,
        })
    }
}

/// Timer-driven ingestion scheduler.
pub struct IngestScheduler {
    coordinator: Arc<IngestCoordinator>,
    period: Duration,
}

impl IngestScheduler {
    /// Create a scheduler with the given cycle period.
    pub fn new(coordinator: Arc<IngestCoordinator>, period: Duration) -> Self {
        Self {
            coordinator,
            period,
        }
    }

    /// Run the scheduler loop.
    ///
    /// The first cycle starts immediately; subsequent cycles follow the
    /// configured period.
    pub async fn run(&self) {
        info!(
            "Ingestion scheduler started ({} source(s), period {}s)",
            self.coordinator.sources().len(),
            self.period.as_secs()
        );

        let mut timer = interval(self.period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            timer.tick().await;
            self.run_cycle();
        }
    }

    /// Fan out one fetch task per source.
    ///
    /// Tasks are detached so a slow source never delays the others; the
    /// per-source lock prevents overlap with the next tick.
    fn run_cycle(&self) {
        for source in self.coordinator.sources().iter().cloned() {
            let coordinator = self.coordinator.clone();
            tokio::spawn(async move {
                match coordinator.ingest_source(&source).await {
                    Ok(IngestOutcome::Completed { .. }) => {}
                    Ok(IngestOutcome::Skipped) => {
                        warn!(
                            "Cycle for {} skipped: previous fetch still in flight",
                            source.name
                        );
                    }
                    Err(e) => {
                        // Retried on the next tick
                        warn!("Fetch cycle for {} failed: {}", source.name, e);
                    }
                }
            });
        }
    }
}
