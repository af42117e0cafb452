//! Feed ingestion and distribution module for newswire.
//!
//! Covers the full ingestion path: fetch, normalize, deduplicating
//! storage, scheduling, and realtime broadcast.

pub mod fetcher;
pub mod hub;
pub mod normalize;
pub mod outbox;
pub mod repository;
pub mod retention;
pub mod scheduler;
pub mod types;

pub use fetcher::{parse_and_normalize, validate_url, FeedFetcher};
pub use hub::{Channel, ChannelHub};
pub use normalize::{
    classify_categories, derive_external_id, normalize_categories, normalize_entry, RawCategories,
};
pub use outbox::{Outbox, DEFAULT_FLUSH_INTERVAL_MS, DEFAULT_FLUSH_THRESHOLD};
pub use repository::FeedItemRepository;
pub use retention::{RetentionSweeper, DEFAULT_SWEEP_INTERVAL_SECS};
pub use scheduler::{
    IngestCoordinator, IngestOutcome, IngestScheduler, DEFAULT_CYCLE_INTERVAL_SECS,
};
pub use types::{FeedItem, NewFeedItem, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT, MAX_SUMMARY_LENGTH};
