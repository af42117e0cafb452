//! newswire - multi-source news-feed ingestion and realtime distribution.
//!
//! Periodically pulls entries from configured syndication sources,
//! normalizes and deduplicates them into SQLite, and pushes newly
//! discovered items to live WebSocket sessions, with a poll endpoint
//! for everyone else.

pub mod config;
pub mod db;
pub mod error;
pub mod feed;
pub mod logging;
pub mod reconcile;
pub mod web;

pub use config::Config;
pub use db::Database;
pub use error::{NewswireError, Result};
