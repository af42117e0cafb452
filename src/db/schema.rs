//! Database schema and migrations for newswire.
//!
//! Migrations are applied sequentially when the database is opened.

/// Database migrations.
///
/// Each migration is a SQL script that will be executed in order.
/// The schema_version table tracks which migrations have been applied.
pub const MIGRATIONS: &[&str] = &[
    // v1: feed_items table
    r#"
-- Canonical ingested records, one row per (source, external_id)
CREATE TABLE feed_items (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    source       TEXT NOT NULL,
    external_id  TEXT NOT NULL,
    title        TEXT NOT NULL,
    link         TEXT NOT NULL,
    summary      TEXT,
    author       TEXT,
    categories   TEXT NOT NULL DEFAULT '[]',   -- JSON array of strings
    published_at TEXT NOT NULL,
    fetched_at   TEXT NOT NULL,
    revision     INTEGER NOT NULL DEFAULT 0,   -- upsert conflict counter
    UNIQUE (source, external_id)
);

CREATE INDEX idx_feed_items_source_published ON feed_items(source, published_at);
CREATE INDEX idx_feed_items_fetched ON feed_items(fetched_at);
"#,
];
