//! Client-side reconciliation for newswire.
//!
//! Merges a poll snapshot with a stream of broadcast pushes into one
//! bounded, deduplicated, display-ready list. Pure state: no shared
//! mutable state with the server, so it is equally usable from a native
//! client or a test harness.

use crate::feed::types::FeedItem;

/// Default maximum number of entries a live list holds.
pub const DEFAULT_LIST_CAP: usize = 50;

/// How often a client should re-poll while its live connection is down,
/// in seconds.
pub const FALLBACK_POLL_INTERVAL_SECS: u64 = 60;

/// One display entry: the item plus its transient "new" highlight flag.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayItem {
    /// The item.
    pub item: FeedItem,
    /// Set when the item arrived via push and has not been seen yet.
    pub is_new: bool,
}

/// A bounded, deduplicated live view over one stream of items.
///
/// Load a poll snapshot first, then apply pushes as they arrive. After a
/// connection drop, load the next poll result with [`LiveList::load_snapshot`];
/// that clears every stale "new" flag, so reconciling resumed pushes
/// cannot resurrect them.
#[derive(Debug)]
pub struct LiveList {
    cap: usize,
    entries: Vec<DisplayItem>,
}

impl LiveList {
    /// Create a list with the default cap.
    pub fn new() -> Self {
        Self::with_cap(DEFAULT_LIST_CAP)
    }

    /// Create a list with an explicit cap.
    pub fn with_cap(cap: usize) -> Self {
        Self {
            cap,
            entries: Vec::new(),
        }
    }

    /// Replace the list with a poll snapshot.
    ///
    /// The snapshot is already deduplicated and ordered by the store;
    /// it is truncated to the cap and carries no "new" flags.
    pub fn load_snapshot(&mut self, items: Vec<FeedItem>) {
        self.entries = items
            .into_iter()
            .take(self.cap)
            .map(|item| DisplayItem {
                item,
                is_new: false,
            })
            .collect();
    }

    /// Apply one pushed item.
    ///
    /// An unseen identity is prepended, flagged "new", and the list is
    /// truncated to the cap. A push for a present identity carries no
    /// new information and is ignored. Returns whether the list changed.
    pub fn apply_push(&mut self, item: FeedItem) -> bool {
        if self.contains(&item.source, &item.external_id) {
            return false;
        }
        self.entries.insert(
            0,
            DisplayItem {
                item,
                is_new: true,
            },
        );
        self.entries.truncate(self.cap);
        true
    }

    /// Clear every "new" flag (e.g. once the user has seen the list).
    pub fn mark_seen(&mut self) {
        for entry in &mut self.entries {
            entry.is_new = false;
        }
    }

    /// Whether an identity is present.
    pub fn contains(&self, source: &str, external_id: &str) -> bool {
        self.entries
            .iter()
            .any(|e| e.item.source == source && e.item.external_id == external_id)
    }

    /// Current entries, newest first.
    pub fn entries(&self) -> &[DisplayItem] {
        &self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the list is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for LiveList {
    fn default() -> Self {
        Self::new()
    }
}
