//! Web API handlers for newswire.

mod items;
mod refresh;

pub use items::list_items;
pub use refresh::refresh_source;

use std::sync::Arc;

use crate::db::Database;
use crate::feed::hub::ChannelHub;
use crate::feed::scheduler::IngestCoordinator;

/// Shared application state for the web layer.
pub struct AppState {
    /// Database handle.
    pub db: Arc<Database>,
    /// Broadcast hub for live channels.
    pub hub: Arc<ChannelHub>,
    /// Ingestion coordinator (per-source locks live here).
    pub coordinator: Arc<IngestCoordinator>,
    /// Operator token for privileged endpoints; None disables them.
    pub operator_token: Option<String>,
}

impl AppState {
    /// Create a new application state.
    pub fn new(
        db: Arc<Database>,
        hub: Arc<ChannelHub>,
        coordinator: Arc<IngestCoordinator>,
        operator_token: Option<String>,
    ) -> Self {
        Self {
            db,
            hub,
            coordinator,
            operator_token,
        }
    }
}
