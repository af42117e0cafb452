//! Poll endpoint handlers.

use axum::{
    extract::{Query, State},
    Json,
};
use std::sync::Arc;

use crate::feed::repository::FeedItemRepository;
use crate::feed::types::{DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT};
use crate::web::dto::{ApiResponse, FeedItemResponse, ItemsQuery};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;

/// GET /api/items - Current deduplicated snapshot, ordered by recency.
///
/// Idempotent read straight off the store; there is no caching layer
/// that could diverge from what the broadcaster has seen.
pub async fn list_items(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ItemsQuery>,
) -> Result<Json<ApiResponse<Vec<FeedItemResponse>>>, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_LIST_LIMIT).min(MAX_LIST_LIMIT);

    let repo = FeedItemRepository::new(state.db.pool());
    let items = repo
        .list_recent(query.source.as_deref(), limit)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list items: {}", e);
            ApiError::internal("Failed to list items")
        })?;

    let responses: Vec<_> = items.into_iter().map(FeedItemResponse::from).collect();

    Ok(Json(ApiResponse::new(responses)))
}
