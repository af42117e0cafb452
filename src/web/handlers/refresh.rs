//! On-demand refresh handler.

use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

use crate::feed::scheduler::IngestOutcome;
use crate::web::auth::OperatorAuth;
use crate::web::dto::{ApiResponse, RefreshResponse};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;

/// POST /api/sources/:name/refresh - Trigger an immediate fetch cycle.
///
/// Shares the scheduler's per-source exclusion: a cycle already running
/// for this source yields 409 instead of a concurrent fetch.
pub async fn refresh_source(
    State(state): State<Arc<AppState>>,
    _auth: OperatorAuth,
    Path(name): Path<String>,
) -> Result<Json<ApiResponse<RefreshResponse>>, ApiError> {
    let source = state
        .coordinator
        .source(&name)
        .cloned()
        .ok_or_else(|| ApiError::not_found("Source not found"))?;

    match state.coordinator.ingest_source(&source).await {
        Ok(IngestOutcome::Completed { inserted, .. }) => Ok(Json(ApiResponse::new(
            RefreshResponse {
                source: name,
                inserted,
            },
        ))),
        Ok(IngestOutcome::Skipped) => Err(ApiError::conflict(
            "A fetch cycle for this source is already running",
        )),
        Err(e) => {
            tracing::warn!("On-demand refresh for {} failed: {}", name, e);
            Err(ApiError::internal("Fetch failed"))
        }
    }
}
