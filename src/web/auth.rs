//! Operator authentication for privileged endpoints.
//!
//! Membership resolution lives outside this service; privileged calls
//! are gated at the boundary by a static operator bearer token from the
//! configuration.

use axum::{async_trait, extract::FromRequestParts, http::header::AUTHORIZATION, http::request::Parts};
use std::sync::Arc;

use super::error::ApiError;
use super::handlers::AppState;

/// Extractor that admits only callers presenting the operator token.
pub struct OperatorAuth;

#[async_trait]
impl FromRequestParts<Arc<AppState>> for OperatorAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let expected = state
            .operator_token
            .as_deref()
            .ok_or_else(|| ApiError::forbidden("On-demand refresh is disabled"))?;

        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| ApiError::unauthorized("Missing authorization header"))?;

        let presented = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| ApiError::unauthorized("Invalid authorization header"))?;

        if presented != expected {
            return Err(ApiError::unauthorized("Invalid operator token"));
        }

        Ok(OperatorAuth)
    }
}
