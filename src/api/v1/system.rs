//! System health and status handlers.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use utoipa::ToSchema;

use crate::api::AppState;
use crate::api::error::HttpError;
use crate::api::identity::CallerIdentity;
use crate::api::response::ApiResponse;
use crate::db::{Database, MarketplaceStats, ServerRepository};

/// Health check response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Service status
    #[schema(example = "ok")]
    pub status: String,
}

/// Health check endpoint
///
/// Does not touch the store.
#[utoipa::path(
    get,
    path = "/health",
    tag = "system",
    responses(
        (status = 200, description = "Health check successful", body = HealthResponse)
    )
)]
#[instrument]
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Marketplace counters
///
/// `userServers` is 0 without a caller identity.
#[utoipa::path(
    get,
    path = "/api/marketplace/stats",
    tag = "system",
    responses(
        (status = 200, description = "`{success, data}` with the counters", body = MarketplaceStats),
        (status = 500, description = "Repository error")
    )
)]
#[instrument(skip(state))]
pub async fn stats<D: Database>(
    State(state): State<AppState<D>>,
    caller: Option<CallerIdentity>,
) -> Result<Json<ApiResponse<MarketplaceStats>>, HttpError> {
    let stats = state
        .db()
        .servers()
        .stats(caller.as_ref().map(CallerIdentity::id))
        .await
        .map_err(HttpError::internal)?;
    Ok(Json(ApiResponse::ok(stats)))
}
