//! Review handlers.

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use utoipa::ToSchema;

use crate::api::AppState;
use crate::api::error::HttpError;
use crate::api::identity::CallerIdentity;
use crate::api::response::ApiResponse;
use crate::db::{Database, ReviewEntry, ReviewRepository};

/// Create or replace review request DTO
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateReviewRequest {
    /// Stars, 1..=5
    #[schema(example = 5)]
    pub rating: i64,
    #[schema(example = "Works out of the box")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review: Option<String>,
}

/// List reviews of a server
///
/// Newest first.
#[utoipa::path(
    get,
    path = "/api/marketplace/servers/{id}/reviews",
    tag = "reviews",
    params(
        ("id" = String, Path, description = "Server ID (32-character hex)")
    ),
    responses(
        (status = 200, description = "`{success, data}` with the reviews", body = [ReviewEntry]),
        (status = 500, description = "Repository error")
    )
)]
#[instrument(skip(state))]
pub async fn list_reviews<D: Database>(
    State(state): State<AppState<D>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Vec<ReviewEntry>>>, HttpError> {
    let reviews = state
        .db()
        .reviews()
        .list(&id)
        .await
        .map_err(HttpError::internal)?;
    Ok(Json(ApiResponse::ok(reviews)))
}

/// Review a server
///
/// One review per caller and server; posting again replaces it.
#[utoipa::path(
    post,
    path = "/api/marketplace/servers/{id}/reviews",
    tag = "reviews",
    params(
        ("id" = String, Path, description = "Server ID (32-character hex)"),
        ("x-user-id" = String, Header, description = "Caller id")
    ),
    request_body = CreateReviewRequest,
    responses(
        (status = 201, description = "`{success, data}` with the stored review", body = ReviewEntry),
        (status = 400, description = "Rating out of range"),
        (status = 401, description = "Authentication required"),
        (status = 404, description = "Server not found"),
        (status = 500, description = "Repository error")
    )
)]
#[instrument(skip(state))]
pub async fn create_review<D: Database>(
    State(state): State<AppState<D>>,
    caller: CallerIdentity,
    Path(id): Path<String>,
    req: Result<Json<CreateReviewRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<ReviewEntry>>), HttpError> {
    let Json(req) = req?;
    if !(1..=5).contains(&req.rating) {
        return Err(HttpError::bad_request("Rating must be between 1 and 5"));
    }

    let entry = state
        .db()
        .reviews()
        .upsert(&id, &caller.0, req.rating, req.review.as_deref())
        .await
        .map_err(HttpError::classify)?;

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(entry))))
}
