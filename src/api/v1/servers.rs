//! Marketplace entry handlers.

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use tracing::{debug, info, instrument};

use crate::api::AppState;
use crate::api::error::HttpError;
use crate::api::identity::CallerIdentity;
use crate::api::response::ApiResponse;
use crate::db::{Database, MarketplaceServer, ServerPayload, ServerRepository};

type ServerList = Json<ApiResponse<Vec<MarketplaceServer>>>;
type ServerBody = Json<ApiResponse<MarketplaceServer>>;

/// Attach ownership flags when the caller is known.
fn for_caller(server: MarketplaceServer, caller: Option<&CallerIdentity>) -> MarketplaceServer {
    match caller {
        Some(caller) => server.with_ownership(caller.id()),
        None => server,
    }
}

/// List public servers
///
/// Newest first. Entries carry `isOwner`/`canEdit`/`canDelete` when the
/// caller identity header is present.
#[utoipa::path(
    get,
    path = "/api/marketplace/servers",
    tag = "servers",
    responses(
        (status = 200, description = "`{success, data}` with the public entries", body = [MarketplaceServer]),
        (status = 500, description = "Repository error")
    )
)]
#[instrument(skip(state))]
pub async fn list_servers<D: Database>(
    State(state): State<AppState<D>>,
    caller: Option<CallerIdentity>,
) -> Result<ServerList, HttpError> {
    let servers = state
        .db()
        .servers()
        .list_public()
        .await
        .map_err(HttpError::internal)?;

    info!(count = servers.len(), "Returning servers to client");
    let servers = servers
        .into_iter()
        .map(|s| for_caller(s, caller.as_ref()))
        .collect();
    Ok(Json(ApiResponse::ok(servers)))
}

/// List the caller's servers
///
/// Includes private entries.
#[utoipa::path(
    get,
    path = "/api/marketplace/servers/my",
    tag = "servers",
    params(
        ("x-user-id" = String, Header, description = "Caller id")
    ),
    responses(
        (status = 200, description = "`{success, data}` with the caller's entries", body = [MarketplaceServer]),
        (status = 401, description = "Authentication required"),
        (status = 500, description = "Repository error")
    )
)]
#[instrument(skip(state))]
pub async fn list_my_servers<D: Database>(
    State(state): State<AppState<D>>,
    caller: CallerIdentity,
) -> Result<ServerList, HttpError> {
    debug!(user_id = caller.id(), "Fetching user servers");
    let servers = state
        .db()
        .servers()
        .list_by_owner(caller.id())
        .await
        .map_err(HttpError::internal)?;

    let servers = servers
        .into_iter()
        .map(|s| s.with_ownership(caller.id()))
        .collect();
    Ok(Json(ApiResponse::ok(servers)))
}

/// Get a server by ID
#[utoipa::path(
    get,
    path = "/api/marketplace/servers/{id}",
    tag = "servers",
    params(
        ("id" = String, Path, description = "Server ID (32-character hex)")
    ),
    responses(
        (status = 200, description = "`{success, data}` with the entry", body = MarketplaceServer),
        (status = 404, description = "Server not found"),
        (status = 500, description = "Repository error")
    )
)]
#[instrument(skip(state))]
pub async fn get_server<D: Database>(
    State(state): State<AppState<D>>,
    caller: Option<CallerIdentity>,
    Path(id): Path<String>,
) -> Result<ServerBody, HttpError> {
    let server = state
        .db()
        .servers()
        .get(&id)
        .await
        .map_err(HttpError::internal)?
        .ok_or_else(|| HttpError::not_found("Server not found"))?;

    Ok(Json(ApiResponse::ok(for_caller(server, caller.as_ref()))))
}

/// Publish a server
///
/// The caller becomes the owner.
#[utoipa::path(
    post,
    path = "/api/marketplace/servers",
    tag = "servers",
    params(
        ("x-user-id" = String, Header, description = "Caller id"),
        ("x-user-email" = Option<String>, Header, description = "Caller email"),
        ("x-user-name" = Option<String>, Header, description = "Caller display name")
    ),
    request_body = ServerPayload,
    responses(
        (status = 201, description = "`{success, data}` with the stored entry", body = MarketplaceServer),
        (status = 401, description = "Authentication required"),
        (status = 500, description = "Repository error")
    )
)]
#[instrument(skip(state))]
pub async fn create_server<D: Database>(
    State(state): State<AppState<D>>,
    caller: CallerIdentity,
    payload: Result<Json<ServerPayload>, JsonRejection>,
) -> Result<(StatusCode, ServerBody), HttpError> {
    let Json(payload) = payload?;
    let server = state
        .db()
        .servers()
        .create(&payload, &caller.0)
        .await
        .map_err(HttpError::internal)?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(server.with_ownership(caller.id()))),
    ))
}

/// Update a server
///
/// Only the fields present in the body change. Owner only, unless the
/// entry has no owner.
#[utoipa::path(
    put,
    path = "/api/marketplace/servers/{id}",
    tag = "servers",
    params(
        ("id" = String, Path, description = "Server ID (32-character hex)"),
        ("x-user-id" = String, Header, description = "Caller id")
    ),
    request_body = ServerPayload,
    responses(
        (status = 200, description = "`{success, data}` with the updated entry", body = MarketplaceServer),
        (status = 401, description = "Authentication required"),
        (status = 403, description = "Caller is not the owner"),
        (status = 404, description = "Server not found"),
        (status = 500, description = "Repository error")
    )
)]
#[instrument(skip(state))]
pub async fn update_server<D: Database>(
    State(state): State<AppState<D>>,
    caller: CallerIdentity,
    Path(id): Path<String>,
    payload: Result<Json<ServerPayload>, JsonRejection>,
) -> Result<ServerBody, HttpError> {
    let Json(payload) = payload?;
    let server = state
        .db()
        .servers()
        .update(&id, &payload, caller.id())
        .await
        .map_err(HttpError::classify)?;

    Ok(Json(ApiResponse::ok(server.with_ownership(caller.id()))))
}

/// Delete a server
#[utoipa::path(
    delete,
    path = "/api/marketplace/servers/{id}",
    tag = "servers",
    params(
        ("id" = String, Path, description = "Server ID (32-character hex)"),
        ("x-user-id" = String, Header, description = "Caller id")
    ),
    responses(
        (status = 200, description = "`{success: true}`"),
        (status = 401, description = "Authentication required"),
        (status = 403, description = "Caller is not the owner"),
        (status = 404, description = "Server not found"),
        (status = 500, description = "Repository error")
    )
)]
#[instrument(skip(state))]
pub async fn delete_server<D: Database>(
    State(state): State<AppState<D>>,
    caller: CallerIdentity,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<()>>, HttpError> {
    state
        .db()
        .servers()
        .delete(&id, caller.id())
        .await
        .map_err(HttpError::classify)?;

    Ok(Json(ApiResponse::success()))
}

/// Track an installation
///
/// Always succeeds; tracking failures are only logged.
#[utoipa::path(
    post,
    path = "/api/marketplace/servers/{id}/install",
    tag = "servers",
    params(
        ("id" = String, Path, description = "Server ID (32-character hex)")
    ),
    responses(
        (status = 200, description = "`{success: true}`")
    )
)]
#[instrument(skip(state))]
pub async fn track_install<D: Database>(
    State(state): State<AppState<D>>,
    Path(id): Path<String>,
) -> Json<ApiResponse<()>> {
    state.db().servers().increment_install_count(&id, 1).await;
    Json(ApiResponse::success())
}

/// Track an uninstallation
///
/// Always succeeds; tracking failures are only logged.
#[utoipa::path(
    post,
    path = "/api/marketplace/servers/{id}/uninstall",
    tag = "servers",
    params(
        ("id" = String, Path, description = "Server ID (32-character hex)")
    ),
    responses(
        (status = 200, description = "`{success: true}`")
    )
)]
#[instrument(skip(state))]
pub async fn track_uninstall<D: Database>(
    State(state): State<AppState<D>>,
    Path(id): Path<String>,
) -> Json<ApiResponse<()>> {
    state.db().servers().increment_install_count(&id, -1).await;
    Json(ApiResponse::success())
}
