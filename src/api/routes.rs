//! API route configuration.

use axum::Router;
use axum::routing::{delete, get, post, put};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

use super::state::AppState;
use super::v1::{self, CreateReviewRequest, HealthResponse};
use crate::db::{
    Database, DeveloperInfo, MarketplaceServer, MarketplaceStats, Rating, ReviewEntry,
    ServerPayload,
};

/// Prefix every marketplace route is mounted under.
pub const API_PREFIX: &str = "/api/marketplace";

/// Build routes with generic database type.
///
/// This macro reduces boilerplate when registering handlers that are generic
/// over the Database trait. It applies the turbofish operator automatically.
macro_rules! routes {
    ($D:ty => {
        $($method:ident $path:literal => $($handler:ident)::+),* $(,)?
    }) => {{
        let router = Router::new();
        $(
            let router = router.route($path, $method($($handler)::+::<$D>));
        )*
        router
    }};
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Marketplace API",
        version = "0.1.0",
        description = "Shareable MCP server configurations: publish, browse, review and track installs",
        license(name = "GPL-2.0")
    ),
    paths(
        v1::health,
        v1::stats,
        v1::list_servers,
        v1::list_my_servers,
        v1::get_server,
        v1::create_server,
        v1::update_server,
        v1::delete_server,
        v1::track_install,
        v1::track_uninstall,
        v1::list_reviews,
        v1::create_review,
    ),
    components(
        schemas(
            HealthResponse,
            MarketplaceServer,
            ServerPayload,
            DeveloperInfo,
            Rating,
            MarketplaceStats,
            ReviewEntry,
            CreateReviewRequest,
        )
    ),
    tags(
        (name = "system", description = "System health and status endpoints"),
        (name = "servers", description = "Marketplace entry endpoints"),
        (name = "reviews", description = "Entry review endpoints")
    )
)]
pub struct ApiDoc;

/// Create the API router with OpenAPI documentation
pub fn create_router<D: Database>(state: AppState<D>) -> Router {
    let api = ApiDoc::openapi();

    // System routes (non-generic)
    let system_routes = Router::new().route("/health", get(v1::health));

    // "/servers/my" is a static segment and wins over "/servers/{id}"
    let marketplace_routes = routes!(D => {
        get "/servers" => v1::list_servers,
        get "/servers/my" => v1::list_my_servers,
        get "/servers/{id}" => v1::get_server,
        post "/servers" => v1::create_server,
        put "/servers/{id}" => v1::update_server,
        delete "/servers/{id}" => v1::delete_server,
        post "/servers/{id}/install" => v1::track_install,
        post "/servers/{id}/uninstall" => v1::track_uninstall,
        get "/servers/{id}/reviews" => v1::list_reviews,
        post "/servers/{id}/reviews" => v1::create_review,
        get "/stats" => v1::stats,
    });

    system_routes
        .nest(API_PREFIX, marketplace_routes)
        .merge(Scalar::with_url("/docs", api))
        .with_state(state)
}
