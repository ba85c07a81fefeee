//! HTTP API layer.
//!
//! Exposes the repositories over REST endpoints under `/api/marketplace`,
//! wraps every body in `{success, data?, error?}` and maps repository
//! errors to status codes by kind.

mod error;
mod identity;
mod response;
mod routes;
mod state;
mod v1;


use std::net::{IpAddr, Ipv4Addr};

use miette::Diagnostic;
use thiserror::Error;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::db::Database;

pub use error::{HttpError, status_for};
pub use identity::{CallerIdentity, USER_EMAIL_HEADER, USER_ID_HEADER, USER_NAME_HEADER};
pub use response::ApiResponse;
pub use routes::{API_PREFIX, ApiDoc, create_router};
pub use state::AppState;
pub use v1::{CreateReviewRequest, HealthResponse};

/// Default port for the marketplace API.
pub const DEFAULT_PORT: u16 = 23333;

/// API server configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Host address to bind to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: DEFAULT_PORT,
        }
    }
}

impl Config {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// API server errors.
#[derive(Error, Diagnostic, Debug)]
pub enum ApiError {
    #[error("Failed to bind {addr}: {source}")]
    #[diagnostic(
        code(marketplace::api::bind),
        help("Is another process listening on this port? Try --port.")
    )]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Server error: {0}")]
    #[diagnostic(code(marketplace::api::serve))]
    Serve(#[from] std::io::Error),
}

/// Initialize tracing subscriber with env filter
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "marketplace=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// Run the API server with the given configuration
///
/// The store connection is opened by the first request that needs it and
/// released when the server stops.
pub async fn run<D: Database>(config: Config, db: D) -> Result<(), ApiError> {
    init_tracing();

    let state = AppState::new(db);
    let app = create_router(state.clone()).layer(TraceLayer::new_for_http());

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|source| ApiError::Bind {
            addr: addr.clone(),
            source,
        })?;
    info!("API server listening on http://{}", addr);

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    state.db().disconnect().await;
    served?;
    Ok(())
}
