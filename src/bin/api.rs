//! Marketplace API server binary.
//!
//! This binary creates the concrete database implementation and passes it
//! to the API server. The API layer remains agnostic of the storage backend.

use std::net::IpAddr;

use clap::Parser;
use marketplace::api::{self, ApiError, Config, DEFAULT_PORT};
use marketplace::db::{DATABASE_NAME_VAR, DatabaseConfig, SqliteDatabase};
use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
enum BinaryError {
    #[error("API server error: {0}")]
    #[diagnostic(code(marketplace::binary::api))]
    Api(#[from] ApiError),
}

#[derive(Parser)]
#[command(name = "marketplace-api")]
#[command(author, version, about = "MCP server marketplace API", long_about = None)]
struct Cli {
    /// Host address to bind to
    #[arg(long, default_value = "127.0.0.1")]
    host: IpAddr,

    /// Port to listen on
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Store connection string (default: MARKETPLACE_DATABASE_URL, MARKETPLACE_DB_URL, DATABASE_URL or SQLITE_URL)
    #[arg(long)]
    database_url: Option<String>,

    /// Database name; replaces the file stem of a file-backed store
    #[arg(long, env = DATABASE_NAME_VAR)]
    database_name: Option<String>,

    /// Never fall back to listing every entry when no public entry matches
    #[arg(long)]
    no_public_fallback: bool,
}

#[tokio::main]
async fn main() -> Result<(), BinaryError> {
    let cli = Cli::parse();

    let mut config = DatabaseConfig::from_env().with_overrides(cli.database_url, cli.database_name);
    if cli.no_public_fallback {
        config.public_fallback = false;
    }
    if config.url.is_none() {
        eprintln!("Warning: no database connection string configured; requests will fail until one is set");
    }

    // The store connects lazily on the first request
    api::run(
        Config {
            host: cli.host,
            port: cli.port,
        },
        SqliteDatabase::new(config),
    )
    .await?;

    Ok(())
}
