//! Lazily established SQLite connection and migration management.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::review::SqliteReviewRepository;
use super::server::SqliteServerRepository;
use crate::db::{Database, DatabaseConfig, DbError, DbResult};

/// Owns the store connection for one process.
///
/// Nothing is opened at construction. The first caller of [`pool`] connects
/// and runs migrations; concurrent first callers wait on the same lock and
/// all receive the one pool that results.
///
/// [`pool`]: ConnectionManager::pool
pub struct ConnectionManager {
    config: DatabaseConfig,
    pool: Mutex<Option<SqlitePool>>,
}

impl ConnectionManager {
    pub fn new(config: DatabaseConfig) -> Self {
        Self {
            config,
            pool: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    /// Return the live pool, connecting first if necessary.
    pub async fn pool(&self) -> DbResult<SqlitePool> {
        let mut guard = self.pool.lock().await;
        if let Some(pool) = guard.as_ref() {
            return Ok(pool.clone());
        }

        let pool = self.open().await?;
        *guard = Some(pool.clone());
        Ok(pool)
    }

    /// Connect if not already connected.
    pub async fn connect(&self) -> DbResult<()> {
        self.pool().await.map(|_| ())
    }

    /// Close the pool and reset. A no-op when not connected.
    pub async fn disconnect(&self) {
        let pool = self.pool.lock().await.take();
        if let Some(pool) = pool {
            pool.close().await;
            info!("Disconnected from marketplace store");
        }
    }

    pub async fn is_connected(&self) -> bool {
        self.pool.lock().await.is_some()
    }

    async fn open(&self) -> DbResult<SqlitePool> {
        let url = self
            .config
            .url
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| DbError::Configuration {
                message: "no marketplace connection string configured".to_string(),
            })?;

        let in_memory = is_in_memory(url);
        let mut options = SqliteConnectOptions::from_str(url)
            .map_err(|e| DbError::Configuration {
                message: format!("invalid connection string: {}", e),
            })?
            .create_if_missing(true)
            .foreign_keys(true);

        if let Some(name) = &self.config.database_name {
            if in_memory {
                warn!(database = %name, "Database name ignored for in-memory store");
            } else {
                let path = named_database_path(options.get_filename(), name);
                options = options.filename(path);
            }
        }

        info!(
            database = self.config.database_name.as_deref().unwrap_or("default"),
            in_memory, "Connecting to marketplace store"
        );

        // An in-memory database lives only as long as its connection, so keep
        // exactly one and never recycle it.
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new()
                .max_connections(5)
                .acquire_timeout(Duration::from_secs(10))
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(|e| DbError::Connection {
                message: e.to_string(),
            })?;

        sqlx::migrate!("./data/sql/sqlite")
            .run(&pool)
            .await
            .map_err(|e| DbError::Migration {
                message: e.to_string(),
            })?;

        debug!("Marketplace store migrations applied");
        Ok(pool)
    }
}

fn is_in_memory(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}

/// `<dir>/<name>.db` next to the configured file.
fn named_database_path(configured: &std::path::Path, name: &str) -> PathBuf {
    let file = if name.ends_with(".db") {
        name.to_string()
    } else {
        format!("{}.db", name)
    };
    match configured.parent() {
        Some(dir) => dir.join(file),
        None => PathBuf::from(file),
    }
}

/// SQLite database implementation.
///
/// Provides access to repositories via associated types, avoiding dynamic dispatch.
pub struct SqliteDatabase {
    conn: ConnectionManager,
}

impl SqliteDatabase {
    /// Build a database over the given settings without connecting.
    pub fn new(config: DatabaseConfig) -> Self {
        Self {
            conn: ConnectionManager::new(config),
        }
    }

    /// Create an in-memory database (useful for testing).
    pub fn in_memory() -> Self {
        Self::new(DatabaseConfig::in_memory())
    }

    /// The underlying connection manager.
    pub fn connection(&self) -> &ConnectionManager {
        &self.conn
    }
}

impl Database for SqliteDatabase {
    type Servers<'a> = SqliteServerRepository<'a>;
    type Reviews<'a> = SqliteReviewRepository<'a>;

    async fn connect(&self) -> DbResult<()> {
        self.conn.connect().await
    }

    async fn disconnect(&self) {
        self.conn.disconnect().await
    }

    fn servers(&self) -> Self::Servers<'_> {
        SqliteServerRepository { conn: &self.conn }
    }

    fn reviews(&self) -> Self::Reviews<'_> {
        SqliteReviewRepository { conn: &self.conn }
    }
}
