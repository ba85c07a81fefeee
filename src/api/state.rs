//! Application state for the API server.

use std::sync::Arc;

use crate::db::Database;

/// Shared application state.
///
/// Generic over `D: Database` so handlers work with any storage backend.
/// The database (and its connection) is injected by the caller.
pub struct AppState<D: Database> {
    db: Arc<D>,
}

// Manual Clone impl - only the Arc needs to be cloneable, not D
impl<D: Database> Clone for AppState<D> {
    fn clone(&self) -> Self {
        Self {
            db: Arc::clone(&self.db),
        }
    }
}

impl<D: Database> AppState<D> {
    pub fn new(db: D) -> Self {
        Self { db: Arc::new(db) }
    }

    /// Share an already wrapped database.
    pub fn from_arc(db: Arc<D>) -> Self {
        Self { db }
    }

    /// Get a reference to the database.
    pub fn db(&self) -> &D {
        &self.db
    }

    /// Get a cloned Arc to the database.
    pub fn db_arc(&self) -> Arc<D> {
        Arc::clone(&self.db)
    }
}
