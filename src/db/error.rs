//! Database error types.
//!
//! This module provides the error taxonomy for the marketplace store.
//! It uses miette for fancy diagnostic output and thiserror for derive macros.
//! Every variant maps onto an [`ErrorKind`], which is what the HTTP layer
//! dispatches on; messages are for humans only.

use miette::Diagnostic;
use thiserror::Error;

/// Coarse classification of a [`DbError`], carried through to the HTTP layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Connection,
    NotFound,
    Permission,
    Validation,
    Tracking,
    Internal,
}

/// Database operation errors.
#[derive(Error, Diagnostic, Debug)]
pub enum DbError {
    #[error("Configuration error: {message}")]
    #[diagnostic(
        code(marketplace::db::configuration),
        help(
            "Set MARKETPLACE_DATABASE_URL (or DATABASE_URL), e.g. sqlite://marketplace.db, or pass --database-url."
        )
    )]
    Configuration { message: String },

    #[error("Connection failed: {message}")]
    #[diagnostic(code(marketplace::db::connection))]
    Connection { message: String },

    #[error("{entity_type} not found: '{id}'")]
    #[diagnostic(code(marketplace::db::not_found))]
    NotFound { entity_type: String, id: String },

    #[error("You do not have permission to {action} this {entity_type}")]
    #[diagnostic(code(marketplace::db::permission))]
    Permission { action: String, entity_type: String },

    #[error("Validation error: {message}")]
    #[diagnostic(code(marketplace::db::validation))]
    Validation { message: String },

    #[error("Install tracking failed: {message}")]
    #[diagnostic(code(marketplace::db::tracking))]
    Tracking { message: String },

    #[error("Database error: {message}")]
    #[diagnostic(code(marketplace::db::database))]
    Database { message: String },

    #[error("Migration error: {message}")]
    #[diagnostic(code(marketplace::db::migration))]
    Migration { message: String },
}

impl DbError {
    /// Classification used for status-code selection.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DbError::Configuration { .. } => ErrorKind::Configuration,
            DbError::Connection { .. } => ErrorKind::Connection,
            DbError::NotFound { .. } => ErrorKind::NotFound,
            DbError::Permission { .. } => ErrorKind::Permission,
            DbError::Validation { .. } => ErrorKind::Validation,
            DbError::Tracking { .. } => ErrorKind::Tracking,
            DbError::Database { .. } | DbError::Migration { .. } => ErrorKind::Internal,
        }
    }

    pub(crate) fn server_not_found(id: &str) -> Self {
        DbError::NotFound {
            entity_type: "Server".to_string(),
            id: id.to_string(),
        }
    }

    pub(crate) fn server_permission(action: &str) -> Self {
        DbError::Permission {
            action: action.to_string(),
            entity_type: "server".to_string(),
        }
    }
}

impl From<sqlx::Error> for DbError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                DbError::Connection {
                    message: e.to_string(),
                }
            }
            _ => DbError::Database {
                message: e.to_string(),
            },
        }
    }
}

impl From<serde_json::Error> for DbError {
    fn from(e: serde_json::Error) -> Self {
        DbError::Database {
            message: format!("Malformed document: {}", e),
        }
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;
