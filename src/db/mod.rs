//! Database abstraction layer.
//!
//! This module provides trait-based abstractions for the marketplace store,
//! allowing different storage backends to be swapped without changing the
//! HTTP layer.
//!
//! # Architecture
//!
//! - `error`: Error taxonomy with per-variant kinds
//! - `models`: Stored and wire forms of entries, reviews, stats
//! - `repository`: Trait definitions for data access
//! - `config`: Connection settings resolved from the environment
//! - `sqlite`: SQLx/SQLite document-store implementation

mod config;
mod error;
mod models;
mod repository;
pub mod sqlite;
pub mod utils;

#[cfg(test)]
mod error_test;

pub use config::{
    CONNECTION_STRING_VARS, DATABASE_NAME_VAR, DatabaseConfig, PUBLIC_FALLBACK_VAR,
};
pub use error::{DbError, DbResult, ErrorKind};
pub use models::*;
pub use repository::*;
pub use sqlite::{ConnectionManager, SqliteDatabase};
