//! SQLite implementation of the database traits.
//!
//! This module provides a SQLite-backed document store implementing the
//! repository traits defined in the parent module.

mod connection;
mod review;
mod server;

#[cfg(test)]
mod connection_test;

pub use connection::{ConnectionManager, SqliteDatabase};
pub use review::SqliteReviewRepository;
pub use server::SqliteServerRepository;
