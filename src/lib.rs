//! Marketplace for shareable MCP server configurations.
//!
//! - `db`: document store behind the `Database` trait
//! - `api`: HTTP API over the store
//! - `client`: HTTP client and the synchronized client-side store
//! - `installed`: local installs and installed-state matching
//! - `cli`: the `mkt` command line

pub mod api;
pub mod cli;
pub mod client;
pub mod db;
pub mod installed;
