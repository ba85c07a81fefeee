//! Locally installed server configurations.
//!
//! The marketplace never owns this list; it reads it to decide whether an
//! entry is already installed and writes back a single field (the
//! `meta.marketplaceId` strong key) on legacy installs.
//!
//! - `registry`: storage behind the [`InstalledServers`] trait
//! - `matcher`: installed-state heuristic and strong-key backfill
//! - `install`: turning a marketplace entry into an installed record

mod install;
mod matcher;
mod registry;

#[cfg(test)]
mod install_test;

use std::collections::BTreeMap;
use std::path::PathBuf;

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

pub use install::{install_from_entry, resolve_home};
pub use matcher::{
    Signature, backfill_marketplace_id, extract_definition, extract_signature,
    find_legacy_candidate, is_installed,
};
pub use registry::{INSTALLED_FILE_VAR, JsonInstalledServers, MemoryInstalledServers};

/// Prompt shown to the user for one positional argument at install time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArgPrompt {
    pub arg_index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstalledMeta {
    /// Strong key back to the marketplace entry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marketplace_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args_prompts: Vec<ArgPrompt>,
    /// Keys written by other tools, kept as-is
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl InstalledMeta {
    pub fn marketplace_id(&self) -> Option<&str> {
        self.marketplace_id.as_deref().filter(|id| !id.is_empty())
    }
}

fn default_kind() -> String {
    "stdio".to_string()
}

/// One installed server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstalledServer {
    pub id: String,
    pub name: String,
    #[serde(rename = "type", default = "default_kind")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry_url: Option<String>,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_key: Option<String>,
    #[serde(default)]
    pub meta: InstalledMeta,
}

#[derive(Error, Diagnostic, Debug)]
pub enum InstalledError {
    #[error("Failed to read {path}: {source}")]
    #[diagnostic(code(marketplace::installed::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed installed servers file {path}: {source}")]
    #[diagnostic(
        code(marketplace::installed::malformed),
        help("Fix or remove the file; it is recreated on the next install")
    )]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Installed server not found: {id}")]
    #[diagnostic(code(marketplace::installed::not_found))]
    NotFound { id: String },

    #[error("Invalid server config: {message}")]
    #[diagnostic(code(marketplace::installed::invalid_config))]
    InvalidConfig { message: String },
}

pub type InstalledResult<T> = Result<T, InstalledError>;

/// The local list of installed servers.
#[cfg_attr(test, mockall::automock)]
pub trait InstalledServers: Send + Sync {
    fn list(&self) -> InstalledResult<Vec<InstalledServer>>;

    fn add(&self, server: InstalledServer) -> InstalledResult<()>;

    /// Replace the record with the same id.
    fn update(&self, server: InstalledServer) -> InstalledResult<()>;

    /// Remove by id, returning the removed record if there was one.
    fn remove(&self, id: &str) -> InstalledResult<Option<InstalledServer>>;
}
