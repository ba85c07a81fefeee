//! Store configuration resolved from the environment.

use std::env;

/// Connection string variables, checked in order. First non-empty wins.
pub const CONNECTION_STRING_VARS: &[&str] = &[
    "MARKETPLACE_DATABASE_URL",
    "MARKETPLACE_DB_URL",
    "DATABASE_URL",
    "SQLITE_URL",
];

/// Optional database name override.
pub const DATABASE_NAME_VAR: &str = "MARKETPLACE_DB";

/// Set to `false`/`0` to disable the unfiltered public-listing fallback.
pub const PUBLIC_FALLBACK_VAR: &str = "MARKETPLACE_PUBLIC_FALLBACK";

/// Connection settings for the document store.
///
/// A missing connection string is not an error here; it surfaces as a
/// configuration error on the first repository call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub database_name: Option<String>,
    /// Return every entry when the public filter matches nothing
    pub public_fallback: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            database_name: None,
            public_fallback: true,
        }
    }
}

impl DatabaseConfig {
    /// Resolve settings from process environment variables.
    pub fn from_env() -> Self {
        Self::resolve(|name| env::var(name).ok())
    }

    /// Resolve settings through an arbitrary lookup.
    pub fn resolve<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let url = CONNECTION_STRING_VARS
            .iter()
            .find_map(|name| non_empty(name));
        let database_name = non_empty(DATABASE_NAME_VAR);
        let public_fallback = non_empty(PUBLIC_FALLBACK_VAR)
            .map(|v| !matches!(v.trim().to_ascii_lowercase().as_str(), "false" | "0" | "no"))
            .unwrap_or(true);

        Self {
            url,
            database_name,
            public_fallback,
        }
    }

    /// Config for an in-memory store (tests, demos).
    pub fn in_memory() -> Self {
        Self {
            url: Some("sqlite::memory:".to_string()),
            ..Default::default()
        }
    }

    /// Override the connection string and database name where given.
    pub fn with_overrides(mut self, url: Option<String>, database_name: Option<String>) -> Self {
        if let Some(url) = url.filter(|u| !u.trim().is_empty()) {
            self.url = Some(url);
        }
        if let Some(name) = database_name.filter(|n| !n.trim().is_empty()) {
            self.database_name = Some(name);
        }
        self
    }
}
