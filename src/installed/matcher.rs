//! Decides whether a marketplace entry is already installed.
//!
//! Installs made by this crate carry `meta.marketplaceId`, the strong key.
//! Older installs do not, so they are recognised by a weak key instead:
//! name, provider, command and (when both sides have one) registry URL.
//! A weak match is only attempted when the entry yields a command; an
//! installed server may be reported as not installed, never the reverse.

use serde_json::Value;
use tracing::info;

use super::{InstalledResult, InstalledServer, InstalledServers};
use crate::db::MarketplaceServer;

/// What an entry's config says about the server it would install.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Signature {
    pub command: Option<String>,
    pub registry_url: Option<String>,
}

/// The server definition inside an entry's config.
///
/// Accepts `{"mcpServers": {"<name>": {...}}}` (first server wins), a
/// non-empty array (first element), or a bare definition object.
pub fn extract_definition(config: &Value) -> Option<&Value> {
    match config {
        Value::Object(map) => match map.get("mcpServers") {
            Some(Value::Object(servers)) => servers.values().next(),
            Some(Value::Array(servers)) => servers.first(),
            _ => Some(config),
        },
        Value::Array(items) => items.first(),
        _ => None,
    }
}

pub fn extract_signature(entry: &MarketplaceServer) -> Signature {
    let definition = extract_definition(&entry.config);
    let field = |key: &str| {
        definition
            .and_then(|d| d.get(key))
            .and_then(Value::as_str)
            .map(str::to_string)
    };
    Signature {
        command: field("command"),
        registry_url: field("registryUrl").or_else(|| entry.repository.clone()),
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

fn has_strong_key(entry: &MarketplaceServer, installed: &InstalledServer) -> bool {
    !entry.id.is_empty() && installed.meta.marketplace_id() == Some(entry.id.as_str())
}

fn matches_weak_key(
    entry: &MarketplaceServer,
    signature: &Signature,
    installed: &InstalledServer,
) -> bool {
    let Some(command) = non_empty(signature.command.as_deref()) else {
        return false;
    };
    if installed.name != entry.name || installed.command != command {
        return false;
    }
    if let Some(author) = non_empty(entry.author.as_deref())
        && installed.provider.as_deref() != Some(author)
    {
        return false;
    }
    match (
        non_empty(signature.registry_url.as_deref()),
        non_empty(installed.registry_url.as_deref()),
    ) {
        (Some(expected), Some(actual)) => expected == actual,
        _ => true,
    }
}

pub fn is_installed(entry: &MarketplaceServer, installed: &[InstalledServer]) -> bool {
    if installed.iter().any(|s| has_strong_key(entry, s)) {
        return true;
    }
    let signature = extract_signature(entry);
    installed
        .iter()
        .any(|s| matches_weak_key(entry, &signature, s))
}

/// A weak-key match that has no strong key yet.
pub fn find_legacy_candidate<'a>(
    entry: &MarketplaceServer,
    installed: &'a [InstalledServer],
) -> Option<&'a InstalledServer> {
    let signature = extract_signature(entry);
    installed
        .iter()
        .filter(|s| s.meta.marketplace_id().is_none())
        .find(|s| matches_weak_key(entry, &signature, s))
}

/// Write `meta.marketplaceId` onto the legacy install matching `entry`.
///
/// Does nothing when a record already carries the strong key or no legacy
/// candidate exists. Returns the updated record.
pub fn backfill_marketplace_id<S>(
    entry: &MarketplaceServer,
    store: &S,
) -> InstalledResult<Option<InstalledServer>>
where
    S: InstalledServers + ?Sized,
{
    let installed = store.list()?;
    if installed.iter().any(|s| has_strong_key(entry, s)) {
        return Ok(None);
    }
    let Some(candidate) = find_legacy_candidate(entry, &installed) else {
        return Ok(None);
    };

    let mut updated = candidate.clone();
    updated.meta.marketplace_id = Some(entry.id.clone());
    store.update(updated.clone())?;
    info!(
        marketplace_id = %entry.id,
        installed_id = %updated.id,
        "Linked legacy install to marketplace entry"
    );
    Ok(Some(updated))
}
