use tabled::{Table, Tabled};
use tracing::{info, warn};

use crate::cli::error::{CliError, CliResult};
use crate::cli::utils::{apply_table_style, or_dash, truncate_with_ellipsis};
use crate::client::MarketplaceApi;
use crate::installed::{
    InstalledServer, InstalledServers, find_legacy_candidate, install_from_entry, is_installed,
};

#[derive(Tabled)]
pub(crate) struct InstalledDisplay {
    #[tabled(rename = "ID")]
    pub(crate) id: String,
    #[tabled(rename = "Name")]
    pub(crate) name: String,
    #[tabled(rename = "Command")]
    pub(crate) command: String,
    #[tabled(rename = "Provider")]
    pub(crate) provider: String,
    #[tabled(rename = "Marketplace ID")]
    pub(crate) marketplace_id: String,
}

impl From<&InstalledServer> for InstalledDisplay {
    fn from(server: &InstalledServer) -> Self {
        let command = std::iter::once(server.command.as_str())
            .chain(server.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ");
        Self {
            id: server.id.clone(),
            name: truncate_with_ellipsis(&server.name, 40),
            command: truncate_with_ellipsis(&command, 50),
            provider: or_dash(server.provider.as_deref()),
            marketplace_id: or_dash(server.meta.marketplace_id()),
        }
    }
}

/// Install a marketplace server into the local registry.
///
/// Counts the install only for signed-in callers; a failed count never
/// fails the install.
pub async fn install_server<A, S>(
    api: &A,
    store: &S,
    id: &str,
    home: Option<&str>,
    authenticated: bool,
) -> CliResult<String>
where
    A: MarketplaceApi,
    S: InstalledServers,
{
    let entry = api.get_server(id).await?;
    if is_installed(&entry, &store.list()?) {
        return Ok(format!("{} is already installed", entry.name));
    }

    let server = install_from_entry(&entry, home)?;
    let summary = format!("✓ Installed server: {} ({})", server.name, server.id);
    let prompts = server.meta.args_prompts.clone();
    store.add(server)?;
    info!(marketplace_id = %entry.id, "Installed marketplace server");

    if authenticated && let Err(e) = api.track_install(&entry.id).await {
        warn!(id = %entry.id, error = %e, "Failed to track installation");
    }

    let mut lines = vec![summary];
    for prompt in prompts {
        lines.push(format!(
            "  argument {} needs a value: {}",
            prompt.arg_index,
            prompt.label.as_deref().unwrap_or("(unnamed)")
        ));
    }
    Ok(lines.join("\n"))
}

/// Remove the local install of a marketplace server.
///
/// Finds the record by its strong key, falling back to a legacy match.
pub async fn uninstall_server<A, S>(
    api: &A,
    store: &S,
    id: &str,
    authenticated: bool,
) -> CliResult<String>
where
    A: MarketplaceApi,
    S: InstalledServers,
{
    let local = store.list()?;
    let record = match local.iter().find(|s| s.meta.marketplace_id() == Some(id)) {
        Some(record) => record.clone(),
        None => {
            let entry = api.get_server(id).await?;
            find_legacy_candidate(&entry, &local)
                .cloned()
                .ok_or_else(|| CliError::NotInstalled { id: id.to_string() })?
        }
    };

    store.remove(&record.id)?;
    if authenticated && let Err(e) = api.track_uninstall(id).await {
        warn!(id, error = %e, "Failed to track uninstallation");
    }
    Ok(format!("✓ Uninstalled server: {} ({})", record.name, record.id))
}

pub fn list_installed(store: &impl InstalledServers, format: &str) -> CliResult<String> {
    let servers = store.list()?;
    match format {
        "json" => Ok(serde_json::to_string_pretty(&servers)?),
        _ => {
            if servers.is_empty() {
                return Ok("No servers installed.".to_string());
            }
            let rows: Vec<InstalledDisplay> = servers.iter().map(|s| s.into()).collect();
            let mut table = Table::new(rows);
            apply_table_style(&mut table);
            Ok(table.to_string())
        }
    }
}
