use std::fs;
use std::path::Path;

use tabled::{Table, Tabled};
use tracing::warn;

use crate::cli::error::{CliError, CliResult};
use crate::cli::utils::{apply_table_style, format_rating, format_tags, or_dash, truncate_with_ellipsis};
use crate::client::MarketplaceApi;
use crate::db::{MarketplaceServer, ServerPayload};
use crate::installed::{InstalledServers, backfill_marketplace_id, is_installed};

#[derive(Tabled)]
pub(crate) struct ServerDisplay {
    #[tabled(rename = "ID")]
    pub(crate) id: String,
    #[tabled(rename = "Name")]
    pub(crate) name: String,
    #[tabled(rename = "Author")]
    pub(crate) author: String,
    #[tabled(rename = "Installs")]
    pub(crate) installs: i64,
    #[tabled(rename = "Rating")]
    pub(crate) rating: String,
    #[tabled(rename = "Tags")]
    pub(crate) tags: String,
    #[tabled(rename = "Installed")]
    pub(crate) installed: String,
}

impl ServerDisplay {
    fn new(server: &MarketplaceServer, installed: bool) -> Self {
        let (average, count) = server
            .rating
            .as_ref()
            .map(|r| (r.average, r.count))
            .unwrap_or((0.0, 0));
        Self {
            id: server.id.clone(),
            name: truncate_with_ellipsis(&server.name, 40),
            author: or_dash(server.author.as_deref()),
            installs: server.install_count,
            rating: format_rating(average, count),
            tags: format_tags(server.tags.as_ref()),
            installed: if installed { "yes" } else { "" }.to_string(),
        }
    }
}

pub(crate) fn format_table(servers: &[MarketplaceServer], installed: &[bool]) -> String {
    if servers.is_empty() {
        return "No servers found.".to_string();
    }

    let rows: Vec<ServerDisplay> = servers
        .iter()
        .zip(installed.iter().copied().chain(std::iter::repeat(false)))
        .map(|(s, i)| ServerDisplay::new(s, i))
        .collect();
    let mut table = Table::new(rows);
    apply_table_style(&mut table);
    table.to_string()
}

/// List public servers, or the caller's own with `mine`.
pub async fn list_servers<A, S>(api: &A, store: &S, mine: bool, format: &str) -> CliResult<String>
where
    A: MarketplaceApi,
    S: InstalledServers,
{
    let servers = if mine {
        api.get_my_servers().await?
    } else {
        api.get_servers().await?
    };

    match format {
        "json" => Ok(serde_json::to_string_pretty(&servers)?),
        _ => {
            let local = store.list()?;
            let flags: Vec<bool> = servers.iter().map(|s| is_installed(s, &local)).collect();
            Ok(format_table(&servers, &flags))
        }
    }
}

/// Show one server. Links a matching legacy install to it on the way.
pub async fn show_server<A, S>(api: &A, store: &S, id: &str, format: &str) -> CliResult<String>
where
    A: MarketplaceApi,
    S: InstalledServers,
{
    let server = api.get_server(id).await?;
    if let Err(e) = backfill_marketplace_id(&server, store) {
        warn!(id, error = %e, "Could not link legacy install");
    }

    if format == "json" {
        return Ok(serde_json::to_string_pretty(&server)?);
    }

    let installed = is_installed(&server, &store.list()?);
    let rating = server
        .rating
        .as_ref()
        .map(|r| format_rating(r.average, r.count))
        .unwrap_or_else(|| "-".to_string());

    let mut lines = vec![
        format!("{} ({})", server.name, server.id),
        format!("Description: {}", or_dash(server.description.as_deref())),
        format!("Version:     {}", or_dash(server.version.as_deref())),
        format!("Author:      {}", or_dash(server.author.as_deref())),
        format!("Owner:       {}", or_dash(server.owner_name.as_deref())),
        format!("Category:    {}", or_dash(server.category.as_deref())),
        format!("Tags:        {}", format_tags(server.tags.as_ref())),
        format!("Repository:  {}", or_dash(server.repository.as_deref())),
        format!("Installs:    {}", server.install_count),
        format!("Rating:      {}", rating),
        format!("Public:      {}", if server.is_public { "yes" } else { "no" }),
        format!("Installed:   {}", if installed { "yes" } else { "no" }),
    ];
    lines.push(format!(
        "Config:\n{}",
        serde_json::to_string_pretty(&server.config)?
    ));
    Ok(lines.join("\n"))
}

/// Read a server payload from a JSON file.
pub fn read_payload(path: &Path) -> CliResult<ServerPayload> {
    let content = fs::read_to_string(path).map_err(|source| CliError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| CliError::InvalidFile {
        path: path.to_path_buf(),
        source,
    })
}

pub async fn publish_server(api: &impl MarketplaceApi, file: &Path) -> CliResult<String> {
    let payload = read_payload(file)?;
    let created = api.create_server(&payload).await?;
    Ok(format!("✓ Published server: {} ({})", created.name, created.id))
}

/// Apply the fields present in `file` to an existing server.
pub async fn update_server(api: &impl MarketplaceApi, id: &str, file: &Path) -> CliResult<String> {
    let payload = read_payload(file)?;
    let updated = api.update_server(id, &payload).await?;
    Ok(format!("✓ Updated server: {} ({})", updated.name, updated.id))
}

pub async fn delete_server(api: &impl MarketplaceApi, id: &str) -> CliResult<String> {
    api.delete_server(id).await?;
    Ok(format!("✓ Deleted server: {}", id))
}
