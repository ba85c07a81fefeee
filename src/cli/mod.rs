mod commands;
pub mod error;
mod utils;


use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use crate::client::{IdentityProvider, MarketplaceClient, StaticIdentity};
use crate::installed::JsonInstalledServers;
use error::CliResult;

#[derive(Parser)]
#[command(name = "mkt")]
#[command(author, version, about = "MCP server marketplace CLI", long_about = None)]
pub struct Cli {
    /// Override the API URL (default: MARKETPLACE_API_URL env or http://localhost:23333/api/marketplace)
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Installed servers file (default: MKT_INSTALLED_FILE env or ~/.config/marketplace/installed.json)
    #[arg(long, global = true)]
    pub installed_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List marketplace servers
    List {
        /// Only servers you published
        #[arg(long)]
        mine: bool,
        /// Output format (table or json)
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Show a server's details
    Show {
        id: String,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Publish a server from a JSON file
    Publish { file: PathBuf },
    /// Update a server you own from a JSON file (only the fields present)
    Update { id: String, file: PathBuf },
    /// Delete a server you own
    Delete { id: String },
    /// Install a marketplace server locally
    Install { id: String },
    /// Remove the local install of a marketplace server
    Uninstall { id: String },
    /// List locally installed servers
    Installed {
        /// Output format (table or json)
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// List a server's reviews
    Reviews {
        id: String,
        /// Output format (table or json)
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Rate a server from 1 to 5
    Review {
        id: String,
        rating: i64,
        text: Option<String>,
    },
}

pub async fn run() -> miette::Result<()> {
    let cli = Cli::parse();
    let Some(command) = cli.command else {
        // Show help when no command provided
        let _ = Cli::parse_from(["mkt", "--help"]);
        return Ok(());
    };

    let identity = Arc::new(StaticIdentity::from_env());
    let authenticated = identity.is_authenticated();
    let api = MarketplaceClient::new(cli.api_url, identity);
    let store = JsonInstalledServers::new(
        cli.installed_file
            .unwrap_or_else(JsonInstalledServers::default_path),
    );
    let home = std::env::var("HOME").ok();

    let output = dispatch(command, &api, &store, home.as_deref(), authenticated).await?;
    println!("{}", output);
    Ok(())
}

async fn dispatch(
    command: Commands,
    api: &MarketplaceClient<StaticIdentity>,
    store: &JsonInstalledServers,
    home: Option<&str>,
    authenticated: bool,
) -> CliResult<String> {
    match command {
        Commands::List { mine, format } => {
            commands::servers::list_servers(api, store, mine, &format).await
        }
        Commands::Show { id, format } => {
            commands::servers::show_server(api, store, &id, &format).await
        }
        Commands::Publish { file } => commands::servers::publish_server(api, &file).await,
        Commands::Update { id, file } => commands::servers::update_server(api, &id, &file).await,
        Commands::Delete { id } => commands::servers::delete_server(api, &id).await,
        Commands::Install { id } => {
            commands::install::install_server(api, store, &id, home, authenticated).await
        }
        Commands::Uninstall { id } => {
            commands::install::uninstall_server(api, store, &id, authenticated).await
        }
        Commands::Installed { format } => commands::install::list_installed(store, &format),
        Commands::Reviews { id, format } => {
            commands::reviews::list_reviews(api, &id, &format).await
        }
        Commands::Review { id, rating, text } => {
            commands::reviews::create_review(api, &id, rating, text.as_deref()).await
        }
    }
}
