use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

use crate::client::ClientError;
use crate::installed::InstalledError;

#[derive(Error, Diagnostic, Debug)]
pub enum CliError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Installed(#[from] InstalledError),

    #[error("Failed to read {path}: {source}")]
    #[diagnostic(code(marketplace::cli::read_file))]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid server file {path}: {source}")]
    #[diagnostic(
        code(marketplace::cli::invalid_file),
        help("Expected a JSON object with fields such as name, description and config")
    )]
    InvalidFile {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Server {id} is not installed")]
    #[diagnostic(code(marketplace::cli::not_installed))]
    NotInstalled { id: String },

    #[error("Failed to render output: {0}")]
    #[diagnostic(code(marketplace::cli::output))]
    Output(#[from] serde_json::Error),
}

pub type CliResult<T> = Result<T, CliError>;
