use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum ClientError {
    #[error("Failed to connect to marketplace API server")]
    #[diagnostic(
        code(marketplace::client::connection_failed),
        help(
            "Is the API server running? Try: marketplace-api --database-url sqlite://marketplace.db\nOr set MARKETPLACE_API_URL to point to the correct server."
        )
    )]
    ConnectionFailed {
        #[source]
        source: reqwest::Error,
    },

    #[error("Invalid response from API server: {message}")]
    #[diagnostic(
        code(marketplace::client::invalid_response),
        help(
            "The server returned data in an unexpected format. This might indicate a version mismatch."
        )
    )]
    InvalidResponse { message: String },

    #[error("{message}")]
    #[diagnostic(code(marketplace::client::api_error))]
    Api { status: u16, message: String },
}

impl ClientError {
    /// The API service could not be reached at all.
    pub fn is_connection_failure(&self) -> bool {
        matches!(self, ClientError::ConnectionFailed { .. })
    }

    /// HTTP status for server-side rejections.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_connect() || e.is_timeout() {
            ClientError::ConnectionFailed { source: e }
        } else {
            ClientError::InvalidResponse {
                message: e.to_string(),
            }
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(e: serde_json::Error) -> Self {
        ClientError::InvalidResponse {
            message: e.to_string(),
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;
