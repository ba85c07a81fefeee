//! HTTP error responses.
//!
//! Repository errors reach handlers as [`DbError`] and are turned into a
//! status code by their [`ErrorKind`], never by message content.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::error;

use super::response::ApiResponse;
use crate::db::{DbError, ErrorKind};

/// Status code for a repository error on update, delete and review routes.
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Permission => StatusCode::FORBIDDEN,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Configuration
        | ErrorKind::Connection
        | ErrorKind::Validation
        | ErrorKind::Tracking
        | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// An error response: status code plus the envelope's `error` text.
#[derive(Debug)]
pub struct HttpError {
    pub status: StatusCode,
    pub message: String,
}

impl HttpError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn unauthenticated() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "Authentication required")
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// Always 500, used by list, get and create.
    pub fn internal(err: DbError) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
    }

    /// Status chosen from the error kind.
    pub fn classify(err: DbError) -> Self {
        Self::new(status_for(err.kind()), err.to_string())
    }
}

/// Body rejections keep axum's status but travel in the envelope.
impl From<JsonRejection> for HttpError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(rejection.status(), rejection.body_text())
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(status = %self.status, error = %self.message, "Request failed");
        }
        (self.status, Json(ApiResponse::<()>::failure(self.message))).into_response()
    }
}
