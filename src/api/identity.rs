//! Caller identity taken from request headers.
//!
//! Credentials are checked upstream by the authentication collaborator; the
//! presence of a caller id header is taken as proof of authentication.

use std::convert::Infallible;

use axum::extract::{FromRequestParts, OptionalFromRequestParts};
use axum::http::HeaderMap;
use axum::http::request::Parts;

use super::error::HttpError;
use crate::db::UserIdentity;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_EMAIL_HEADER: &str = "x-user-email";
pub const USER_NAME_HEADER: &str = "x-user-name";

/// Authenticated caller. Rejects with 401 when the id header is missing.
///
/// Use `Option<CallerIdentity>` on routes where identity is optional.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity(pub UserIdentity);

impl CallerIdentity {
    pub fn id(&self) -> &str {
        &self.0.id
    }

    fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        Some(Self(UserIdentity {
            id: header(USER_ID_HEADER)?,
            email: header(USER_EMAIL_HEADER),
            name: header(USER_NAME_HEADER),
        }))
    }
}

impl<S> FromRequestParts<S> for CallerIdentity
where
    S: Send + Sync,
{
    type Rejection = HttpError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Self::from_headers(&parts.headers).ok_or_else(HttpError::unauthenticated)
    }
}

impl<S> OptionalFromRequestParts<S> for CallerIdentity
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(Self::from_headers(&parts.headers))
    }
}
