//! Caller identity as seen by the client.
//!
//! Token exchange happens elsewhere; the client only needs to know who the
//! user is, an optional bearer token, and how to forget both.

use std::env;
use std::sync::RwLock;

use tracing::info;

use crate::db::UserIdentity;

pub const USER_ID_VAR: &str = "MKT_USER_ID";
pub const USER_EMAIL_VAR: &str = "MKT_USER_EMAIL";
pub const USER_NAME_VAR: &str = "MKT_USER_NAME";
pub const TOKEN_VAR: &str = "MKT_TOKEN";

/// Source of the signed-in user.
pub trait IdentityProvider: Send + Sync {
    fn current_user(&self) -> Option<UserIdentity>;

    fn access_token(&self) -> Option<String>;

    /// Forget the session, e.g. after the API rejected it.
    fn sign_out(&self);

    fn is_authenticated(&self) -> bool {
        self.current_user().is_some()
    }
}

/// Identity held in memory, set explicitly or read from the environment.
#[derive(Debug, Default)]
pub struct StaticIdentity {
    user: RwLock<Option<UserIdentity>>,
    token: RwLock<Option<String>>,
}

impl StaticIdentity {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn signed_in(user: UserIdentity) -> Self {
        Self {
            user: RwLock::new(Some(user)),
            token: RwLock::new(None),
        }
    }

    pub fn with_token(self, token: impl Into<String>) -> Self {
        *self.token.write().unwrap_or_else(|e| e.into_inner()) = Some(token.into());
        self
    }

    /// Read `MKT_USER_ID`, `MKT_USER_EMAIL`, `MKT_USER_NAME` and `MKT_TOKEN`.
    pub fn from_env() -> Self {
        let var = |name: &str| env::var(name).ok().filter(|v| !v.trim().is_empty());

        let user = var(USER_ID_VAR).map(|id| UserIdentity {
            id,
            email: var(USER_EMAIL_VAR),
            name: var(USER_NAME_VAR),
        });
        Self {
            user: RwLock::new(user),
            token: RwLock::new(var(TOKEN_VAR)),
        }
    }

    pub fn sign_in(&self, user: UserIdentity) {
        *self.user.write().unwrap_or_else(|e| e.into_inner()) = Some(user);
    }
}

impl IdentityProvider for StaticIdentity {
    fn current_user(&self) -> Option<UserIdentity> {
        self.user.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn access_token(&self) -> Option<String> {
        self.token.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn sign_out(&self) {
        let previous = self.user.write().unwrap_or_else(|e| e.into_inner()).take();
        self.token.write().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(user) = previous {
            info!(user_id = %user.id, "Signed out");
        }
    }
}
