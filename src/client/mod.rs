//! Client side of the marketplace.
//!
//! - `api_client`: reqwest client speaking the HTTP contract
//! - `identity`: who the caller is
//! - `store`: cached listings kept in sync with the API

mod api_client;
mod error;
mod identity;
mod store;

#[cfg(test)]
mod store_test;

pub use api_client::{API_URL_VAR, DEFAULT_API_URL, MarketplaceApi, MarketplaceClient, init_crypto};
pub use error::{ClientError, ClientResult};
pub use identity::{
    IdentityProvider, StaticIdentity, TOKEN_VAR, USER_EMAIL_VAR, USER_ID_VAR, USER_NAME_VAR,
};
pub use store::{ListState, MarketplaceState, MarketplaceStore, SERVICE_DOWN_MESSAGE};
