//! Repository traits for data access abstraction.
//!
//! These traits define the contract for data access, allowing different
//! storage backends to be swapped without changing the HTTP layer.
//! Every operation establishes the store connection on demand.

use std::future::Future;

use crate::db::{
    DbResult,
    models::{MarketplaceServer, MarketplaceStats, ReviewEntry, ServerPayload, UserIdentity},
};

/// Repository for marketplace entries.
pub trait ServerRepository: Send + Sync {
    /// Entries whose visibility is not explicitly false, newest first.
    ///
    /// If nothing matches but the collection is non-empty, the unfiltered
    /// set is returned instead (unless disabled in configuration).
    fn list_public(&self) -> impl Future<Output = DbResult<Vec<MarketplaceServer>>> + Send;

    /// All entries owned by `owner_id`, public or not, newest first.
    fn list_by_owner(
        &self,
        owner_id: &str,
    ) -> impl Future<Output = DbResult<Vec<MarketplaceServer>>> + Send;

    /// Get an entry by ID. Malformed IDs are a validation error.
    fn get(&self, id: &str) -> impl Future<Output = DbResult<Option<MarketplaceServer>>> + Send;

    /// Create an entry owned by `owner` and return the stored form.
    fn create(
        &self,
        payload: &ServerPayload,
        owner: &UserIdentity,
    ) -> impl Future<Output = DbResult<MarketplaceServer>> + Send;

    /// Apply the fields present in `payload` if `caller_id` may edit the entry.
    fn update(
        &self,
        id: &str,
        payload: &ServerPayload,
        caller_id: &str,
    ) -> impl Future<Output = DbResult<MarketplaceServer>> + Send;

    /// Remove the entry if `caller_id` may edit it.
    fn delete(&self, id: &str, caller_id: &str) -> impl Future<Output = DbResult<()>> + Send;

    /// Atomically add `delta` to the install counter. Never fails: errors
    /// are logged and dropped.
    fn increment_install_count(&self, id: &str, delta: i64) -> impl Future<Output = ()> + Send;

    /// Collection-wide counters, with `user_servers` for `owner_id` if given.
    fn stats(
        &self,
        owner_id: Option<&str>,
    ) -> impl Future<Output = DbResult<MarketplaceStats>> + Send;
}

/// Repository for entry reviews.
pub trait ReviewRepository: Send + Sync {
    /// Reviews of an entry, newest first.
    fn list(&self, server_id: &str) -> impl Future<Output = DbResult<Vec<ReviewEntry>>> + Send;

    /// Create or replace `reviewer`'s review of an entry and refresh the
    /// entry's rating aggregate.
    fn upsert(
        &self,
        server_id: &str,
        reviewer: &UserIdentity,
        rating: i64,
        review: Option<&str>,
    ) -> impl Future<Output = DbResult<ReviewEntry>> + Send;
}

/// Combined database interface.
pub trait Database: Send + Sync + 'static {
    type Servers<'a>: ServerRepository
    where
        Self: 'a;
    type Reviews<'a>: ReviewRepository
    where
        Self: 'a;

    /// Establish the connection now instead of on first use.
    fn connect(&self) -> impl Future<Output = DbResult<()>> + Send;

    /// Release the connection. Safe when not connected.
    fn disconnect(&self) -> impl Future<Output = ()> + Send;

    /// Get the server repository.
    fn servers(&self) -> Self::Servers<'_>;

    /// Get the review repository.
    fn reviews(&self) -> Self::Reviews<'_>;
}
