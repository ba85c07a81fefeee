//! Client-side cache of marketplace listings.
//!
//! Holds "all public servers" and "my servers", each with loading and error
//! flags, plus busy flags for in-flight mutations. State is published on a
//! [`watch`] channel. Fetch failures become state; mutations return their
//! result and then refetch both lists instead of merging locally.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures_util::future::join;
use tokio::sync::watch;
use tracing::{debug, warn};

use super::api_client::MarketplaceApi;
use super::error::{ClientError, ClientResult};
use super::identity::IdentityProvider;
use crate::db::{MarketplaceServer, ServerPayload};

pub const SERVICE_DOWN_MESSAGE: &str =
    "API server is not running. Please start the marketplace API service.";

/// One cached list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListState {
    pub data: Vec<MarketplaceServer>,
    pub loading: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarketplaceState {
    pub servers: ListState,
    pub my_servers: ListState,
    pub creating: bool,
    pub updating: bool,
    pub deleting: bool,
}

#[derive(Debug, Clone, Copy)]
enum Busy {
    Creating,
    Updating,
    Deleting,
}

impl Busy {
    fn flag(self, state: &mut MarketplaceState) -> &mut bool {
        match self {
            Busy::Creating => &mut state.creating,
            Busy::Updating => &mut state.updating,
            Busy::Deleting => &mut state.deleting,
        }
    }
}

/// Clears a busy flag however the mutation ends.
struct BusyGuard<'a, A: MarketplaceApi, I: IdentityProvider> {
    store: &'a MarketplaceStore<A, I>,
    busy: Busy,
}

impl<A: MarketplaceApi, I: IdentityProvider> Drop for BusyGuard<'_, A, I> {
    fn drop(&mut self) {
        let busy = self.busy;
        self.store.apply(|s| *busy.flag(s) = false);
    }
}

/// Which list a fetch targets; picks the fallback messages.
#[derive(Debug, Clone, Copy)]
enum Listing {
    Public,
    Mine,
}

impl Listing {
    fn list(self, state: &mut MarketplaceState) -> &mut ListState {
        match self {
            Listing::Public => &mut state.servers,
            Listing::Mine => &mut state.my_servers,
        }
    }

    fn error_message(self, err: &ClientError) -> String {
        match (err, self) {
            (ClientError::ConnectionFailed { .. }, _) => SERVICE_DOWN_MESSAGE.to_string(),
            (ClientError::Api { message, .. }, _) if !message.is_empty() => message.clone(),
            (ClientError::Api { .. }, Listing::Public) => "Failed to fetch servers".to_string(),
            (ClientError::Api { .. }, Listing::Mine) => "Failed to fetch your servers".to_string(),
            (ClientError::InvalidResponse { .. }, Listing::Public) => {
                "Network error while fetching servers".to_string()
            }
            (ClientError::InvalidResponse { .. }, Listing::Mine) => {
                "Network error while fetching your servers".to_string()
            }
        }
    }
}

pub struct MarketplaceStore<A, I> {
    api: A,
    identity: Arc<I>,
    state: watch::Sender<MarketplaceState>,
    attached: AtomicBool,
}

impl<A: MarketplaceApi, I: IdentityProvider> MarketplaceStore<A, I> {
    pub fn new(api: A, identity: Arc<I>) -> Self {
        let (state, _) = watch::channel(MarketplaceState::default());
        Self {
            api,
            identity,
            state,
            attached: AtomicBool::new(true),
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> MarketplaceState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<MarketplaceState> {
        self.state.subscribe()
    }

    /// Stop publishing. Results of requests still in flight are dropped.
    pub fn detach(&self) {
        self.attached.store(false, Ordering::SeqCst);
    }

    pub fn is_attached(&self) -> bool {
        self.attached.load(Ordering::SeqCst)
    }

    fn apply(&self, update: impl FnOnce(&mut MarketplaceState)) {
        if !self.is_attached() {
            debug!("Store detached, discarding state update");
            return;
        }
        self.state.send_modify(update);
    }

    fn begin(&self, busy: Busy) -> BusyGuard<'_, A, I> {
        self.apply(|s| *busy.flag(s) = true);
        BusyGuard { store: self, busy }
    }

    async fn fetch(&self, listing: Listing) {
        self.apply(|s| {
            let list = listing.list(s);
            list.loading = true;
            list.error = None;
        });

        let result = match listing {
            Listing::Public => self.api.get_servers().await,
            Listing::Mine => self.api.get_my_servers().await,
        };

        match result {
            Ok(data) => {
                debug!(?listing, count = data.len(), "Fetched servers");
                self.apply(|s| {
                    let list = listing.list(s);
                    list.data = data;
                    list.loading = false;
                });
            }
            Err(e) => {
                warn!(?listing, error = %e, "Failed to fetch servers");
                let message = listing.error_message(&e);
                self.apply(|s| {
                    let list = listing.list(s);
                    list.error = Some(message);
                    list.loading = false;
                });
            }
        }
    }

    /// Reload the public listing.
    pub async fn fetch_servers(&self) {
        self.fetch(Listing::Public).await
    }

    /// Reload the caller's listing, or clear it when signed out.
    pub async fn fetch_my_servers(&self) {
        if !self.identity.is_authenticated() {
            self.apply(|s| {
                s.my_servers.data.clear();
                s.my_servers.loading = false;
            });
            return;
        }
        self.fetch(Listing::Mine).await
    }

    pub async fn refresh_all(&self) {
        join(self.fetch_servers(), self.fetch_my_servers()).await;
    }

    /// Reload only the public listing, e.g. after an install changed a count.
    pub async fn refresh_server_data(&self) {
        self.fetch_servers().await
    }

    /// Bring both lists in line with the current identity. Call on attach
    /// and whenever the user signs in or out.
    pub async fn sync(&self) {
        debug!(
            authenticated = self.identity.is_authenticated(),
            "Syncing marketplace store"
        );
        self.refresh_all().await
    }

    pub async fn create_server(&self, payload: &ServerPayload) -> ClientResult<MarketplaceServer> {
        let _busy = self.begin(Busy::Creating);
        let created = self.api.create_server(payload).await?;
        self.refresh_all().await;
        Ok(created)
    }

    pub async fn update_server(
        &self,
        id: &str,
        payload: &ServerPayload,
    ) -> ClientResult<MarketplaceServer> {
        let _busy = self.begin(Busy::Updating);
        let updated = self.api.update_server(id, payload).await?;
        self.refresh_all().await;
        Ok(updated)
    }

    /// Delete, drop the entry from both lists at once, then refetch.
    pub async fn delete_server(&self, id: &str) -> ClientResult<()> {
        let _busy = self.begin(Busy::Deleting);
        self.api.delete_server(id).await?;
        self.apply(|s| {
            s.servers.data.retain(|server| server.id != id);
            s.my_servers.data.retain(|server| server.id != id);
        });
        self.refresh_all().await;
        Ok(())
    }

    pub async fn track_install(&self, id: &str) -> ClientResult<()> {
        self.api.track_install(id).await
    }

    pub async fn track_uninstall(&self, id: &str) -> ClientResult<()> {
        self.api.track_uninstall(id).await
    }

    /// Prefers the API's `isOwner` flag, else compares owner ids.
    pub fn is_owner(&self, server: &MarketplaceServer) -> bool {
        if let Some(flag) = server.is_owner {
            return flag;
        }
        match (self.identity.current_user(), server.owner_id.as_deref()) {
            (Some(user), Some(owner)) => !user.id.is_empty() && owner == user.id,
            _ => false,
        }
    }

    /// Signed-in callers may edit their own entries and ownerless ones.
    pub fn can_edit(&self, server: &MarketplaceServer) -> bool {
        let Some(user) = self.identity.current_user() else {
            return false;
        };
        if let Some(flag) = server.can_edit.or(server.is_owner) {
            return flag;
        }
        match server.owner_id.as_deref() {
            None | Some("") => true,
            Some(owner) => !user.id.is_empty() && owner == user.id,
        }
    }
}
