use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde_json::json;
use tokio::net::TcpListener;

use crate::api::{API_PREFIX, AppState, create_router};
use crate::client::{
    ClientError, ClientResult, IdentityProvider, MarketplaceApi, MarketplaceClient,
    MarketplaceState, MarketplaceStore, SERVICE_DOWN_MESSAGE, StaticIdentity,
};
use crate::db::{
    MarketplaceServer, MarketplaceStats, ReviewEntry, ServerPayload, SqliteDatabase, UserIdentity,
};

type Store = MarketplaceStore<MarketplaceClient<StaticIdentity>, StaticIdentity>;

async fn spawn_test_server() -> (String, tokio::task::JoinHandle<()>) {
    let app = create_router(AppState::new(SqliteDatabase::in_memory()));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}{}", addr, API_PREFIX), handle)
}

fn store_for(url: &str, identity: StaticIdentity) -> Store {
    let identity = Arc::new(identity);
    let client = MarketplaceClient::new(Some(url.to_string()), Arc::clone(&identity));
    MarketplaceStore::new(client, identity)
}

fn signed_in(id: &str) -> StaticIdentity {
    StaticIdentity::signed_in(UserIdentity::new(id))
}

fn payload(name: &str) -> ServerPayload {
    ServerPayload {
        name: Some(name.to_string()),
        config: Some(json!({"command": "node"})),
        ..Default::default()
    }
}

fn entry(owner: Option<&str>) -> MarketplaceServer {
    serde_json::from_value(json!({
        "id": "0123456789abcdef0123456789abcdef",
        "name": "fs",
        "ownerId": owner,
    }))
    .unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn test_sync_loads_both_lists() {
    let (url, _handle) = spawn_test_server().await;
    let store = store_for(&url, signed_in("u1"));
    store.api().create_server(&payload("a")).await.unwrap();
    let other = store_for(&url, signed_in("u2"));
    other.api().create_server(&payload("b")).await.unwrap();

    store.sync().await;

    let state = store.state();
    assert_eq!(state.servers.data.len(), 2);
    assert!(!state.servers.loading);
    assert!(state.servers.error.is_none());
    assert_eq!(state.my_servers.data.len(), 1);
    assert_eq!(state.my_servers.data[0].name, "a");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_fetch_my_servers_clears_when_signed_out() {
    let (url, _handle) = spawn_test_server().await;
    let identity = Arc::new(signed_in("u1"));
    let client = MarketplaceClient::new(Some(url), Arc::clone(&identity));
    let store = MarketplaceStore::new(client, Arc::clone(&identity));
    store.create_server(&payload("a")).await.unwrap();
    assert_eq!(store.state().my_servers.data.len(), 1);

    identity.sign_out();
    store.fetch_my_servers().await;

    let state = store.state();
    assert!(state.my_servers.data.is_empty());
    assert!(!state.my_servers.loading);
    assert_eq!(state.servers.data.len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_create_refetches_server_assigned_fields() {
    let (url, _handle) = spawn_test_server().await;
    let store = store_for(&url, signed_in("u1"));

    let created = store.create_server(&payload("a")).await.unwrap();

    let state = store.state();
    assert!(!state.creating);
    assert_eq!(state.servers.data[0].id, created.id);
    assert_eq!(state.servers.data[0].install_count, 0);
    assert!(state.servers.data[0].created_at.is_some());
    assert_eq!(state.my_servers.data[0].id, created.id);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_update_refetches_lists() {
    let (url, _handle) = spawn_test_server().await;
    let store = store_for(&url, signed_in("u1"));
    let created = store.create_server(&payload("a")).await.unwrap();

    let patch = ServerPayload {
        description: Some("v2".to_string()),
        ..Default::default()
    };
    store.update_server(&created.id, &patch).await.unwrap();

    let state = store.state();
    assert!(!state.updating);
    assert_eq!(state.servers.data[0].description.as_deref(), Some("v2"));
    assert_eq!(state.my_servers.data[0].description.as_deref(), Some("v2"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_failed_mutation_returns_error_and_clears_flag() {
    let (url, _handle) = spawn_test_server().await;
    let owner = store_for(&url, signed_in("u1"));
    let created = owner.create_server(&payload("a")).await.unwrap();

    let intruder = store_for(&url, signed_in("u2"));
    let err = intruder.delete_server(&created.id).await.unwrap_err();
    assert_eq!(err.status(), Some(403));

    let state = intruder.state();
    assert!(!state.deleting);

    owner.refresh_server_data().await;
    assert_eq!(owner.state().servers.data.len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_delete_removes_entry_from_both_lists() {
    let (url, _handle) = spawn_test_server().await;
    let store = store_for(&url, signed_in("u1"));
    let keep = store.create_server(&payload("keep")).await.unwrap();
    let gone = store.create_server(&payload("gone")).await.unwrap();
    assert_eq!(store.state().servers.data.len(), 2);

    store.delete_server(&gone.id).await.unwrap();

    let state = store.state();
    assert!(!state.deleting);
    assert_eq!(state.servers.data.len(), 1);
    assert_eq!(state.servers.data[0].id, keep.id);
    assert_eq!(state.my_servers.data.len(), 1);
}

/// Serves a fixed listing until a delete, then fails every fetch.
struct FailAfterDelete {
    servers: Vec<MarketplaceServer>,
    deleted: AtomicBool,
}

impl FailAfterDelete {
    fn new(ids: &[&str]) -> Self {
        let servers = ids
            .iter()
            .map(|id| {
                serde_json::from_value(json!({"id": id, "name": id, "ownerId": "u1"})).unwrap()
            })
            .collect();
        Self {
            servers,
            deleted: AtomicBool::new(false),
        }
    }

    fn listing(&self) -> ClientResult<Vec<MarketplaceServer>> {
        if self.deleted.load(Ordering::SeqCst) {
            return Err(ClientError::Api {
                status: 500,
                message: "listing unavailable".to_string(),
            });
        }
        Ok(self.servers.clone())
    }

    fn unsupported<T>() -> ClientResult<T> {
        Err(ClientError::Api {
            status: 501,
            message: "unsupported".to_string(),
        })
    }
}

impl MarketplaceApi for FailAfterDelete {
    async fn get_servers(&self) -> ClientResult<Vec<MarketplaceServer>> {
        self.listing()
    }

    async fn get_my_servers(&self) -> ClientResult<Vec<MarketplaceServer>> {
        self.listing()
    }

    async fn get_server(&self, _id: &str) -> ClientResult<MarketplaceServer> {
        Self::unsupported()
    }

    async fn create_server(&self, _payload: &ServerPayload) -> ClientResult<MarketplaceServer> {
        Self::unsupported()
    }

    async fn update_server(
        &self,
        _id: &str,
        _payload: &ServerPayload,
    ) -> ClientResult<MarketplaceServer> {
        Self::unsupported()
    }

    async fn delete_server(&self, _id: &str) -> ClientResult<()> {
        self.deleted.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn track_install(&self, _id: &str) -> ClientResult<()> {
        Ok(())
    }

    async fn track_uninstall(&self, _id: &str) -> ClientResult<()> {
        Ok(())
    }

    async fn get_reviews(&self, _id: &str) -> ClientResult<Vec<ReviewEntry>> {
        Ok(Vec::new())
    }

    async fn create_review(
        &self,
        _id: &str,
        _rating: i64,
        _review: Option<&str>,
    ) -> ClientResult<ReviewEntry> {
        Self::unsupported()
    }

    async fn get_stats(&self) -> ClientResult<MarketplaceStats> {
        Self::unsupported()
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_delete_removes_locally_before_refetch() {
    let keep = "0123456789abcdef0123456789abcdef";
    let gone = "fedcba9876543210fedcba9876543210";
    let store = MarketplaceStore::new(
        FailAfterDelete::new(&[keep, gone]),
        Arc::new(signed_in("u1")),
    );
    store.refresh_all().await;
    assert_eq!(store.state().servers.data.len(), 2);
    assert_eq!(store.state().my_servers.data.len(), 2);

    store.delete_server(gone).await.unwrap();

    let state = store.state();
    assert!(!state.deleting);
    assert_eq!(state.servers.error.as_deref(), Some("listing unavailable"));
    assert_eq!(state.my_servers.error.as_deref(), Some("listing unavailable"));
    let ids: Vec<_> = state.servers.data.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec![keep]);
    assert_eq!(state.my_servers.data.len(), 1);
    assert_eq!(state.my_servers.data[0].id, keep);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_track_install_is_visible_after_refresh() {
    let (url, _handle) = spawn_test_server().await;
    let store = store_for(&url, signed_in("u1"));
    let created = store.create_server(&payload("a")).await.unwrap();

    store.track_install(&created.id).await.unwrap();
    store.refresh_server_data().await;

    assert_eq!(store.state().servers.data[0].install_count, 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_connection_refused_sets_service_down_message() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let store = store_for(&format!("http://{}", addr), signed_in("u1"));
    store.refresh_all().await;

    let state = store.state();
    assert_eq!(state.servers.error.as_deref(), Some(SERVICE_DOWN_MESSAGE));
    assert_eq!(state.my_servers.error.as_deref(), Some(SERVICE_DOWN_MESSAGE));
    assert!(!state.servers.loading);
    assert!(state.servers.data.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_subscribers_see_updates() {
    let (url, _handle) = spawn_test_server().await;
    let store = store_for(&url, signed_in("u1"));
    let mut rx = store.subscribe();

    store.create_server(&payload("a")).await.unwrap();

    assert!(rx.has_changed().unwrap());
    assert_eq!(rx.borrow_and_update().servers.data.len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_detached_store_discards_results() {
    let (url, _handle) = spawn_test_server().await;
    let store = store_for(&url, signed_in("u1"));
    store.api().create_server(&payload("a")).await.unwrap();

    store.detach();
    store.refresh_all().await;

    assert!(!store.is_attached());
    assert_eq!(store.state(), MarketplaceState::default());
}

// =============================================================================
// Ownership helpers
// =============================================================================

#[test]
fn test_ownership_prefers_api_flags() {
    let store = store_for("http://unused", signed_in("u1"));
    let mut server = entry(Some("u1"));
    server.is_owner = Some(false);
    server.can_edit = Some(false);

    assert!(!store.is_owner(&server));
    assert!(!store.can_edit(&server));
}

#[test]
fn test_ownership_falls_back_to_owner_id() {
    let store = store_for("http://unused", signed_in("u1"));

    assert!(store.is_owner(&entry(Some("u1"))));
    assert!(store.can_edit(&entry(Some("u1"))));
    assert!(!store.is_owner(&entry(Some("u2"))));
    assert!(!store.can_edit(&entry(Some("u2"))));
}

#[test]
fn test_ownerless_entry_is_editable_when_signed_in() {
    let signed = store_for("http://unused", signed_in("u1"));
    assert!(signed.can_edit(&entry(None)));
    assert!(!signed.is_owner(&entry(None)));

    let anonymous = store_for("http://unused", StaticIdentity::anonymous());
    assert!(!anonymous.can_edit(&entry(None)));
    assert!(!anonymous.is_owner(&entry(Some("u1"))));
}
