//! Tests for the lazily established connection.

use std::sync::Arc;

use crate::db::{
    Database, DatabaseConfig, DbError, ErrorKind, ServerPayload, ServerRepository,
    SqliteDatabase, UserIdentity,
};

#[tokio::test(flavor = "multi_thread")]
async fn construction_does_not_connect() {
    let db = SqliteDatabase::in_memory();
    assert!(!db.connection().is_connected().await);
}

#[tokio::test(flavor = "multi_thread")]
async fn first_repository_call_connects_and_migrates() {
    let db = SqliteDatabase::in_memory();

    let servers = db.servers().list_public().await.expect("List should succeed");
    assert!(servers.is_empty());
    assert!(db.connection().is_connected().await);

    let tables: Vec<String> =
        sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .fetch_all(&db.connection().pool().await.unwrap())
            .await
            .expect("Query should succeed");
    for table in ["_sqlx_migrations", "review", "server"] {
        assert!(
            tables.iter().any(|t| t == table),
            "Missing table: {}. Found tables: {:?}",
            table,
            tables
        );
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn connect_is_idempotent() {
    let db = SqliteDatabase::in_memory();
    db.connect().await.expect("First connect should succeed");

    let owner = UserIdentity::new("u1");
    db.servers()
        .create(&ServerPayload::default(), &owner)
        .await
        .unwrap();

    // A second connect must not replace the live (in-memory) store
    db.connect().await.expect("Second connect should succeed");
    assert_eq!(db.servers().list_by_owner("u1").await.unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn disconnect_when_not_connected_is_safe() {
    let db = SqliteDatabase::in_memory();
    db.disconnect().await;
    db.disconnect().await;
    assert!(!db.connection().is_connected().await);
}

#[tokio::test(flavor = "multi_thread")]
async fn disconnect_then_reconnect_on_demand() {
    let db = SqliteDatabase::in_memory();
    db.connect().await.unwrap();
    db.disconnect().await;
    assert!(!db.connection().is_connected().await);

    db.servers().list_public().await.expect("Reconnect on demand");
    assert!(db.connection().is_connected().await);
}

#[tokio::test(flavor = "multi_thread")]
async fn missing_connection_string_is_configuration_error() {
    let db = SqliteDatabase::new(DatabaseConfig::default());

    let err = db.servers().list_public().await.unwrap_err();
    assert!(matches!(err, DbError::Configuration { .. }));
    assert_eq!(err.kind(), ErrorKind::Configuration);
}

#[tokio::test(flavor = "multi_thread")]
async fn unreachable_store_is_connection_error() {
    let db = SqliteDatabase::new(DatabaseConfig {
        url: Some("sqlite:///nonexistent-dir/deeper/market.db".to_string()),
        ..Default::default()
    });

    let err = db.connect().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Connection);
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_first_callers_share_one_store() {
    let db = Arc::new(SqliteDatabase::in_memory());

    let mut handles = Vec::new();
    for i in 0..8 {
        let db = Arc::clone(&db);
        handles.push(tokio::spawn(async move {
            let payload = ServerPayload {
                name: Some(format!("server-{}", i)),
                ..Default::default()
            };
            db.servers()
                .create(&payload, &UserIdentity::new("racer"))
                .await
                .expect("Create should succeed")
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    // Separate in-memory stores would each hold a single entry
    let mine = db.servers().list_by_owner("racer").await.unwrap();
    assert_eq!(mine.len(), 8);
}

#[tokio::test(flavor = "multi_thread")]
async fn file_store_uses_database_name() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("default.db").display());
    let db = SqliteDatabase::new(DatabaseConfig {
        url: Some(url),
        database_name: Some("named".to_string()),
        ..Default::default()
    });

    db.connect().await.expect("Connect should succeed");
    assert!(dir.path().join("named.db").exists());
    assert!(!dir.path().join("default.db").exists());
    db.disconnect().await;
}
