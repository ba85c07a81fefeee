//! Tests for database error types.

use crate::db::{DbError, DbResult, ErrorKind};

#[test]
fn not_found_error_displays_correctly() {
    let err = DbError::server_not_found("abc12345");
    assert_eq!(err.to_string(), "Server not found: 'abc12345'");
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn permission_error_mentions_action() {
    let err = DbError::server_permission("update");
    assert_eq!(
        err.to_string(),
        "You do not have permission to update this server"
    );
    assert_eq!(err.kind(), ErrorKind::Permission);
}

#[test]
fn configuration_error_displays_correctly() {
    let err = DbError::Configuration {
        message: "no connection string".to_string(),
    };
    assert_eq!(err.to_string(), "Configuration error: no connection string");
    assert_eq!(err.kind(), ErrorKind::Configuration);
}

#[test]
fn migration_and_database_errors_are_internal() {
    let migration = DbError::Migration {
        message: "failed to apply migration".to_string(),
    };
    let database = DbError::Database {
        message: "constraint violation".to_string(),
    };
    assert_eq!(migration.kind(), ErrorKind::Internal);
    assert_eq!(database.kind(), ErrorKind::Internal);
}

#[test]
fn pool_timeout_maps_to_connection_error() {
    let err: DbError = sqlx::Error::PoolTimedOut.into();
    assert_eq!(err.kind(), ErrorKind::Connection);
}

#[test]
fn row_not_found_maps_to_database_error() {
    let err: DbError = sqlx::Error::RowNotFound.into();
    assert_eq!(err.kind(), ErrorKind::Internal);
}

#[test]
fn db_result_err_returns_error() {
    let result: DbResult<i32> = Err(DbError::Validation {
        message: "bad id".to_string(),
    });
    assert!(result.is_err());
}
