//! SQLite ServerRepository implementation.
//!
//! Entries are JSON documents in `server.doc`. Partial updates use
//! `json_set` on top-level keys, so nested objects such as `config` are
//! replaced wholesale rather than merged.

use serde_json::{Map, Value, json};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::{debug, info, warn};

use super::connection::ConnectionManager;
use crate::db::utils::{current_timestamp, generate_entity_id, validate_entity_id};
use crate::db::{
    DbError, DbResult, MarketplaceServer, MarketplaceStats, ServerDoc, ServerPayload,
    ServerRepository, UserIdentity,
};

/// Absent or `true` visibility counts as public.
const PUBLIC_FILTER: &str = "coalesce(json_extract(doc, '$.isPublic'), 1) != 0";
const ORDER_NEWEST: &str = "ORDER BY json_extract(doc, '$.createdAt') DESC, rowid DESC";

/// SQLx-backed server repository.
pub struct SqliteServerRepository<'a> {
    pub(crate) conn: &'a ConnectionManager,
}

pub(crate) fn row_to_server(row: &SqliteRow) -> DbResult<MarketplaceServer> {
    let id: String = row.try_get("id")?;
    let doc: String = row.try_get("doc")?;
    let doc: ServerDoc = serde_json::from_str(&doc)?;
    Ok(MarketplaceServer::from_doc(id, doc))
}

/// Map listing rows, skipping documents that no longer decode.
fn rows_to_servers(rows: &[SqliteRow]) -> Vec<MarketplaceServer> {
    rows.iter()
        .filter_map(|row| match row_to_server(row) {
            Ok(server) => Some(server),
            Err(e) => {
                let id: String = row.try_get("id").unwrap_or_default();
                warn!(server_id = %id, error = %e, "Skipping undecodable entry");
                None
            }
        })
        .collect()
}

/// Build `UPDATE ... json_set(...)` for every key of `patch`.
///
/// Keys come from [`ServerPayload`] field names, never from user input.
fn build_set_statement(patch: &Map<String, Value>) -> (String, Vec<String>) {
    let mut assignments = Vec::with_capacity(patch.len());
    let mut values = Vec::with_capacity(patch.len());
    for (key, value) in patch {
        assignments.push(format!("'$.{}', json(?)", key));
        values.push(value.to_string());
    }
    (
        format!(
            "UPDATE server SET doc = json_set(doc, {}) WHERE id = ?",
            assignments.join(", ")
        ),
        values,
    )
}

impl SqliteServerRepository<'_> {
    async fn fetch_doc(pool: &SqlitePool, id: &str) -> DbResult<Option<ServerDoc>> {
        let doc: Option<String> = sqlx::query_scalar("SELECT doc FROM server WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await?;
        doc.map(|d| serde_json::from_str(&d).map_err(DbError::from))
            .transpose()
    }

    /// Load the entry and check `caller_id` may modify it.
    async fn authorize(
        pool: &SqlitePool,
        id: &str,
        caller_id: &str,
        action: &str,
    ) -> DbResult<ServerDoc> {
        let existing = Self::fetch_doc(pool, id)
            .await?
            .ok_or_else(|| DbError::server_not_found(id))?;

        if !existing.is_editable_by(caller_id) {
            warn!(server_id = id, caller_id, action, "Rejected change by non-owner");
            return Err(DbError::server_permission(action));
        }
        Ok(existing)
    }

    async fn try_increment(&self, id: &str, delta: i64) -> DbResult<u64> {
        validate_entity_id(id)?;
        let pool = self.conn.pool().await?;
        let result = sqlx::query(
            "UPDATE server SET doc = json_set(doc, '$.installCount', \
             coalesce(json_extract(doc, '$.installCount'), 0) + ?) WHERE id = ?",
        )
        .bind(delta)
        .bind(id)
        .execute(&pool)
        .await?;
        Ok(result.rows_affected())
    }
}

impl ServerRepository for SqliteServerRepository<'_> {
    async fn list_public(&self) -> DbResult<Vec<MarketplaceServer>> {
        let pool = self.conn.pool().await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM server")
            .fetch_one(&pool)
            .await?;

        let rows = sqlx::query(&format!(
            "SELECT id, doc FROM server WHERE {} {}",
            PUBLIC_FILTER, ORDER_NEWEST
        ))
        .fetch_all(&pool)
        .await?;

        // Debugging aid, not an access control.
        let rows = if rows.is_empty() && total > 0 && self.conn.config().public_fallback {
            warn!(
                total,
                "No entries matched the public filter, returning all entries"
            );
            sqlx::query(&format!("SELECT id, doc FROM server {}", ORDER_NEWEST))
                .fetch_all(&pool)
                .await?
        } else {
            rows
        };

        info!(count = rows.len(), total, "Listing public entries");
        Ok(rows_to_servers(&rows))
    }

    async fn list_by_owner(&self, owner_id: &str) -> DbResult<Vec<MarketplaceServer>> {
        let pool = self.conn.pool().await?;
        let rows = sqlx::query(&format!(
            "SELECT id, doc FROM server WHERE json_extract(doc, '$.ownerId') = ? {}",
            ORDER_NEWEST
        ))
        .bind(owner_id)
        .fetch_all(&pool)
        .await?;

        Ok(rows_to_servers(&rows))
    }

    async fn get(&self, id: &str) -> DbResult<Option<MarketplaceServer>> {
        validate_entity_id(id)?;
        let pool = self.conn.pool().await?;
        let row = sqlx::query("SELECT id, doc FROM server WHERE id = ?")
            .bind(id)
            .fetch_optional(&pool)
            .await?;

        row.as_ref().map(row_to_server).transpose()
    }

    async fn create(
        &self,
        payload: &ServerPayload,
        owner: &UserIdentity,
    ) -> DbResult<MarketplaceServer> {
        let pool = self.conn.pool().await?;

        let id = generate_entity_id();
        let now = current_timestamp();
        let doc = ServerDoc {
            fields: ServerPayload {
                name: Some(payload.name.clone().unwrap_or_default()),
                config: Some(payload.config.clone().unwrap_or_else(|| json!({}))),
                is_public: Some(payload.is_public.unwrap_or(true)),
                ..payload.clone()
            },
            created_at: Some(now.clone()),
            updated_at: Some(now),
            owner_id: Some(owner.id.clone()),
            owner_email: owner.email.clone(),
            owner_name: owner.name.clone(),
            rating: None,
            install_count: Some(0),
        };

        sqlx::query("INSERT INTO server (id, doc) VALUES (?, ?)")
            .bind(&id)
            .bind(serde_json::to_string(&doc)?)
            .execute(&pool)
            .await?;

        debug!(server_id = %id, owner_id = %owner.id, "Created entry");

        // Read back so callers see exactly what was stored
        self.get(&id).await?.ok_or_else(|| DbError::Database {
            message: "Failed to retrieve created server".to_string(),
        })
    }

    async fn update(
        &self,
        id: &str,
        payload: &ServerPayload,
        caller_id: &str,
    ) -> DbResult<MarketplaceServer> {
        validate_entity_id(id)?;
        let pool = self.conn.pool().await?;
        Self::authorize(&pool, id, caller_id, "update").await?;

        let mut patch = match serde_json::to_value(payload)? {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        patch.insert("updatedAt".to_string(), Value::String(current_timestamp()));

        let (sql, values) = build_set_statement(&patch);
        let mut query = sqlx::query(&sql);
        for value in &values {
            query = query.bind(value.as_str());
        }
        let result = query.bind(id).execute(&pool).await?;

        if result.rows_affected() == 0 {
            return Err(DbError::server_not_found(id));
        }

        debug!(server_id = id, fields = patch.len(), "Updated entry");

        self.get(id)
            .await?
            .ok_or_else(|| DbError::server_not_found(id))
    }

    async fn delete(&self, id: &str, caller_id: &str) -> DbResult<()> {
        validate_entity_id(id)?;
        let pool = self.conn.pool().await?;
        Self::authorize(&pool, id, caller_id, "delete").await?;

        let result = sqlx::query("DELETE FROM server WHERE id = ?")
            .bind(id)
            .execute(&pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::server_not_found(id));
        }

        debug!(server_id = id, "Deleted entry");
        Ok(())
    }

    async fn increment_install_count(&self, id: &str, delta: i64) {
        match self.try_increment(id, delta).await {
            Ok(0) => debug!(server_id = id, delta, "Install tracking matched no entry"),
            Ok(_) => debug!(server_id = id, delta, "Install count adjusted"),
            Err(e) => {
                let err = DbError::Tracking {
                    message: e.to_string(),
                };
                warn!(server_id = id, delta, error = %err, "Ignoring install tracking failure");
            }
        }
    }

    async fn stats(&self, owner_id: Option<&str>) -> DbResult<MarketplaceStats> {
        let pool = self.conn.pool().await?;
        let row = sqlx::query(&format!(
            "SELECT COUNT(*) AS total, \
             coalesce(sum(CASE WHEN {} THEN 1 ELSE 0 END), 0) AS public, \
             COUNT(DISTINCT nullif(json_extract(doc, '$.ownerId'), '')) AS owners, \
             coalesce(sum(CASE WHEN json_extract(doc, '$.ownerId') = ? THEN 1 ELSE 0 END), 0) AS mine \
             FROM server",
            PUBLIC_FILTER
        ))
        .bind(owner_id)
        .fetch_one(&pool)
        .await?;

        Ok(MarketplaceStats {
            total_servers: row.try_get("total")?,
            public_servers: row.try_get("public")?,
            total_owners: row.try_get("owners")?,
            user_servers: row.try_get("mine")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_statement_addresses_each_key() {
        let mut patch = Map::new();
        patch.insert("description".to_string(), json!("v2"));
        patch.insert("isPublic".to_string(), json!(false));

        let (sql, values) = build_set_statement(&patch);
        assert_eq!(
            sql,
            "UPDATE server SET doc = json_set(doc, '$.description', json(?), '$.isPublic', json(?)) WHERE id = ?"
        );
        assert_eq!(values, vec!["\"v2\"".to_string(), "false".to_string()]);
    }
}
