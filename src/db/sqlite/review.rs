//! SQLite ReviewRepository implementation.

use sqlx::Row;
use sqlx::sqlite::SqliteRow;
use tracing::debug;

use super::connection::ConnectionManager;
use crate::db::utils::{current_timestamp, generate_entity_id, validate_entity_id};
use crate::db::{DbError, DbResult, Rating, ReviewEntry, ReviewRepository, UserIdentity};

const REVIEW_COLUMNS: &str =
    "id, server_id, user_id, user_name, user_email, rating, review, created_at, updated_at";

/// SQLx-backed review repository.
pub struct SqliteReviewRepository<'a> {
    pub(crate) conn: &'a ConnectionManager,
}

fn row_to_review(row: &SqliteRow) -> DbResult<ReviewEntry> {
    Ok(ReviewEntry {
        id: row.try_get("id")?,
        server_id: row.try_get("server_id")?,
        user_id: row.try_get("user_id")?,
        user_name: row.try_get("user_name")?,
        user_email: row.try_get("user_email")?,
        rating: row.try_get("rating")?,
        review: row.try_get("review")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

impl ReviewRepository for SqliteReviewRepository<'_> {
    async fn list(&self, server_id: &str) -> DbResult<Vec<ReviewEntry>> {
        validate_entity_id(server_id)?;
        let pool = self.conn.pool().await?;
        let rows = sqlx::query(&format!(
            "SELECT {} FROM review WHERE server_id = ? ORDER BY created_at DESC, rowid DESC",
            REVIEW_COLUMNS
        ))
        .bind(server_id)
        .fetch_all(&pool)
        .await?;

        rows.iter().map(row_to_review).collect()
    }

    async fn upsert(
        &self,
        server_id: &str,
        reviewer: &UserIdentity,
        rating: i64,
        review: Option<&str>,
    ) -> DbResult<ReviewEntry> {
        validate_entity_id(server_id)?;
        if !(1..=5).contains(&rating) {
            return Err(DbError::Validation {
                message: format!("rating must be between 1 and 5, got {}", rating),
            });
        }

        let pool = self.conn.pool().await?;
        let mut tx = pool.begin().await?;

        let exists: Option<String> = sqlx::query_scalar("SELECT id FROM server WHERE id = ?")
            .bind(server_id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(DbError::server_not_found(server_id));
        }

        // One review per (server, user); a repeat replaces the earlier one.
        sqlx::query(
            "INSERT INTO review (id, server_id, user_id, user_name, user_email, rating, review, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT (server_id, user_id) DO UPDATE SET \
             rating = excluded.rating, review = excluded.review, \
             user_name = excluded.user_name, user_email = excluded.user_email, \
             updated_at = excluded.created_at",
        )
        .bind(generate_entity_id())
        .bind(server_id)
        .bind(&reviewer.id)
        .bind(reviewer.name.as_deref().unwrap_or_default())
        .bind(reviewer.email.as_deref().unwrap_or_default())
        .bind(rating)
        .bind(review)
        .bind(current_timestamp())
        .execute(&mut *tx)
        .await?;

        let counts: Vec<(i64, i64)> =
            sqlx::query_as("SELECT rating, COUNT(*) FROM review WHERE server_id = ? GROUP BY rating")
                .bind(server_id)
                .fetch_all(&mut *tx)
                .await?;
        let aggregate = Rating::from_counts(&counts);

        sqlx::query("UPDATE server SET doc = json_set(doc, '$.rating', json(?)) WHERE id = ?")
            .bind(serde_json::to_string(&aggregate)?)
            .bind(server_id)
            .execute(&mut *tx)
            .await?;

        let row = sqlx::query(&format!(
            "SELECT {} FROM review WHERE server_id = ? AND user_id = ?",
            REVIEW_COLUMNS
        ))
        .bind(server_id)
        .bind(&reviewer.id)
        .fetch_one(&mut *tx)
        .await?;
        let entry = row_to_review(&row)?;

        tx.commit().await?;

        debug!(
            server_id,
            user_id = %reviewer.id,
            rating,
            average = aggregate.average,
            "Stored review"
        );
        Ok(entry)
    }
}
