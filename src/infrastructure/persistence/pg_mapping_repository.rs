//! PostgreSQL implementation of the mapping repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;
use sqlx::{FromRow, PgPool};
use std::sync::Arc;

use crate::domain::entities::UrlMapping;
use crate::domain::repositories::MappingRepository;
use crate::error::AppError;

const SELECT_COLUMNS: &str =
    "SELECT id, short_code, original_url, click_count, created_at, last_accessed_at FROM url_mappings";

#[derive(FromRow)]
struct MappingRow {
    id: i64,
    short_code: String,
    original_url: String,
    click_count: i64,
    created_at: DateTime<Utc>,
    last_accessed_at: Option<DateTime<Utc>>,
}

impl From<MappingRow> for UrlMapping {
    fn from(row: MappingRow) -> Self {
        UrlMapping {
            id: row.id,
            short_code: row.short_code,
            original_url: row.original_url,
            click_count: row.click_count,
            created_at: row.created_at,
            last_accessed_at: row.last_accessed_at,
        }
    }
}

/// PostgreSQL repository for URL mappings.
///
/// Uniqueness of `short_code` and `original_url` is enforced by table
/// constraints, the latter on a SHA-256 digest column so URLs of any length
/// fit the index. A losing concurrent insert surfaces as [`AppError::Conflict`].
pub struct PgMappingRepository {
    pool: Arc<PgPool>,
}

impl PgMappingRepository {
    /// Creates a new repository with a database connection pool.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MappingRepository for PgMappingRepository {
    async fn find_by_code(&self, code: &str) -> Result<Option<UrlMapping>, AppError> {
        let row = sqlx::query_as::<_, MappingRow>(&format!("{SELECT_COLUMNS} WHERE short_code = $1"))
            .bind(code)
            .fetch_optional(self.pool.as_ref())
            .await?;

        Ok(row.map(Into::into))
    }

    async fn find_by_original(&self, original: &str) -> Result<Option<UrlMapping>, AppError> {
        let row =
            sqlx::query_as::<_, MappingRow>(&format!(
                "{SELECT_COLUMNS} WHERE original_url_sha256 = sha256($1::text::bytea) AND original_url = $1"
            ))
                .bind(original)
                .fetch_optional(self.pool.as_ref())
                .await?;

        Ok(row.map(Into::into))
    }

    async fn create(&self, code: &str, original: &str) -> Result<UrlMapping, AppError> {
        let row = sqlx::query_as::<_, MappingRow>(
            r#"
            INSERT INTO url_mappings (short_code, original_url)
            VALUES ($1, $2)
            RETURNING id, short_code, original_url, click_count, created_at, last_accessed_at
            "#,
        )
        .bind(code)
        .bind(original)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(row.into())
    }

    async fn increment_clicks(&self, code: &str, delta: i64) -> Result<(), AppError> {
        if delta < 1 {
            return Err(AppError::invalid_input(
                "Click delta must be positive",
                json!({ "code": code, "delta": delta }),
            ));
        }

        let updated = sqlx::query(
            r#"
            UPDATE url_mappings
            SET click_count = click_count + $2, last_accessed_at = now()
            WHERE short_code = $1
            "#,
        )
        .bind(code)
        .bind(delta)
        .execute(self.pool.as_ref())
        .await?;

        if updated.rows_affected() == 0 {
            return Err(AppError::not_found(
                "Short code not found",
                json!({ "code": code }),
            ));
        }

        Ok(())
    }

    async fn list(&self, offset: i64, limit: i64) -> Result<Vec<UrlMapping>, AppError> {
        let rows = sqlx::query_as::<_, MappingRow>(&format!(
            "{SELECT_COLUMNS} ORDER BY created_at DESC, id DESC LIMIT $1 OFFSET $2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(self.pool.as_ref())
            .await?;
        Ok(())
    }
}
