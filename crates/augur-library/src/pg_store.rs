//! `PostgreSQL` implementation of the `ReadingStore` trait.

use async_trait::async_trait;
use augur_core::error::ReadingError;
use augur_core::store::{NewReadingRecord, ReadingPayload, ReadingRecord, ReadingStore};
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::schema::CREATE_READINGS_TABLE;

/// PostgreSQL-backed reading store.
#[derive(Debug, Clone)]
pub struct PgReadingStore {
    pool: PgPool,
}

fn persistence(e: impl std::fmt::Display) -> ReadingError {
    ReadingError::PersistenceFailed(e.to_string())
}

impl PgReadingStore {
    /// Creates a new `PgReadingStore`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the readings table and index if they do not exist.
    ///
    /// # Errors
    ///
    /// Returns the driver error if the DDL fails.
    pub async fn ensure_schema(&self) -> Result<(), sqlx::Error> {
        sqlx::raw_sql(CREATE_READINGS_TABLE).execute(&self.pool).await?;
        Ok(())
    }
}

fn row_to_record(row: &PgRow) -> Result<ReadingRecord, ReadingError> {
    let id: Uuid = row.try_get("id").map_err(persistence)?;
    let payload: serde_json::Value = row.try_get("payload").map_err(persistence)?;
    let created_at: DateTime<Utc> = row.try_get("created_at").map_err(persistence)?;
    Ok(ReadingRecord {
        id: id.to_string(),
        user_id: row.try_get("user_id").map_err(persistence)?,
        record_type: row.try_get("record_type").map_err(persistence)?,
        created_at,
        payload: serde_json::from_value::<ReadingPayload>(payload).map_err(persistence)?,
    })
}

#[async_trait]
impl ReadingStore for PgReadingStore {
    async fn insert(&self, record: NewReadingRecord) -> Result<ReadingRecord, ReadingError> {
        let payload = serde_json::to_value(&record.payload).map_err(persistence)?;
        let row = sqlx::query(
            "INSERT INTO readings (user_id, record_type, created_at, payload) \
             VALUES ($1, $2, $3, $4) RETURNING id",
        )
        .bind(&record.user_id)
        .bind(&record.record_type)
        .bind(record.created_at)
        .bind(payload)
        .fetch_one(&self.pool)
        .await
        .map_err(persistence)?;

        let id: Uuid = row.try_get("id").map_err(persistence)?;
        debug!(%id, "reading inserted");
        Ok(record.with_id(id.to_string()))
    }

    /// Rows whose payload no longer decodes are skipped, not reported.
    async fn select_by_user(
        &self,
        user_id: &str,
        record_type: &str,
        limit: usize,
    ) -> Result<Vec<ReadingRecord>, ReadingError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = sqlx::query(
            "SELECT id, user_id, record_type, created_at, payload FROM readings \
             WHERE user_id = $1 AND record_type = $2 \
             ORDER BY created_at DESC LIMIT $3",
        )
        .bind(user_id)
        .bind(record_type)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(persistence)?;

        Ok(rows
            .iter()
            .filter_map(|row| {
                row_to_record(row)
                    .inspect_err(|e| warn!(error = %e, "skipping undecodable reading row"))
                    .ok()
            })
            .collect())
    }

    async fn delete_by_id(&self, id: &str, user_id: &str) -> Result<(), ReadingError> {
        let id = Uuid::parse_str(id)
            .map_err(|e| ReadingError::Validation(format!("invalid reading id: {e}")))?;
        sqlx::query("DELETE FROM readings WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(persistence)?;
        Ok(())
    }
}
