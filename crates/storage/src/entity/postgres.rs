//! `PostgreSQL` implementation of the entity store.
//!
//! One wide table holds every partition: a composite `(partition_key,
//! row_key)` primary key and a JSONB attribute column. The composite key
//! makes within-partition scans an index range read, which is the access
//! pattern the adapter's contract is built around.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;

use super::{EntityRow, EntityStore, EntityStoreError};

/// Entity store backed by a `PostgreSQL` JSONB table.
#[derive(Clone)]
pub struct TableStore {
    pool: PgPool,
}

/// Internal row type for entity queries.
#[derive(Debug, sqlx::FromRow)]
struct StoredRow {
    partition_key: String,
    row_key: String,
    fields: Json<serde_json::Map<String, serde_json::Value>>,
    updated_at: DateTime<Utc>,
}

impl From<StoredRow> for EntityRow {
    fn from(row: StoredRow) -> Self {
        Self {
            partition_key: row.partition_key,
            row_key: row.row_key,
            fields: row.fields.0,
            timestamp: Some(row.updated_at),
        }
    }
}

impl TableStore {
    /// Create the adapter over an existing connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Idempotently create the entity table.
    ///
    /// # Errors
    ///
    /// Returns `EntityStoreError::Database` if the statement fails.
    pub async fn init(&self) -> Result<(), EntityStoreError> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS entities (
                partition_key TEXT NOT NULL,
                row_key       TEXT NOT NULL,
                fields        JSONB NOT NULL DEFAULT '{}'::jsonb,
                updated_at    TIMESTAMPTZ NOT NULL DEFAULT now(),
                PRIMARY KEY (partition_key, row_key)
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl EntityStore for TableStore {
    async fn insert(&self, row: EntityRow) -> Result<(), EntityStoreError> {
        let result = sqlx::query(
            r"
            INSERT INTO entities (partition_key, row_key, fields)
            VALUES ($1, $2, $3)
            ON CONFLICT DO NOTHING
            ",
        )
        .bind(&row.partition_key)
        .bind(&row.row_key)
        .bind(Json(&row.fields))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(EntityStoreError::Conflict {
                partition: row.partition_key,
                row_key: row.row_key,
            });
        }

        Ok(())
    }

    async fn get(
        &self,
        partition: &str,
        row_key: &str,
    ) -> Result<Option<EntityRow>, EntityStoreError> {
        let row = sqlx::query_as::<_, StoredRow>(
            r"
            SELECT partition_key, row_key, fields, updated_at
            FROM entities
            WHERE partition_key = $1 AND row_key = $2
            ",
        )
        .bind(partition)
        .bind(row_key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(EntityRow::from))
    }

    async fn query_partition(&self, partition: &str) -> Result<Vec<EntityRow>, EntityStoreError> {
        let rows = sqlx::query_as::<_, StoredRow>(
            r"
            SELECT partition_key, row_key, fields, updated_at
            FROM entities
            WHERE partition_key = $1
            ORDER BY row_key
            ",
        )
        .bind(partition)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(EntityRow::from).collect())
    }

    async fn upsert(&self, row: EntityRow) -> Result<(), EntityStoreError> {
        sqlx::query(
            r"
            INSERT INTO entities (partition_key, row_key, fields)
            VALUES ($1, $2, $3)
            ON CONFLICT (partition_key, row_key)
            DO UPDATE SET fields = EXCLUDED.fields, updated_at = now()
            ",
        )
        .bind(&row.partition_key)
        .bind(&row.row_key)
        .bind(Json(&row.fields))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, partition: &str, row_key: &str) -> Result<(), EntityStoreError> {
        sqlx::query("DELETE FROM entities WHERE partition_key = $1 AND row_key = $2")
            .bind(partition)
            .bind(row_key)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
