//! `PostgreSQL` implementation of the message queue.
//!
//! A single table holds every topic. Receiving is an `UPDATE ... FROM
//! (SELECT ... FOR UPDATE SKIP LOCKED)` so concurrent receivers never lease
//! the same message; the `visible_at` column is the lease deadline, and
//! acknowledging deletes by `(id, receipt)` so a stale receipt cannot
//! remove a re-leased message.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::config::DEFAULT_QUEUE_LEASE;

use super::{decode_body, encode_body, MessageQueue, QueueError, ReceivedMessage};

/// Message queue backed by `PostgreSQL`.
#[derive(Clone)]
pub struct PostgresQueue {
    pool: PgPool,
    lease: Duration,
}

/// Internal row type for receive queries.
#[derive(Debug, sqlx::FromRow)]
struct LeasedRow {
    id: i64,
    body: String,
    receipt: Uuid,
}

impl PostgresQueue {
    /// Create the adapter over an existing connection pool with the
    /// default lease duration.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self {
            pool,
            lease: DEFAULT_QUEUE_LEASE,
        }
    }

    /// Create the adapter with a custom lease duration.
    #[must_use]
    pub const fn with_lease(pool: PgPool, lease: Duration) -> Self {
        Self { pool, lease }
    }

    /// Idempotently create the queue table. Topics themselves need no
    /// creation; they are just values in the `topic` column.
    ///
    /// # Errors
    ///
    /// Returns `QueueError::Database` if a statement fails.
    pub async fn init(&self) -> Result<(), QueueError> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS queue_messages (
                id            BIGSERIAL PRIMARY KEY,
                topic         TEXT NOT NULL,
                body          TEXT NOT NULL,
                receipt       UUID,
                visible_at    TIMESTAMPTZ NOT NULL DEFAULT now(),
                enqueued_at   TIMESTAMPTZ NOT NULL DEFAULT now(),
                dequeue_count INTEGER NOT NULL DEFAULT 0
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE INDEX IF NOT EXISTS queue_messages_topic_visible_idx
            ON queue_messages (topic, visible_at)
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl MessageQueue for PostgresQueue {
    async fn send(&self, topic: &str, body: &str) -> Result<(), QueueError> {
        sqlx::query("INSERT INTO queue_messages (topic, body) VALUES ($1, $2)")
            .bind(topic)
            .bind(encode_body(body))
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn receive_batch(
        &self,
        topic: &str,
        max: usize,
    ) -> Result<Vec<ReceivedMessage>, QueueError> {
        let receipt = Uuid::new_v4();
        let limit = i64::try_from(max).unwrap_or(i64::MAX);

        let rows = sqlx::query_as::<_, LeasedRow>(
            r"
            WITH picked AS (
                SELECT id
                FROM queue_messages
                WHERE topic = $1 AND visible_at <= now()
                ORDER BY id
                LIMIT $2
                FOR UPDATE SKIP LOCKED
            )
            UPDATE queue_messages q
            SET receipt       = $3,
                visible_at    = now() + make_interval(secs => $4),
                dequeue_count = q.dequeue_count + 1
            FROM picked
            WHERE q.id = picked.id
            RETURNING q.id, q.body, q.receipt
            ",
        )
        .bind(topic)
        .bind(limit)
        .bind(receipt)
        .bind(self.lease.as_secs_f64())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(ReceivedMessage {
                    id: row.id.to_string(),
                    receipt: row.receipt.to_string(),
                    body: decode_body(&row.body)?,
                })
            })
            .collect()
    }

    async fn acknowledge(&self, topic: &str, id: &str, receipt: &str) -> Result<(), QueueError> {
        // Ill-formed tokens can never match a stored lease.
        let id: i64 = id.parse().map_err(|_| QueueError::ReceiptNotFound)?;
        let receipt: Uuid = receipt.parse().map_err(|_| QueueError::ReceiptNotFound)?;

        let result =
            sqlx::query("DELETE FROM queue_messages WHERE topic = $1 AND id = $2 AND receipt = $3")
                .bind(topic)
                .bind(id)
                .bind(receipt)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(QueueError::ReceiptNotFound);
        }

        Ok(())
    }
}
