//! Queue-drain consumers.
//!
//! One parameterized behavior instantiated four times: a consumer is bound
//! to a `(topic, audit partition)` pair, leases messages from its topic,
//! and appends one audit entry per message to the entity store. Each
//! instance runs as its own task, so the four consumers are deployed,
//! scheduled, and restarted independently even though they share a type.
//!
//! Audit writes are best-effort: a failed insert is logged and the
//! message is acknowledged anyway. Losing an audit row is acceptable;
//! wedging a topic behind a poison message is not. The queue's
//! at-least-once delivery means duplicate audit rows are possible and
//! fine - each write uses a fresh row key, never an update.

use std::time::Duration;

use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use backroom_storage::entity::{EntityRow, EntityStore};
use backroom_storage::queue::{
    MessageQueue, QueueError, RECEIVE_BATCH_LIMIT, TOPIC_CUSTOMERS, TOPIC_IMAGES, TOPIC_INVENTORY,
    TOPIC_ORDERS,
};

/// Topic-to-audit-partition routing, one entry per consumer instance.
pub const AUDIT_ROUTES: [(&str, &str); 4] = [
    (TOPIC_ORDERS, "OrderLogs"),
    (TOPIC_INVENTORY, "InventoryLogs"),
    (TOPIC_CUSTOMERS, "CustomerLogs"),
    (TOPIC_IMAGES, "ImageLogs"),
];

/// Default delay between polls that found no messages.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// A queue-drain consumer bound to one topic.
pub struct DrainConsumer<E, Q> {
    topic: String,
    partition: String,
    entities: E,
    queue: Q,
    poll_interval: Duration,
}

impl<E, Q> DrainConsumer<E, Q>
where
    E: EntityStore,
    Q: MessageQueue,
{
    /// Bind a consumer to a topic and its audit partition.
    pub fn new(
        topic: impl Into<String>,
        partition: impl Into<String>,
        entities: E,
        queue: Q,
    ) -> Self {
        Self {
            topic: topic.into(),
            partition: partition.into(),
            entities,
            queue,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Override the empty-poll delay.
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// The topic this consumer drains.
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Run forever, polling the topic and draining whatever arrives.
    pub async fn run(self) {
        tracing::info!(
            topic = %self.topic,
            partition = %self.partition,
            "queue-drain consumer started"
        );

        loop {
            if self.poll_once().await == 0 {
                tokio::time::sleep(self.poll_interval).await;
            }
        }
    }

    /// Receive one batch and process it; returns how many messages were
    /// consumed. Receive failures are logged and counted as an empty
    /// poll so the run loop backs off instead of spinning.
    pub async fn poll_once(&self) -> usize {
        let batch = match self
            .queue
            .receive_batch(&self.topic, RECEIVE_BATCH_LIMIT)
            .await
        {
            Ok(batch) => batch,
            Err(error) => {
                tracing::error!(topic = %self.topic, %error, "failed to receive messages");
                return 0;
            }
        };

        let count = batch.len();
        for message in batch {
            self.process_message(&message.body).await;

            // The hosting transport considers a delivered message consumed:
            // acknowledge whether or not the audit write succeeded.
            match self
                .queue
                .acknowledge(&self.topic, &message.id, &message.receipt)
                .await
            {
                Ok(()) => {}
                Err(QueueError::ReceiptNotFound) => {
                    // Lease expired mid-processing and the message was
                    // re-leased; the duplicate audit row is tolerated.
                    tracing::debug!(topic = %self.topic, id = %message.id, "stale receipt on acknowledge");
                }
                Err(error) => {
                    tracing::error!(topic = %self.topic, id = %message.id, %error, "failed to acknowledge message");
                }
            }
        }

        count
    }

    /// Handle one message body: append an audit entry to the destination
    /// partition. Failures are logged and swallowed; this invocation
    /// never escalates.
    pub async fn process_message(&self, body: &str) {
        tracing::info!(topic = %self.topic, message = body, "processing message");

        let row = audit_row(&self.partition, body);
        match self.entities.insert(row).await {
            Ok(()) => {
                tracing::info!(topic = %self.topic, message = body, "message processed");
            }
            Err(error) => {
                tracing::error!(topic = %self.topic, %error, "failed to write audit entry");
            }
        }
    }
}

/// Build an audit entry for a consumed message.
fn audit_row(partition: &str, message: &str) -> EntityRow {
    let mut fields = serde_json::Map::new();
    fields.insert("Message".to_owned(), json!(message));
    fields.insert("ProcessedAt".to_owned(), json!(Utc::now()));
    fields.insert("Status".to_owned(), json!("Processed"));

    EntityRow::new(partition, Uuid::new_v4().to_string(), fields)
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use backroom_storage::entity::{EntityStoreError, MemoryEntityStore};
    use backroom_storage::queue::MemoryQueue;

    use super::*;

    fn consumer(
        entities: MemoryEntityStore,
        queue: MemoryQueue,
    ) -> DrainConsumer<MemoryEntityStore, MemoryQueue> {
        DrainConsumer::new(TOPIC_ORDERS, "OrderLogs", entities, queue)
    }

    #[tokio::test]
    async fn a_processed_message_becomes_one_audit_row() {
        let entities = MemoryEntityStore::new();
        let queue = MemoryQueue::new();
        queue
            .send(TOPIC_ORDERS, "Order placed: 42")
            .await
            .expect("send");

        let handled = consumer(entities.clone(), queue.clone()).poll_once().await;
        assert_eq!(handled, 1);

        let rows = entities.query_partition("OrderLogs").await.expect("query");
        assert_eq!(rows.len(), 1);
        let row = rows.first().expect("one row");
        assert_eq!(row.field_str("Message"), Some("Order placed: 42"));
        assert_eq!(row.field_str("Status"), Some("Processed"));
        assert!(row.fields.contains_key("ProcessedAt"));

        // Acknowledged: the queue no longer holds the message.
        assert_eq!(queue.depth(TOPIC_ORDERS).await, 0);
    }

    #[tokio::test]
    async fn an_empty_topic_is_an_empty_poll() {
        let handled = consumer(MemoryEntityStore::new(), MemoryQueue::new())
            .poll_once()
            .await;
        assert_eq!(handled, 0);
    }

    #[tokio::test]
    async fn consumers_only_drain_their_own_topic() {
        let entities = MemoryEntityStore::new();
        let queue = MemoryQueue::new();
        queue
            .send(TOPIC_INVENTORY, "Product created: Beans")
            .await
            .expect("send");

        let handled = consumer(entities.clone(), queue.clone()).poll_once().await;
        assert_eq!(handled, 0);
        assert_eq!(queue.depth(TOPIC_INVENTORY).await, 1);
        assert!(entities
            .query_partition("OrderLogs")
            .await
            .expect("query")
            .is_empty());
    }

    /// Entity store that rejects every write.
    #[derive(Clone)]
    struct FailingEntities;

    #[async_trait]
    impl EntityStore for FailingEntities {
        async fn insert(&self, row: EntityRow) -> Result<(), EntityStoreError> {
            Err(EntityStoreError::Conflict {
                partition: row.partition_key,
                row_key: row.row_key,
            })
        }

        async fn get(
            &self,
            _partition: &str,
            _row_key: &str,
        ) -> Result<Option<EntityRow>, EntityStoreError> {
            Ok(None)
        }

        async fn query_partition(
            &self,
            _partition: &str,
        ) -> Result<Vec<EntityRow>, EntityStoreError> {
            Ok(Vec::new())
        }

        async fn upsert(&self, _row: EntityRow) -> Result<(), EntityStoreError> {
            Ok(())
        }

        async fn delete(&self, _partition: &str, _row_key: &str) -> Result<(), EntityStoreError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn a_failed_audit_write_is_swallowed_and_still_acknowledged() {
        let queue = MemoryQueue::new();
        queue.send(TOPIC_ORDERS, "Order placed: 7").await.expect("send");

        let consumer = DrainConsumer::new(TOPIC_ORDERS, "OrderLogs", FailingEntities, queue.clone());
        let handled = consumer.poll_once().await;

        assert_eq!(handled, 1);
        // Best-effort policy: the message is gone even though no audit
        // row was written.
        assert_eq!(queue.depth(TOPIC_ORDERS).await, 0);
    }

    #[test]
    fn audit_routes_cover_all_four_topics() {
        let topics: Vec<&str> = AUDIT_ROUTES.iter().map(|(t, _)| *t).collect();
        assert_eq!(topics, vec!["orders", "inventory", "customers", "images"]);
        let partitions: Vec<&str> = AUDIT_ROUTES.iter().map(|(_, p)| *p).collect();
        assert_eq!(
            partitions,
            vec!["OrderLogs", "InventoryLogs", "CustomerLogs", "ImageLogs"]
        );
    }
}
