//! In-memory queue for tests and local development.
//!
//! Visibility is tracked with monotonic deadlines, so lease expiry and
//! redelivery behave like the durable backend without any clock mocking;
//! expiry tests just construct the queue with a short lease.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::config::DEFAULT_QUEUE_LEASE;

use super::{decode_body, encode_body, MessageQueue, QueueError, ReceivedMessage};

#[derive(Debug, Clone)]
struct StoredMessage {
    id: String,
    /// Transport-encoded payload, exactly as a durable backend stores it.
    encoded_body: String,
    visible_at: Instant,
    receipt: Option<String>,
}

/// In-memory message queue with lease-based visibility.
#[derive(Clone)]
pub struct MemoryQueue {
    topics: Arc<Mutex<HashMap<String, Vec<StoredMessage>>>>,
    lease: Duration,
}

impl Default for MemoryQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryQueue {
    /// Creates an empty queue with the default lease duration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_lease(DEFAULT_QUEUE_LEASE)
    }

    /// Creates an empty queue with a custom lease duration.
    #[must_use]
    pub fn with_lease(lease: Duration) -> Self {
        Self {
            topics: Arc::new(Mutex::new(HashMap::new())),
            lease,
        }
    }

    /// Number of messages currently stored on a topic, leased or not.
    /// Test helper; production code never inspects queue depth.
    pub async fn depth(&self, topic: &str) -> usize {
        let topics = self.topics.lock().await;
        topics.get(topic).map_or(0, Vec::len)
    }
}

#[async_trait]
impl MessageQueue for MemoryQueue {
    async fn send(&self, topic: &str, body: &str) -> Result<(), QueueError> {
        let mut topics = self.topics.lock().await;
        topics.entry(topic.to_owned()).or_default().push(StoredMessage {
            id: Uuid::new_v4().to_string(),
            encoded_body: encode_body(body),
            visible_at: Instant::now(),
            receipt: None,
        });
        Ok(())
    }

    async fn receive_batch(
        &self,
        topic: &str,
        max: usize,
    ) -> Result<Vec<ReceivedMessage>, QueueError> {
        let mut topics = self.topics.lock().await;
        let Some(messages) = topics.get_mut(topic) else {
            return Ok(Vec::new());
        };

        let now = Instant::now();
        let mut batch = Vec::new();

        for message in messages.iter_mut() {
            if batch.len() >= max {
                break;
            }
            if message.visible_at > now {
                continue;
            }

            let receipt = Uuid::new_v4().to_string();
            message.receipt = Some(receipt.clone());
            message.visible_at = now + self.lease;

            batch.push(ReceivedMessage {
                id: message.id.clone(),
                receipt,
                body: decode_body(&message.encoded_body)?,
            });
        }

        Ok(batch)
    }

    async fn acknowledge(&self, topic: &str, id: &str, receipt: &str) -> Result<(), QueueError> {
        let mut topics = self.topics.lock().await;
        let messages = topics.get_mut(topic).ok_or(QueueError::ReceiptNotFound)?;

        let position = messages
            .iter()
            .position(|m| m.id == id && m.receipt.as_deref() == Some(receipt))
            .ok_or(QueueError::ReceiptNotFound)?;

        messages.remove(position);
        Ok(())
    }
}
