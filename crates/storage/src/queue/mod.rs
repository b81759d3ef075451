//! Queue adapter: durable text messages with at-least-once delivery.
//!
//! Messages are Base64-encoded for transport, leased to one consumer at a
//! time on receive, and permanently removed only on acknowledge. A message
//! whose lease expires before acknowledgement becomes visible again, so
//! consumers must tolerate duplicates.
//!
//! The back office uses four topics, one per notification stream; topic
//! creation is implicit and idempotent on first use.

pub mod memory;
pub mod postgres;

pub use memory::MemoryQueue;
pub use postgres::PostgresQueue;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

/// Topic notified on order creation and status changes.
pub const TOPIC_ORDERS: &str = "orders";
/// Topic notified on product catalog changes.
pub const TOPIC_INVENTORY: &str = "inventory";
/// Topic notified on customer directory appends.
pub const TOPIC_CUSTOMERS: &str = "customers";
/// Topic notified on image uploads.
pub const TOPIC_IMAGES: &str = "images";

/// Every notification topic.
pub const TOPICS: [&str; 4] = [TOPIC_ORDERS, TOPIC_INVENTORY, TOPIC_CUSTOMERS, TOPIC_IMAGES];

/// Upper bound on messages returned by one receive call.
pub const RECEIVE_BATCH_LIMIT: usize = 10;

/// Errors from queue operations.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The message is gone or the receipt no longer matches (lease
    /// expired and the message was re-leased, or it was already
    /// acknowledged). Callers may ignore this.
    #[error("message or receipt not found")]
    ReceiptNotFound,

    /// A stored payload failed transport decoding.
    #[error("invalid transport encoding: {0}")]
    Decode(String),
}

/// A leased message returned by [`MessageQueue::receive_batch`].
///
/// `receipt` is an opaque acknowledgement token; it is invalidated when
/// the lease expires and another receive re-leases the message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedMessage {
    pub id: String,
    pub receipt: String,
    /// Decoded text payload.
    pub body: String,
}

/// Capability trait for the message queue.
#[async_trait]
pub trait MessageQueue: Send + Sync + 'static {
    /// Encode and enqueue a text message.
    async fn send(&self, topic: &str, body: &str) -> Result<(), QueueError>;

    /// Lease up to `max` currently-visible messages and decode their
    /// payloads. Leased messages stay invisible to other receivers until
    /// acknowledged or their lease expires.
    async fn receive_batch(
        &self,
        topic: &str,
        max: usize,
    ) -> Result<Vec<ReceivedMessage>, QueueError>;

    /// Permanently remove a leased message.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::ReceiptNotFound`] for unknown ids or stale
    /// receipts; callers may ignore that case.
    async fn acknowledge(&self, topic: &str, id: &str, receipt: &str) -> Result<(), QueueError>;
}

/// Base64-encode a payload for transport.
pub(crate) fn encode_body(body: &str) -> String {
    BASE64.encode(body.as_bytes())
}

/// Decode a Base64 transport payload back to text.
pub(crate) fn decode_body(encoded: &str) -> Result<String, QueueError> {
    let bytes = BASE64
        .decode(encoded)
        .map_err(|e| QueueError::Decode(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| QueueError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_encoding_round_trips() {
        let body = "Order placed: 42";
        assert_eq!(decode_body(&encode_body(body)).expect("decode"), body);
    }

    #[test]
    fn garbage_payloads_fail_decoding() {
        assert!(matches!(decode_body("!!!"), Err(QueueError::Decode(_))));
    }
}
