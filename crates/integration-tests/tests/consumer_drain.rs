//! End-to-end tests: queue messages flowing through the drain consumers
//! into the audit partitions.

use std::time::Duration;

use backroom_storage::entity::{EntityStore, MemoryEntityStore};
use backroom_storage::queue::{MemoryQueue, MessageQueue};
use backroom_worker::consumer::{DrainConsumer, AUDIT_ROUTES};

#[tokio::test]
async fn a_sent_order_message_ends_up_as_exactly_one_audit_row() {
    let entities = MemoryEntityStore::new();
    let queue = MemoryQueue::new();

    queue.send("orders", "Order placed: 42").await.expect("send");

    let consumer = DrainConsumer::new("orders", "OrderLogs", entities.clone(), queue.clone());
    consumer.poll_once().await;

    let rows = entities.query_partition("OrderLogs").await.expect("query");
    assert_eq!(rows.len(), 1);
    let row = rows.first().expect("one row");
    assert_eq!(row.field_str("Message"), Some("Order placed: 42"));
    assert_eq!(row.field_str("Status"), Some("Processed"));

    // Acknowledged: a second poll finds nothing and writes nothing.
    consumer.poll_once().await;
    assert_eq!(
        entities.query_partition("OrderLogs").await.expect("query").len(),
        1
    );
}

#[tokio::test]
async fn queue_delivery_is_at_least_once() {
    let queue = MemoryQueue::with_lease(Duration::from_millis(30));
    queue.send("orders", "X").await.expect("send");

    let first = queue.receive_batch("orders", 10).await.expect("receive");
    assert_eq!(first.first().map(|m| m.body.as_str()), Some("X"));

    // No acknowledge before lease expiry: the message may be delivered
    // again.
    tokio::time::sleep(Duration::from_millis(50)).await;
    let again = queue.receive_batch("orders", 10).await.expect("receive");
    assert_eq!(again.first().map(|m| m.body.as_str()), Some("X"));
}

#[tokio::test]
async fn each_consumer_writes_to_its_own_partition() {
    let entities = MemoryEntityStore::new();
    let queue = MemoryQueue::new();

    queue.send("orders", "Order placed: 1").await.expect("send");
    queue
        .send("inventory", "Product created: Beans")
        .await
        .expect("send");
    queue
        .send("customers", "Customer added: Thandi Nkosi")
        .await
        .expect("send");
    queue
        .send("images", "Image uploaded: beans.png")
        .await
        .expect("send");

    for (topic, partition) in AUDIT_ROUTES {
        DrainConsumer::new(topic, partition, entities.clone(), queue.clone())
            .poll_once()
            .await;
    }

    for (_, partition) in AUDIT_ROUTES {
        let rows = entities.query_partition(partition).await.expect("query");
        assert_eq!(rows.len(), 1, "partition {partition} should hold one row");
        assert_eq!(rows[0].field_str("Status"), Some("Processed"));
    }
}

#[tokio::test]
async fn a_running_consumer_drains_messages_as_they_arrive() {
    let entities = MemoryEntityStore::new();
    let queue = MemoryQueue::new();

    let consumer = DrainConsumer::new("orders", "OrderLogs", entities.clone(), queue.clone())
        .with_poll_interval(Duration::from_millis(10));
    let task = tokio::spawn(consumer.run());

    queue.send("orders", "Order placed: 7").await.expect("send");

    // Give the poll loop a few cycles to pick the message up.
    let mut rows = Vec::new();
    for _ in 0..50 {
        tokio::time::sleep(Duration::from_millis(10)).await;
        rows = entities.query_partition("OrderLogs").await.expect("query");
        if !rows.is_empty() {
            break;
        }
    }
    task.abort();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].field_str("Message"), Some("Order placed: 7"));
}
