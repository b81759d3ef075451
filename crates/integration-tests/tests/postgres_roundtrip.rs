//! Round-trip tests for the `PostgreSQL`-backed adapters.
//!
//! These need a live database and are ignored by default:
//!
//! ```bash
//! export BACKROOM_DATABASE_URL=postgres://localhost/backroom_test
//! cargo test -p backroom-integration-tests -- --ignored
//! ```
//!
//! Each test creates its schema on the fly (the adapters own their
//! create-if-absent initialization) and uses throwaway identifiers, so
//! reruns against the same database are fine.

use secrecy::SecretString;
use uuid::Uuid;

use backroom_core::NewUser;
use backroom_storage::entity::{EntityRow, EntityStore, TableStore};
use backroom_storage::queue::{MessageQueue, PostgresQueue, QueueError};
use backroom_storage::relational::{create_pool, PostgresRelational, RelationalStore, RepositoryError};

async fn pool() -> sqlx::PgPool {
    let url = std::env::var("BACKROOM_DATABASE_URL")
        .expect("BACKROOM_DATABASE_URL must be set for ignored postgres tests");
    create_pool(&SecretString::from(url))
        .await
        .expect("connect to postgres")
}

fn throwaway_user() -> NewUser {
    let tag = Uuid::new_v4();
    NewUser {
        username: format!("it-{tag}"),
        email: backroom_core::Email::parse(&format!("it-{tag}@example.com")).expect("valid"),
        first_name: "Integration".to_owned(),
        last_name: "Test".to_owned(),
        role: backroom_core::Role::Customer,
        phone_number: String::new(),
    }
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL instance"]
async fn relational_user_round_trip() {
    let relational = PostgresRelational::new(pool().await);
    relational.init().await.expect("init schema");

    let draft = throwaway_user();
    let created = relational.create_user(&draft, "pw").await.expect("create");
    assert_eq!(created.email, draft.email);

    let err = relational
        .create_user(&draft, "pw")
        .await
        .expect_err("duplicate email");
    assert!(matches!(err, RepositoryError::Conflict(_)));

    let authed = relational
        .authenticate(&draft.email, "pw")
        .await
        .expect("authenticate");
    assert_eq!(authed.map(|u| u.id), Some(created.id));
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL instance"]
async fn entity_round_trip_in_a_throwaway_partition() {
    let entities = TableStore::new(pool().await);
    entities.init().await.expect("init schema");

    let partition = format!("ItTest-{}", Uuid::new_v4());
    let mut fields = serde_json::Map::new();
    fields.insert("Name".to_owned(), serde_json::json!("Beans"));

    entities
        .insert(EntityRow::new(partition.clone(), "row-1", fields))
        .await
        .expect("insert");

    let row = entities
        .get(&partition, "row-1")
        .await
        .expect("get")
        .expect("present");
    assert_eq!(row.field_str("Name"), Some("Beans"));
    assert!(row.timestamp.is_some());

    assert!(entities
        .get(&partition, "missing")
        .await
        .expect("get")
        .is_none());

    entities.delete(&partition, "row-1").await.expect("delete");
    assert!(entities
        .query_partition(&partition)
        .await
        .expect("query")
        .is_empty());
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL instance"]
async fn queue_round_trip_on_a_throwaway_topic() {
    let queue = PostgresQueue::new(pool().await);
    queue.init().await.expect("init schema");

    let topic = format!("it-{}", Uuid::new_v4());
    queue.send(&topic, "Order placed: 42").await.expect("send");

    let batch = queue.receive_batch(&topic, 10).await.expect("receive");
    assert_eq!(batch.len(), 1);
    let message = batch.into_iter().next().expect("one message");
    assert_eq!(message.body, "Order placed: 42");

    // Leased: invisible to a second receiver until the lease expires.
    assert!(queue.receive_batch(&topic, 10).await.expect("receive").is_empty());

    queue
        .acknowledge(&topic, &message.id, &message.receipt)
        .await
        .expect("acknowledge");
    let err = queue
        .acknowledge(&topic, &message.id, &message.receipt)
        .await
        .expect_err("second acknowledge");
    assert!(matches!(err, QueueError::ReceiptNotFound));
}
