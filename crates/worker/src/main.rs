//! Backroom Worker - queue-drain consumer host.
//!
//! Spawns one long-lived consumer task per notification topic (`orders`,
//! `inventory`, `customers`, `images`). Each consumer leases messages
//! from its topic and appends an audit entry per message to the entity
//! store's `<Topic>Logs` partition, then acknowledges the message.
//!
//! The consumers share the backend connections but nothing else; a slow
//! or failing topic never blocks the other three.

#![cfg_attr(not(test), forbid(unsafe_code))]

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use backroom_storage::entity::TableStore;
use backroom_storage::queue::PostgresQueue;
use backroom_storage::relational::create_pool;
use backroom_worker::consumer::{DrainConsumer, AUDIT_ROUTES};
use backroom_worker::WorkerConfig;

#[tokio::main]
async fn main() {
    // Load configuration from environment
    let config = WorkerConfig::from_env().expect("Failed to load configuration");

    // Initialize tracing with EnvFilter
    // Defaults to info level for our crates if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "backroom_worker=info,backroom_storage=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Initialize database connection pool
    let pool = create_pool(&config.storage.database_url)
        .await
        .expect("Failed to create database pool");
    tracing::info!("Database pool created");

    // The consumers only touch the entity store and the queue
    let entities = TableStore::new(pool.clone());
    entities
        .init()
        .await
        .expect("Failed to initialize entity table");

    let queue = PostgresQueue::with_lease(pool, config.storage.queue_lease);
    queue.init().await.expect("Failed to initialize queue table");

    // One independent task per topic
    for (topic, partition) in AUDIT_ROUTES {
        let consumer = DrainConsumer::new(topic, partition, entities.clone(), queue.clone())
            .with_poll_interval(config.poll_interval);
        tokio::spawn(consumer.run());
    }

    tracing::info!("queue-drain consumers running; press Ctrl-C to stop");
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to listen for shutdown signal");
    tracing::info!("shutting down");
}
