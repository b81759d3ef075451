//! Entity-store adapter: schemaless, partition/row-keyed records.
//!
//! Entities are addressed by a `(partition key, row key)` pair. Queries are
//! cheap within a partition and never span partitions. The back office uses
//! four partition families: `Products`, `Customers`, and one `<Topic>Logs`
//! audit partition per queue topic.
//!
//! Attribute payloads are plain JSON objects ([`EntityRow::fields`]); typed
//! models convert through serde, which is what keeps the store schemaless -
//! two rows in the same partition need not share a shape.

pub mod memory;
pub mod postgres;

pub use memory::MemoryEntityStore;
pub use postgres::TableStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Well-known partition for the product catalog.
pub const PRODUCTS_PARTITION: &str = "Products";

/// Well-known partition for the customer directory.
pub const CUSTOMERS_PARTITION: &str = "Customers";

/// Errors from entity store operations.
#[derive(Debug, thiserror::Error)]
pub enum EntityStoreError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A row with the same (partition, row key) already exists.
    #[error("entity already exists: {partition}/{row_key}")]
    Conflict {
        partition: String,
        row_key: String,
    },

    /// A typed model failed to convert to or from stored fields.
    #[error("entity serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A typed model did not serialize to a JSON object.
    #[error("entity fields must serialize to a JSON object")]
    NotAnObject,
}

/// A schemaless record addressed by `(partition key, row key)`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct EntityRow {
    pub partition_key: String,
    pub row_key: String,
    /// Attribute map; shape is up to the writer.
    pub fields: serde_json::Map<String, serde_json::Value>,
    /// Storage-assigned last-write timestamp; `None` until persisted.
    pub timestamp: Option<DateTime<Utc>>,
}

impl EntityRow {
    /// Build a row from raw fields.
    #[must_use]
    pub fn new(
        partition_key: impl Into<String>,
        row_key: impl Into<String>,
        fields: serde_json::Map<String, serde_json::Value>,
    ) -> Self {
        Self {
            partition_key: partition_key.into(),
            row_key: row_key.into(),
            fields,
            timestamp: None,
        }
    }

    /// Build a row from a typed model.
    ///
    /// # Errors
    ///
    /// Returns [`EntityStoreError::NotAnObject`] if the model does not
    /// serialize to a JSON object.
    pub fn from_model<T: Serialize>(
        partition_key: impl Into<String>,
        row_key: impl Into<String>,
        model: &T,
    ) -> Result<Self, EntityStoreError> {
        match serde_json::to_value(model)? {
            serde_json::Value::Object(fields) => Ok(Self::new(partition_key, row_key, fields)),
            _ => Err(EntityStoreError::NotAnObject),
        }
    }

    /// Convert the stored fields back into a typed model.
    ///
    /// # Errors
    ///
    /// Returns [`EntityStoreError::Serialization`] if the fields do not
    /// match the model's shape.
    pub fn to_model<T: DeserializeOwned>(&self) -> Result<T, EntityStoreError> {
        Ok(serde_json::from_value(serde_json::Value::Object(
            self.fields.clone(),
        ))?)
    }

    /// A string attribute, if present and a string.
    #[must_use]
    pub fn field_str(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(serde_json::Value::as_str)
    }
}

/// Capability trait for the entity store.
#[async_trait]
pub trait EntityStore: Send + Sync + 'static {
    /// Insert a fresh row.
    ///
    /// # Errors
    ///
    /// Returns [`EntityStoreError::Conflict`] if the `(partition, row
    /// key)` pair already exists.
    async fn insert(&self, row: EntityRow) -> Result<(), EntityStoreError>;

    /// Fetch one row, or `None` if absent (backend not-found is caught,
    /// never propagated).
    async fn get(&self, partition: &str, row_key: &str)
        -> Result<Option<EntityRow>, EntityStoreError>;

    /// The full partition as a sequence, in row-key order. No pagination.
    async fn query_partition(&self, partition: &str) -> Result<Vec<EntityRow>, EntityStoreError>;

    /// Unconditional write: insert or overwrite, last writer wins. Any
    /// optimistic-concurrency token on the row is ignored.
    async fn upsert(&self, row: EntityRow) -> Result<(), EntityStoreError>;

    /// Delete a row. Deleting an absent row is not an error.
    async fn delete(&self, partition: &str, row_key: &str) -> Result<(), EntityStoreError>;
}
