//! In-memory entity store for tests and local development.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use super::{EntityRow, EntityStore, EntityStoreError};

type Key = (String, String);

#[derive(Debug, Clone)]
struct Stored {
    fields: serde_json::Map<String, serde_json::Value>,
    updated_at: DateTime<Utc>,
}

/// In-memory entity store.
///
/// A `BTreeMap` keyed by `(partition, row key)` gives the same
/// within-partition, row-key-ordered scans as the real backend.
#[derive(Clone, Default)]
pub struct MemoryEntityStore {
    rows: Arc<Mutex<BTreeMap<Key, Stored>>>,
}

impl MemoryEntityStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EntityStore for MemoryEntityStore {
    async fn insert(&self, row: EntityRow) -> Result<(), EntityStoreError> {
        let mut rows = self.rows.lock().await;
        let key = (row.partition_key.clone(), row.row_key.clone());

        if rows.contains_key(&key) {
            return Err(EntityStoreError::Conflict {
                partition: row.partition_key,
                row_key: row.row_key,
            });
        }

        rows.insert(
            key,
            Stored {
                fields: row.fields,
                updated_at: Utc::now(),
            },
        );
        Ok(())
    }

    async fn get(
        &self,
        partition: &str,
        row_key: &str,
    ) -> Result<Option<EntityRow>, EntityStoreError> {
        let rows = self.rows.lock().await;
        Ok(rows
            .get(&(partition.to_owned(), row_key.to_owned()))
            .map(|stored| EntityRow {
                partition_key: partition.to_owned(),
                row_key: row_key.to_owned(),
                fields: stored.fields.clone(),
                timestamp: Some(stored.updated_at),
            }))
    }

    async fn query_partition(&self, partition: &str) -> Result<Vec<EntityRow>, EntityStoreError> {
        let rows = self.rows.lock().await;
        Ok(rows
            .range((partition.to_owned(), String::new())..)
            .take_while(|((p, _), _)| p == partition)
            .map(|((p, r), stored)| EntityRow {
                partition_key: p.clone(),
                row_key: r.clone(),
                fields: stored.fields.clone(),
                timestamp: Some(stored.updated_at),
            })
            .collect())
    }

    async fn upsert(&self, row: EntityRow) -> Result<(), EntityStoreError> {
        let mut rows = self.rows.lock().await;
        rows.insert(
            (row.partition_key, row.row_key),
            Stored {
                fields: row.fields,
                updated_at: Utc::now(),
            },
        );
        Ok(())
    }

    async fn delete(&self, partition: &str, row_key: &str) -> Result<(), EntityStoreError> {
        let mut rows = self.rows.lock().await;
        rows.remove(&(partition.to_owned(), row_key.to_owned()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn fields(name: &str) -> serde_json::Map<String, serde_json::Value> {
        let serde_json::Value::Object(map) = json!({ "Name": name }) else {
            unreachable!("literal is an object");
        };
        map
    }

    #[tokio::test]
    async fn insert_then_get() {
        let store = MemoryEntityStore::new();
        store
            .insert(EntityRow::new("Products", "p-1", fields("Beans")))
            .await
            .expect("insert");

        let row = store.get("Products", "p-1").await.expect("get");
        assert_eq!(row.and_then(|r| r.field_str("Name").map(str::to_owned)), Some("Beans".to_owned()));
    }

    #[tokio::test]
    async fn get_of_missing_row_is_none_not_an_error() {
        let store = MemoryEntityStore::new();
        assert!(store.get("Products", "missing").await.expect("get").is_none());
    }

    #[tokio::test]
    async fn duplicate_insert_is_a_conflict() {
        let store = MemoryEntityStore::new();
        store
            .insert(EntityRow::new("Products", "p-1", fields("Beans")))
            .await
            .expect("insert");

        let err = store
            .insert(EntityRow::new("Products", "p-1", fields("Mug")))
            .await
            .expect_err("duplicate");
        assert!(matches!(err, EntityStoreError::Conflict { .. }));
    }

    #[tokio::test]
    async fn query_scopes_to_one_partition() {
        let store = MemoryEntityStore::new();
        store
            .insert(EntityRow::new("Products", "b", fields("Beans")))
            .await
            .expect("insert");
        store
            .insert(EntityRow::new("Products", "a", fields("Mug")))
            .await
            .expect("insert");
        store
            .insert(EntityRow::new("Customers", "c", fields("Ada")))
            .await
            .expect("insert");

        let products = store.query_partition("Products").await.expect("query");
        let keys: Vec<&str> = products.iter().map(|r| r.row_key.as_str()).collect();
        assert_eq!(keys, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn upsert_is_last_writer_wins_and_delete_is_idempotent() {
        let store = MemoryEntityStore::new();
        store
            .upsert(EntityRow::new("Products", "p-1", fields("Beans")))
            .await
            .expect("upsert");
        store
            .upsert(EntityRow::new("Products", "p-1", fields("Dark Beans")))
            .await
            .expect("upsert");

        let row = store.get("Products", "p-1").await.expect("get").expect("present");
        assert_eq!(row.field_str("Name"), Some("Dark Beans"));

        store.delete("Products", "p-1").await.expect("delete");
        store.delete("Products", "p-1").await.expect("second delete is fine");
        assert!(store.get("Products", "p-1").await.expect("get").is_none());
    }
}
