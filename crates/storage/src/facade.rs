//! Storage façade: one interface over the five backend adapters.
//!
//! The application layer consumes [`StorageFacade`] and never sees which
//! backend owns a piece of state. The façade itself owns nothing - it is a
//! stateless router over the adapters, plus the one behavior that spans
//! backends: certain writes enqueue a notification message as a
//! **post-commit, best-effort** side effect. The write and the
//! notification are not atomic; if the enqueue fails (or the process dies
//! between the two steps) the notification is lost and only the audit
//! trail is affected, never business data. Enqueue failures are therefore
//! logged at `warn` and swallowed rather than surfaced to the caller.
//!
//! Identifier inputs arrive as raw strings from the HTTP layer and are
//! parsed defensively: read paths and cart writes degrade to empty
//! results or no-ops on a non-numeric id, while `create_order` - the one
//! write that cannot proceed without a resolvable owner - fails hard with
//! [`StorageError::InvalidInput`].

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use serde_json::json;
use url::Url;
use uuid::Uuid;

use backroom_core::{
    CartItem, CartItemId, Email, NewCartItem, NewProduct, NewUser, Order, OrderDraft, OrderId,
    OrderStatus, OrderWithOwner, Product, User, UserId,
};

use crate::blob::{BlobError, BlobStore, ObjectStoreBlobs};
use crate::config::StorageConfig;
use crate::entity::{
    EntityRow, EntityStore, EntityStoreError, MemoryEntityStore, TableStore, CUSTOMERS_PARTITION,
    PRODUCTS_PARTITION,
};
use crate::queue::{
    MemoryQueue, MessageQueue, PostgresQueue, QueueError, RECEIVE_BATCH_LIMIT, TOPIC_CUSTOMERS,
    TOPIC_IMAGES, TOPIC_INVENTORY, TOPIC_ORDERS,
};
use crate::relational::{
    create_pool, MemoryRelational, PostgresRelational, RelationalStore, RepositoryError,
};
use crate::share::{FileShare, FsShare, MemoryShare, ShareError};

/// Errors surfaced by the storage façade.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Relational store operation failed.
    #[error("relational store error: {0}")]
    Repository(#[from] RepositoryError),

    /// Entity store operation failed.
    #[error("entity store error: {0}")]
    Entity(#[from] EntityStoreError),

    /// Object store operation failed.
    #[error("object store error: {0}")]
    Blob(#[from] BlobError),

    /// Queue operation failed.
    #[error("queue error: {0}")]
    Queue(#[from] QueueError),

    /// File share operation failed.
    #[error("file share error: {0}")]
    Share(#[from] ShareError),

    /// A write-path identifier could not be resolved.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Capability interface for the unified storage layer.
///
/// One production composition ([`Storage`]) implements this; tests
/// substitute in-memory adapters without touching façade logic.
#[async_trait]
pub trait StorageFacade: Send + Sync {
    /// Create a user. `Ok(false)` means the email is already registered;
    /// backend failures propagate as errors.
    async fn create_user(&self, user: NewUser, password: &str) -> Result<bool, StorageError>;

    /// The user matching the email/password pair, or `None`. A
    /// structurally invalid email is `None`, not an error.
    async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<User>, StorageError>;

    /// Look up a user by raw string id; non-numeric ids are `None`.
    async fn user_by_id(&self, user_id: &str) -> Result<Option<User>, StorageError>;

    /// Every user, ordered by id.
    async fn list_users(&self) -> Result<Vec<User>, StorageError>;

    /// Add an item to a user's cart; a non-numeric user id is a no-op.
    async fn add_to_cart(&self, user_id: &str, item: NewCartItem) -> Result<(), StorageError>;

    /// A user's cart; a non-numeric user id yields an empty cart.
    async fn cart_items(&self, user_id: &str) -> Result<Vec<CartItem>, StorageError>;

    /// Remove one cart item scoped to its owner; unknown ids are no-ops.
    async fn remove_cart_item(
        &self,
        user_id: &str,
        item_id: CartItemId,
    ) -> Result<(), StorageError>;

    /// Empty a user's cart; a non-numeric user id is a no-op.
    async fn clear_cart(&self, user_id: &str) -> Result<(), StorageError>;

    /// Persist a new order and notify the `orders` topic.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidInput`] when the owning customer id
    /// is non-numeric or does not reference an existing user.
    async fn create_order(&self, draft: OrderDraft) -> Result<Order, StorageError>;

    /// A user's orders, most recent first; non-numeric ids yield nothing.
    async fn orders_for_user(&self, user_id: &str) -> Result<Vec<Order>, StorageError>;

    /// Every order with its owning user, most recent first (admin).
    async fn all_orders(&self) -> Result<Vec<OrderWithOwner>, StorageError>;

    /// Set an order's status and notify the `orders` topic. Updating an
    /// unknown order is a silent no-op with no notification.
    async fn update_order_status(
        &self,
        order_id: OrderId,
        status: OrderStatus,
    ) -> Result<(), StorageError>;

    /// Add a product under a fresh row key and notify `inventory`.
    async fn add_product(&self, product: NewProduct) -> Result<Product, StorageError>;

    /// The full catalog, in row-key order.
    async fn products(&self) -> Result<Vec<Product>, StorageError>;

    /// One product by row key, or `None` if absent.
    async fn product(&self, product_id: &str) -> Result<Option<Product>, StorageError>;

    /// Overwrite a product (last writer wins) and notify `inventory`.
    async fn update_product(&self, product: &Product) -> Result<(), StorageError>;

    /// Delete a product by row key and notify `inventory`.
    async fn delete_product(&self, product_id: &str) -> Result<(), StorageError>;

    /// Append a customer to the directory and notify `customers`.
    async fn add_customer(
        &self,
        name: &str,
        email: &str,
        phone: &str,
    ) -> Result<(), StorageError>;

    /// The raw customer directory entities.
    async fn customers(&self) -> Result<Vec<EntityRow>, StorageError>;

    /// Store an image and notify `images`; returns the public URL.
    async fn upload_image(
        &self,
        bytes: Bytes,
        original_name: &str,
    ) -> Result<String, StorageError>;

    /// Public URLs of every stored image.
    async fn image_urls(&self) -> Result<Vec<String>, StorageError>;

    /// Enqueue a raw message on any topic (admin surface).
    async fn enqueue_message(&self, topic: &str, body: &str) -> Result<(), StorageError>;

    /// Peek-and-remove up to one batch of messages from a topic (admin
    /// inspection surface, distinct from the background consumers).
    async fn drain_queue(&self, topic: &str) -> Result<Vec<String>, StorageError>;

    /// Create or overwrite a contract document on the share.
    async fn upload_contract(&self, bytes: Bytes, name: &str) -> Result<(), StorageError>;

    /// Names of every contract on the share.
    async fn contracts(&self) -> Result<Vec<String>, StorageError>;
}

/// Production composition of the five adapters.
pub struct Storage<R, E, B, Q, F> {
    relational: R,
    entities: E,
    blobs: B,
    queue: Q,
    share: F,
}

impl<R, E, B, Q, F> Storage<R, E, B, Q, F>
where
    R: RelationalStore,
    E: EntityStore,
    B: BlobStore,
    Q: MessageQueue,
    F: FileShare,
{
    /// Compose a façade from five adapters.
    #[must_use]
    pub const fn new(relational: R, entities: E, blobs: B, queue: Q, share: F) -> Self {
        Self {
            relational,
            entities,
            blobs,
            queue,
            share,
        }
    }

    /// Post-commit notification: best-effort, independently failing. A
    /// lost notification costs an audit row, never business data.
    async fn notify(&self, topic: &str, body: String) {
        if let Err(error) = self.queue.send(topic, &body).await {
            tracing::warn!(topic, %error, "notification enqueue failed; message lost");
        }
    }

    fn product_from_row(row: &EntityRow) -> Result<Product, StorageError> {
        let mut product: Product = row.to_model()?;
        product.id.clone_from(&row.row_key);
        Ok(product)
    }
}

/// The all-in-memory composition used by tests and local development.
pub type MemoryStorage =
    Storage<MemoryRelational, MemoryEntityStore, ObjectStoreBlobs, MemoryQueue, MemoryShare>;

impl MemoryStorage {
    /// A fully in-memory façade; no external service required.
    #[must_use]
    pub fn in_memory() -> Self {
        let base = Url::parse("http://127.0.0.1:8080/product-images")
            .expect("static url is well-formed");
        Self::new(
            MemoryRelational::new(),
            MemoryEntityStore::new(),
            ObjectStoreBlobs::in_memory(&base),
            MemoryQueue::new(),
            MemoryShare::new(),
        )
    }

    /// The in-memory queue, for tests that assert on queue state.
    #[must_use]
    pub const fn queue(&self) -> &MemoryQueue {
        &self.queue
    }
}

/// Errors while building and initializing the production composition.
#[derive(Debug, thiserror::Error)]
pub enum StorageInitError {
    #[error("failed to connect to database: {0}")]
    Connect(#[from] sqlx::Error),
    #[error("failed to initialize relational schema: {0}")]
    Relational(#[from] RepositoryError),
    #[error("failed to initialize entity table: {0}")]
    Entity(#[from] EntityStoreError),
    #[error("failed to initialize queue table: {0}")]
    Queue(#[from] QueueError),
    #[error("failed to open blob backend: {0}")]
    Blob(#[from] BlobError),
    #[error("failed to create share root: {0}")]
    Share(#[from] ShareError),
}

/// The production composition: `PostgreSQL` + object store + mounted
/// share.
pub type ProductionStorage =
    Storage<PostgresRelational, TableStore, ObjectStoreBlobs, PostgresQueue, FsShare>;

impl ProductionStorage {
    /// Connect every backend and run each adapter's idempotent
    /// create-if-absent initialization.
    ///
    /// # Errors
    ///
    /// Returns [`StorageInitError`] if a backend is unreachable or its
    /// resources cannot be created.
    pub async fn connect(config: &StorageConfig) -> Result<Self, StorageInitError> {
        let pool = create_pool(&config.database_url).await?;

        let relational = PostgresRelational::new(pool.clone());
        relational.init().await?;

        let entities = TableStore::new(pool.clone());
        entities.init().await?;

        let queue = PostgresQueue::with_lease(pool, config.queue_lease);
        queue.init().await?;

        let blobs = match &config.image_bucket {
            Some(bucket) => ObjectStoreBlobs::amazon(bucket, &config.image_base_url)?,
            None => ObjectStoreBlobs::local(&config.image_dir, &config.image_base_url)?,
        };

        let share = FsShare::new(&config.contracts_dir);
        share.init().await?;

        Ok(Self::new(relational, entities, blobs, queue, share))
    }
}

#[async_trait]
impl<R, E, B, Q, F> StorageFacade for Storage<R, E, B, Q, F>
where
    R: RelationalStore,
    E: EntityStore,
    B: BlobStore,
    Q: MessageQueue,
    F: FileShare,
{
    async fn create_user(&self, user: NewUser, password: &str) -> Result<bool, StorageError> {
        match self.relational.create_user(&user, password).await {
            Ok(_) => Ok(true),
            Err(RepositoryError::Conflict(_)) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<User>, StorageError> {
        let Ok(email) = Email::parse(email) else {
            return Ok(None);
        };
        Ok(self.relational.authenticate(&email, password).await?)
    }

    async fn user_by_id(&self, user_id: &str) -> Result<Option<User>, StorageError> {
        let Some(id) = UserId::parse(user_id) else {
            return Ok(None);
        };
        Ok(self.relational.get_user(id).await?)
    }

    async fn list_users(&self) -> Result<Vec<User>, StorageError> {
        Ok(self.relational.list_users().await?)
    }

    async fn add_to_cart(&self, user_id: &str, item: NewCartItem) -> Result<(), StorageError> {
        let Some(id) = UserId::parse(user_id) else {
            return Ok(());
        };
        self.relational.add_cart_item(id, &item).await?;
        Ok(())
    }

    async fn cart_items(&self, user_id: &str) -> Result<Vec<CartItem>, StorageError> {
        let Some(id) = UserId::parse(user_id) else {
            return Ok(Vec::new());
        };
        Ok(self.relational.cart_items(id).await?)
    }

    async fn remove_cart_item(
        &self,
        user_id: &str,
        item_id: CartItemId,
    ) -> Result<(), StorageError> {
        let Some(id) = UserId::parse(user_id) else {
            return Ok(());
        };
        self.relational.remove_cart_item(id, item_id).await?;
        Ok(())
    }

    async fn clear_cart(&self, user_id: &str) -> Result<(), StorageError> {
        let Some(id) = UserId::parse(user_id) else {
            return Ok(());
        };
        self.relational.clear_cart(id).await?;
        Ok(())
    }

    async fn create_order(&self, draft: OrderDraft) -> Result<Order, StorageError> {
        let Some(user_id) = UserId::parse(&draft.customer_id) else {
            return Err(StorageError::InvalidInput(format!(
                "invalid customer id: {:?}",
                draft.customer_id
            )));
        };

        let order = match self.relational.create_order(user_id, &draft).await {
            Ok(order) => order,
            Err(RepositoryError::ForeignKey(_)) => {
                return Err(StorageError::InvalidInput(format!(
                    "unknown customer id: {user_id}"
                )));
            }
            Err(e) => return Err(e.into()),
        };

        self.notify(TOPIC_ORDERS, format!("Order placed: {}", order.id))
            .await;

        Ok(order)
    }

    async fn orders_for_user(&self, user_id: &str) -> Result<Vec<Order>, StorageError> {
        let Some(id) = UserId::parse(user_id) else {
            return Ok(Vec::new());
        };
        Ok(self.relational.orders_for_user(id).await?)
    }

    async fn all_orders(&self) -> Result<Vec<OrderWithOwner>, StorageError> {
        Ok(self.relational.all_orders().await?)
    }

    async fn update_order_status(
        &self,
        order_id: OrderId,
        status: OrderStatus,
    ) -> Result<(), StorageError> {
        let updated = self.relational.update_order_status(order_id, status).await?;

        if updated {
            self.notify(
                TOPIC_ORDERS,
                format!("Order status updated: {order_id} to {status}"),
            )
            .await;
        }

        Ok(())
    }

    async fn add_product(&self, product: NewProduct) -> Result<Product, StorageError> {
        let product = Product::from_draft(Uuid::new_v4().to_string(), product);
        let row = EntityRow::from_model(PRODUCTS_PARTITION, product.id.clone(), &product)?;
        self.entities.insert(row).await?;

        self.notify(TOPIC_INVENTORY, format!("Product created: {}", product.name))
            .await;

        Ok(product)
    }

    async fn products(&self) -> Result<Vec<Product>, StorageError> {
        let rows = self.entities.query_partition(PRODUCTS_PARTITION).await?;
        rows.iter().map(Self::product_from_row).collect()
    }

    async fn product(&self, product_id: &str) -> Result<Option<Product>, StorageError> {
        let row = self.entities.get(PRODUCTS_PARTITION, product_id).await?;
        row.as_ref().map(Self::product_from_row).transpose()
    }

    async fn update_product(&self, product: &Product) -> Result<(), StorageError> {
        if product.id.is_empty() {
            return Err(StorageError::InvalidInput(
                "product has no row key".to_owned(),
            ));
        }

        let row = EntityRow::from_model(PRODUCTS_PARTITION, product.id.clone(), product)?;
        self.entities.upsert(row).await?;

        self.notify(TOPIC_INVENTORY, format!("Product updated: {}", product.name))
            .await;

        Ok(())
    }

    async fn delete_product(&self, product_id: &str) -> Result<(), StorageError> {
        self.entities.delete(PRODUCTS_PARTITION, product_id).await?;

        self.notify(TOPIC_INVENTORY, format!("Product deleted: {product_id}"))
            .await;

        Ok(())
    }

    async fn add_customer(
        &self,
        name: &str,
        email: &str,
        phone: &str,
    ) -> Result<(), StorageError> {
        let mut fields = serde_json::Map::new();
        fields.insert("Name".to_owned(), json!(name));
        fields.insert("Email".to_owned(), json!(email));
        fields.insert("Phone".to_owned(), json!(phone));
        fields.insert("CreatedDate".to_owned(), json!(Utc::now()));

        let row = EntityRow::new(CUSTOMERS_PARTITION, Uuid::new_v4().to_string(), fields);
        self.entities.insert(row).await?;

        self.notify(TOPIC_CUSTOMERS, format!("Customer added: {name}"))
            .await;

        Ok(())
    }

    async fn customers(&self) -> Result<Vec<EntityRow>, StorageError> {
        Ok(self.entities.query_partition(CUSTOMERS_PARTITION).await?)
    }

    async fn upload_image(
        &self,
        bytes: Bytes,
        original_name: &str,
    ) -> Result<String, StorageError> {
        let url = self.blobs.upload(original_name, bytes).await?;

        self.notify(TOPIC_IMAGES, format!("Image uploaded: {original_name}"))
            .await;

        Ok(url)
    }

    async fn image_urls(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.blobs.list_urls().await?)
    }

    async fn enqueue_message(&self, topic: &str, body: &str) -> Result<(), StorageError> {
        Ok(self.queue.send(topic, body).await?)
    }

    async fn drain_queue(&self, topic: &str) -> Result<Vec<String>, StorageError> {
        let batch = self.queue.receive_batch(topic, RECEIVE_BATCH_LIMIT).await?;

        let mut bodies = Vec::with_capacity(batch.len());
        for message in batch {
            match self
                .queue
                .acknowledge(topic, &message.id, &message.receipt)
                .await
            {
                Ok(()) | Err(QueueError::ReceiptNotFound) => {}
                Err(e) => return Err(e.into()),
            }
            bodies.push(message.body);
        }

        Ok(bodies)
    }

    async fn upload_contract(&self, bytes: Bytes, name: &str) -> Result<(), StorageError> {
        Ok(self.share.upload(name, bytes).await?)
    }

    async fn contracts(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.share.list().await?)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    fn draft_product(name: &str) -> NewProduct {
        NewProduct {
            name: name.to_owned(),
            description: "test".to_owned(),
            price: Decimal::new(500, 2),
            category: "Test".to_owned(),
            stock_quantity: 1,
            image_url: String::new(),
        }
    }

    #[tokio::test]
    async fn non_numeric_user_ids_degrade_to_empty_results() {
        let storage = Storage::in_memory();

        assert!(storage.user_by_id("nope").await.expect("lookup").is_none());
        assert!(storage.cart_items("nope").await.expect("cart").is_empty());
        assert!(storage.orders_for_user("nope").await.expect("orders").is_empty());
        // Writes on the cart degrade to no-ops rather than erroring.
        storage
            .add_to_cart(
                "nope",
                NewCartItem {
                    product_id: "p".to_owned(),
                    product_name: "x".to_owned(),
                    price: Decimal::ONE,
                    quantity: 1,
                },
            )
            .await
            .expect("no-op");
    }

    #[tokio::test]
    async fn create_order_with_unparseable_owner_is_invalid_input() {
        let storage = Storage::in_memory();
        let err = storage
            .create_order(OrderDraft {
                customer_id: "not-a-number".to_owned(),
                customer_email: "a@example.com".to_owned(),
                total_amount: Decimal::TEN,
                shipping_address: "1 Main St".to_owned(),
                line_items: Vec::new(),
            })
            .await
            .expect_err("must fail");
        assert!(matches!(err, StorageError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn add_product_notifies_inventory_exactly_once() {
        let storage = Storage::in_memory();
        let product = storage
            .add_product(draft_product("Beans"))
            .await
            .expect("add");
        assert!(!product.id.is_empty());

        let notifications = storage.drain_queue(TOPIC_INVENTORY).await.expect("drain");
        assert_eq!(notifications, vec!["Product created: Beans".to_owned()]);
    }

    #[tokio::test]
    async fn product_lookup_of_missing_row_is_none() {
        let storage = Storage::in_memory();
        assert!(storage.product("missing").await.expect("get").is_none());
    }

    #[tokio::test]
    async fn updating_a_product_without_a_row_key_is_invalid_input() {
        let storage = Storage::in_memory();
        let orphan = Product::from_draft(String::new(), draft_product("Beans"));
        let err = storage.update_product(&orphan).await.expect_err("must fail");
        assert!(matches!(err, StorageError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn drain_queue_removes_what_it_returns() {
        let storage = Storage::in_memory();
        storage
            .enqueue_message("orders", "Order placed: 1")
            .await
            .expect("send");

        let drained = storage.drain_queue("orders").await.expect("drain");
        assert_eq!(drained, vec!["Order placed: 1".to_owned()]);
        assert_eq!(storage.queue().depth("orders").await, 0);
    }
}
