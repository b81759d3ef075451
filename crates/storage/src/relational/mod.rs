//! Relational adapter: users, carts, and orders in `PostgreSQL`.
//!
//! # Tables
//!
//! - `users` - account records with a unique email index
//! - `cart_items` - per-user cart lines, `ON DELETE CASCADE` from users
//! - `orders` - placed orders with a JSONB line-item snapshot, cascade
//!   from users
//!
//! The adapter owns its schema: [`postgres::PostgresRelational::init`]
//! creates the tables if they are absent. There is no migration tooling;
//! create-if-absent on startup is the lifecycle model for every backend in
//! this layer.
//!
//! [`MemoryRelational`] is the in-memory backend for tests and local
//! development; it enforces the same invariants (unique email, foreign
//! keys, cascades) as the real schema.

pub mod memory;
pub mod postgres;

pub use memory::MemoryRelational;
pub use postgres::PostgresRelational;

use std::time::Duration;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use backroom_core::{
    CartItem, CartItemId, Email, NewCartItem, NewUser, Order, OrderDraft, OrderId, OrderStatus,
    OrderWithOwner, User, UserId,
};

/// Errors from relational store operations.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A unique constraint was violated (duplicate email).
    #[error("conflict: {0}")]
    Conflict(String),

    /// A foreign key could not be resolved (unknown owning user).
    #[error("foreign key violation: {0}")]
    ForeignKey(String),

    /// A stored value could not be mapped back into a domain type.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Password hashing failed.
    #[error("password hashing failed")]
    PasswordHash,
}

/// Capability trait for the relational store.
///
/// Identifier arguments are already-parsed newtypes; tolerating raw string
/// identifiers from the HTTP layer is the façade's job, not the adapter's.
#[async_trait]
pub trait RelationalStore: Send + Sync + 'static {
    /// Create a user with an Argon2-hashed password.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Conflict`] if the email is already
    /// registered.
    async fn create_user(&self, user: &NewUser, password: &str) -> Result<User, RepositoryError>;

    /// Return the user matching the email/password pair, or `None`.
    async fn authenticate(
        &self,
        email: &Email,
        password: &str,
    ) -> Result<Option<User>, RepositoryError>;

    /// Get a user by id, or `None`.
    async fn get_user(&self, id: UserId) -> Result<Option<User>, RepositoryError>;

    /// List every user, ordered by id.
    async fn list_users(&self) -> Result<Vec<User>, RepositoryError>;

    /// Add an item to a user's cart.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::ForeignKey`] if the user does not exist.
    async fn add_cart_item(
        &self,
        user_id: UserId,
        item: &NewCartItem,
    ) -> Result<CartItem, RepositoryError>;

    /// All cart items owned by a user.
    async fn cart_items(&self, user_id: UserId) -> Result<Vec<CartItem>, RepositoryError>;

    /// Remove one cart item, scoped to its owning user.
    ///
    /// Returns whether a row was actually deleted.
    async fn remove_cart_item(
        &self,
        user_id: UserId,
        item_id: CartItemId,
    ) -> Result<bool, RepositoryError>;

    /// Remove every cart item owned by a user; returns the removed count.
    async fn clear_cart(&self, user_id: UserId) -> Result<u64, RepositoryError>;

    /// Persist a new order for the given owner.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::ForeignKey`] if the owner does not
    /// exist.
    async fn create_order(
        &self,
        user_id: UserId,
        draft: &OrderDraft,
    ) -> Result<Order, RepositoryError>;

    /// Orders owned by a user, most recent first.
    async fn orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError>;

    /// Every order joined with its owning user, most recent first.
    async fn all_orders(&self) -> Result<Vec<OrderWithOwner>, RepositoryError>;

    /// Set the status of an order.
    ///
    /// Returns `false` (a silent no-op) when the order does not exist.
    async fn update_order_status(
        &self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<bool, RepositoryError>;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Hash a password using Argon2id.
pub(crate) fn hash_password(password: &str) -> Result<String, RepositoryError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| RepositoryError::PasswordHash)
}

/// Verify a password against a stored hash.
///
/// An unparseable stored hash verifies as `false`; authentication treats
/// it as a mismatch rather than surfacing corruption to the login path.
pub(crate) fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed_hash) = PasswordHash::new(hash) else {
        return false;
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_round_trip() {
        let hash = hash_password("hunter2").expect("hash");
        assert!(verify_password("hunter2", &hash));
        assert!(!verify_password("hunter3", &hash));
    }

    #[test]
    fn garbage_hash_never_verifies() {
        assert!(!verify_password("hunter2", "not-a-phc-string"));
    }
}
