//! In-memory relational store for tests and local development.
//!
//! Enforces the same invariants as the `PostgreSQL` schema: unique email,
//! foreign keys from cart items and orders to users, and cascade deletion
//! semantics. State is shared through an `Arc`, so clones observe the same
//! data.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use backroom_core::{
    CartItem, CartItemId, Email, NewCartItem, NewUser, Order, OrderDraft, OrderId, OrderStatus,
    OrderWithOwner, User, UserId,
};

use super::{hash_password, verify_password, RelationalStore, RepositoryError};

#[derive(Debug, Clone)]
struct StoredUser {
    user: User,
    password_hash: String,
}

#[derive(Debug, Default)]
struct Inner {
    users: Vec<StoredUser>,
    cart_items: Vec<CartItem>,
    orders: Vec<Order>,
    next_user_id: i32,
    next_cart_item_id: i32,
    next_order_id: i32,
}

/// In-memory relational store.
#[derive(Clone, Default)]
pub struct MemoryRelational {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryRelational {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Inner {
    fn user_exists(&self, id: UserId) -> bool {
        self.users.iter().any(|s| s.user.id == id)
    }
}

#[async_trait]
impl RelationalStore for MemoryRelational {
    async fn create_user(&self, user: &NewUser, password: &str) -> Result<User, RepositoryError> {
        let password_hash = hash_password(password)?;
        let mut inner = self.inner.lock().await;

        if inner.users.iter().any(|s| s.user.email == user.email) {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }

        inner.next_user_id += 1;
        let stored = User {
            id: UserId::new(inner.next_user_id),
            username: user.username.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            role: user.role,
            phone_number: user.phone_number.clone(),
            created_at: Utc::now(),
        };
        inner.users.push(StoredUser {
            user: stored.clone(),
            password_hash,
        });

        Ok(stored)
    }

    async fn authenticate(
        &self,
        email: &Email,
        password: &str,
    ) -> Result<Option<User>, RepositoryError> {
        let inner = self.inner.lock().await;

        Ok(inner
            .users
            .iter()
            .find(|s| &s.user.email == email && verify_password(password, &s.password_hash))
            .map(|s| s.user.clone()))
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .users
            .iter()
            .find(|s| s.user.id == id)
            .map(|s| s.user.clone()))
    }

    async fn list_users(&self) -> Result<Vec<User>, RepositoryError> {
        let inner = self.inner.lock().await;
        Ok(inner.users.iter().map(|s| s.user.clone()).collect())
    }

    async fn add_cart_item(
        &self,
        user_id: UserId,
        item: &NewCartItem,
    ) -> Result<CartItem, RepositoryError> {
        let mut inner = self.inner.lock().await;

        if !inner.user_exists(user_id) {
            return Err(RepositoryError::ForeignKey(format!("no such user: {user_id}")));
        }

        inner.next_cart_item_id += 1;
        let stored = CartItem {
            id: CartItemId::new(inner.next_cart_item_id),
            user_id,
            product_id: item.product_id.clone(),
            product_name: item.product_name.clone(),
            price: item.price,
            quantity: item.quantity,
        };
        inner.cart_items.push(stored.clone());

        Ok(stored)
    }

    async fn cart_items(&self, user_id: UserId) -> Result<Vec<CartItem>, RepositoryError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .cart_items
            .iter()
            .filter(|ci| ci.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn remove_cart_item(
        &self,
        user_id: UserId,
        item_id: CartItemId,
    ) -> Result<bool, RepositoryError> {
        let mut inner = self.inner.lock().await;
        let before = inner.cart_items.len();
        inner
            .cart_items
            .retain(|ci| !(ci.id == item_id && ci.user_id == user_id));
        Ok(inner.cart_items.len() < before)
    }

    async fn clear_cart(&self, user_id: UserId) -> Result<u64, RepositoryError> {
        let mut inner = self.inner.lock().await;
        let before = inner.cart_items.len();
        inner.cart_items.retain(|ci| ci.user_id != user_id);
        Ok((before - inner.cart_items.len()) as u64)
    }

    async fn create_order(
        &self,
        user_id: UserId,
        draft: &OrderDraft,
    ) -> Result<Order, RepositoryError> {
        let mut inner = self.inner.lock().await;

        if !inner.user_exists(user_id) {
            return Err(RepositoryError::ForeignKey(format!("no such user: {user_id}")));
        }

        inner.next_order_id += 1;
        let order = Order {
            id: OrderId::new(inner.next_order_id),
            user_id,
            customer_email: draft.customer_email.clone(),
            total_amount: draft.total_amount,
            status: OrderStatus::default(),
            placed_at: Utc::now(),
            shipping_address: draft.shipping_address.clone(),
            line_items: draft.line_items.clone(),
        };
        inner.orders.push(order.clone());

        Ok(order)
    }

    async fn orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let inner = self.inner.lock().await;
        let mut orders: Vec<Order> = inner
            .orders
            .iter()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.placed_at.cmp(&a.placed_at).then(b.id.cmp(&a.id)));
        Ok(orders)
    }

    async fn all_orders(&self) -> Result<Vec<OrderWithOwner>, RepositoryError> {
        let inner = self.inner.lock().await;
        let mut listed: Vec<OrderWithOwner> = inner
            .orders
            .iter()
            .filter_map(|o| {
                inner
                    .users
                    .iter()
                    .find(|s| s.user.id == o.user_id)
                    .map(|s| OrderWithOwner {
                        order: o.clone(),
                        owner: s.user.clone(),
                    })
            })
            .collect();
        listed.sort_by(|a, b| {
            b.order
                .placed_at
                .cmp(&a.order.placed_at)
                .then(b.order.id.cmp(&a.order.id))
        });
        Ok(listed)
    }

    async fn update_order_status(
        &self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<bool, RepositoryError> {
        let mut inner = self.inner.lock().await;
        match inner.orders.iter_mut().find(|o| o.id == id) {
            Some(order) => {
                order.status = status;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            username: email.to_owned(),
            email: Email::parse(email).expect("valid email"),
            first_name: "Test".to_owned(),
            last_name: "User".to_owned(),
            role: backroom_core::Role::Customer,
            phone_number: String::new(),
        }
    }

    fn new_item(name: &str) -> NewCartItem {
        NewCartItem {
            product_id: "p-1".to_owned(),
            product_name: name.to_owned(),
            price: Decimal::new(1999, 2),
            quantity: 1,
        }
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() {
        let store = MemoryRelational::new();
        store
            .create_user(&new_user("a@example.com"), "pw")
            .await
            .expect("first create");

        let err = store
            .create_user(&new_user("a@example.com"), "pw2")
            .await
            .expect_err("second create must fail");
        assert!(matches!(err, RepositoryError::Conflict(_)));
        assert_eq!(store.list_users().await.expect("list").len(), 1);
    }

    #[tokio::test]
    async fn authenticate_checks_the_password() {
        let store = MemoryRelational::new();
        let created = store
            .create_user(&new_user("a@example.com"), "secret")
            .await
            .expect("create");

        let email = Email::parse("a@example.com").expect("valid");
        let found = store.authenticate(&email, "secret").await.expect("auth");
        assert_eq!(found.map(|u| u.id), Some(created.id));

        let denied = store.authenticate(&email, "wrong").await.expect("auth");
        assert!(denied.is_none());
    }

    #[tokio::test]
    async fn cart_round_trip_and_clear() {
        let store = MemoryRelational::new();
        let user = store
            .create_user(&new_user("a@example.com"), "pw")
            .await
            .expect("create");

        store
            .add_cart_item(user.id, &new_item("Beans"))
            .await
            .expect("add");
        store
            .add_cart_item(user.id, &new_item("Mug"))
            .await
            .expect("add");

        let items = store.cart_items(user.id).await.expect("items");
        assert_eq!(items.len(), 2);

        let removed = store.clear_cart(user.id).await.expect("clear");
        assert_eq!(removed, 2);
        assert!(store.cart_items(user.id).await.expect("items").is_empty());
    }

    #[tokio::test]
    async fn cart_add_requires_an_existing_user() {
        let store = MemoryRelational::new();
        let err = store
            .add_cart_item(UserId::new(99), &new_item("Beans"))
            .await
            .expect_err("must fail");
        assert!(matches!(err, RepositoryError::ForeignKey(_)));
    }

    #[tokio::test]
    async fn order_status_update_is_a_noop_for_unknown_ids() {
        let store = MemoryRelational::new();
        let updated = store
            .update_order_status(OrderId::new(404), OrderStatus::Shipped)
            .await
            .expect("update");
        assert!(!updated);
    }
}
