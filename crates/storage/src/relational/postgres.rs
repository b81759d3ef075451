//! `PostgreSQL` implementation of the relational store.
//!
//! Queries use the sqlx runtime API with `#[derive(sqlx::FromRow)]`
//! internal row structs mapped into domain models; the schema is created by
//! [`PostgresRelational::init`] rather than a migration set, so there is
//! nothing for the compile-time macros to check against.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::PgPool;

use backroom_core::{
    CartItem, CartItemId, Email, NewCartItem, NewUser, Order, OrderDraft, OrderId, OrderLine,
    OrderStatus, OrderWithOwner, User, UserId,
};

use super::{hash_password, verify_password, RelationalStore, RepositoryError};

/// Relational adapter backed by `PostgreSQL`.
#[derive(Clone)]
pub struct PostgresRelational {
    pool: PgPool,
}

impl PostgresRelational {
    /// Create the adapter over an existing connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Idempotently create the relational schema.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any statement fails.
    pub async fn init(&self) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS users (
                id           SERIAL PRIMARY KEY,
                username     TEXT NOT NULL DEFAULT '',
                email        TEXT NOT NULL,
                password     TEXT NOT NULL,
                first_name   TEXT NOT NULL DEFAULT '',
                last_name    TEXT NOT NULL DEFAULT '',
                role         TEXT NOT NULL DEFAULT 'Customer',
                phone_number TEXT NOT NULL DEFAULT '',
                created_at   TIMESTAMPTZ NOT NULL DEFAULT now()
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE UNIQUE INDEX IF NOT EXISTS users_email_key ON users (email)")
            .execute(&self.pool)
            .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS cart_items (
                id           SERIAL PRIMARY KEY,
                user_id      INTEGER NOT NULL REFERENCES users (id) ON DELETE CASCADE,
                product_id   TEXT NOT NULL,
                product_name TEXT NOT NULL,
                price        NUMERIC(12, 2) NOT NULL,
                quantity     INTEGER NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS orders (
                id               SERIAL PRIMARY KEY,
                user_id          INTEGER NOT NULL REFERENCES users (id) ON DELETE CASCADE,
                customer_email   TEXT NOT NULL,
                total_amount     NUMERIC(12, 2) NOT NULL,
                status           TEXT NOT NULL DEFAULT 'PENDING',
                placed_at        TIMESTAMPTZ NOT NULL DEFAULT now(),
                shipping_address TEXT NOT NULL,
                line_items       JSONB NOT NULL DEFAULT '[]'::jsonb
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl RelationalStore for PostgresRelational {
    async fn create_user(&self, user: &NewUser, password: &str) -> Result<User, RepositoryError> {
        UserRepository::new(&self.pool).create(user, password).await
    }

    async fn authenticate(
        &self,
        email: &Email,
        password: &str,
    ) -> Result<Option<User>, RepositoryError> {
        UserRepository::new(&self.pool)
            .authenticate(email, password)
            .await
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        UserRepository::new(&self.pool).get_by_id(id).await
    }

    async fn list_users(&self) -> Result<Vec<User>, RepositoryError> {
        UserRepository::new(&self.pool).list().await
    }

    async fn add_cart_item(
        &self,
        user_id: UserId,
        item: &NewCartItem,
    ) -> Result<CartItem, RepositoryError> {
        CartRepository::new(&self.pool).add(user_id, item).await
    }

    async fn cart_items(&self, user_id: UserId) -> Result<Vec<CartItem>, RepositoryError> {
        CartRepository::new(&self.pool).items(user_id).await
    }

    async fn remove_cart_item(
        &self,
        user_id: UserId,
        item_id: CartItemId,
    ) -> Result<bool, RepositoryError> {
        CartRepository::new(&self.pool).remove(user_id, item_id).await
    }

    async fn clear_cart(&self, user_id: UserId) -> Result<u64, RepositoryError> {
        CartRepository::new(&self.pool).clear(user_id).await
    }

    async fn create_order(
        &self,
        user_id: UserId,
        draft: &OrderDraft,
    ) -> Result<Order, RepositoryError> {
        OrderRepository::new(&self.pool).create(user_id, draft).await
    }

    async fn orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        OrderRepository::new(&self.pool).for_user(user_id).await
    }

    async fn all_orders(&self) -> Result<Vec<OrderWithOwner>, RepositoryError> {
        OrderRepository::new(&self.pool).all_with_owner().await
    }

    async fn update_order_status(
        &self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<bool, RepositoryError> {
        OrderRepository::new(&self.pool).update_status(id, status).await
    }
}

// =============================================================================
// Row types
// =============================================================================

/// Internal row type for user queries.
#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: i32,
    username: String,
    email: String,
    first_name: String,
    last_name: String,
    role: String,
    phone_number: String,
    created_at: DateTime<Utc>,
}

impl UserRow {
    fn into_user(self) -> Result<User, RepositoryError> {
        let email = Email::parse(&self.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;
        let role = self.role.parse().map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid role in database: {e}"))
        })?;

        Ok(User {
            id: UserId::new(self.id),
            username: self.username,
            email,
            first_name: self.first_name,
            last_name: self.last_name,
            role,
            phone_number: self.phone_number,
            created_at: self.created_at,
        })
    }
}

/// Internal row type for the authenticate query (user + password hash).
#[derive(Debug, sqlx::FromRow)]
struct AuthRow {
    #[sqlx(flatten)]
    user: UserRow,
    password: String,
}

/// Internal row type for cart queries.
#[derive(Debug, sqlx::FromRow)]
struct CartRow {
    id: i32,
    user_id: i32,
    product_id: String,
    product_name: String,
    price: Decimal,
    quantity: i32,
}

impl From<CartRow> for CartItem {
    fn from(row: CartRow) -> Self {
        Self {
            id: CartItemId::new(row.id),
            user_id: UserId::new(row.user_id),
            product_id: row.product_id,
            product_name: row.product_name,
            price: row.price,
            quantity: row.quantity,
        }
    }
}

/// Internal row type for order queries.
#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: i32,
    user_id: i32,
    customer_email: String,
    total_amount: Decimal,
    status: String,
    placed_at: DateTime<Utc>,
    shipping_address: String,
    line_items: Json<Vec<OrderLine>>,
}

impl OrderRow {
    fn into_order(self) -> Result<Order, RepositoryError> {
        let status = self.status.parse().map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid order status in database: {e}"))
        })?;

        Ok(Order {
            id: OrderId::new(self.id),
            user_id: UserId::new(self.user_id),
            customer_email: self.customer_email,
            total_amount: self.total_amount,
            status,
            placed_at: self.placed_at,
            shipping_address: self.shipping_address,
            line_items: self.line_items.0,
        })
    }
}

/// Internal row type for the admin order listing (order + owner join).
#[derive(Debug, sqlx::FromRow)]
struct OrderOwnerRow {
    #[sqlx(flatten)]
    order: OrderRow,
    owner_id: i32,
    owner_username: String,
    owner_email: String,
    owner_first_name: String,
    owner_last_name: String,
    owner_role: String,
    owner_phone_number: String,
    owner_created_at: DateTime<Utc>,
}

impl OrderOwnerRow {
    fn into_order_with_owner(self) -> Result<OrderWithOwner, RepositoryError> {
        let owner = UserRow {
            id: self.owner_id,
            username: self.owner_username,
            email: self.owner_email,
            first_name: self.owner_first_name,
            last_name: self.owner_last_name,
            role: self.owner_role,
            phone_number: self.owner_phone_number,
            created_at: self.owner_created_at,
        }
        .into_user()?;

        Ok(OrderWithOwner {
            order: self.order.into_order()?,
            owner,
        })
    }
}

// =============================================================================
// Repositories
// =============================================================================

const USER_COLUMNS: &str =
    "id, username, email, first_name, last_name, role, phone_number, created_at";

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Create a new user with a hashed password.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(&self, user: &NewUser, password: &str) -> Result<User, RepositoryError> {
        let password_hash = hash_password(password)?;

        let row = sqlx::query_as::<_, UserRow>(
            r"
            INSERT INTO users (username, email, password, first_name, last_name, role, phone_number)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, username, email, first_name, last_name, role, phone_number, created_at
            ",
        )
        .bind(&user.username)
        .bind(user.email.as_str())
        .bind(&password_hash)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.role.as_str())
        .bind(&user.phone_number)
        .fetch_one(self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return RepositoryError::Conflict("email already exists".to_owned());
            }
            RepositoryError::Database(e)
        })?;

        row.into_user()
    }

    /// Return the user matching the email/password pair, or `None`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn authenticate(
        &self,
        email: &Email,
        password: &str,
    ) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, AuthRow>(
            r"
            SELECT id, username, email, first_name, last_name, role, phone_number, created_at,
                   password
            FROM users
            WHERE email = $1
            ",
        )
        .bind(email.as_str())
        .fetch_optional(self.pool)
        .await?;

        match row {
            Some(r) if verify_password(password, &r.password) => r.user.into_user().map(Some),
            _ => Ok(None),
        }
    }

    /// Get a user by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id.as_i32())
        .fetch_optional(self.pool)
        .await?;

        row.map(UserRow::into_user).transpose()
    }

    /// List every user, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<User>, RepositoryError> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY id"
        ))
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(UserRow::into_user).collect()
    }
}

/// Repository for cart database operations.
pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Add an item to a user's cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::ForeignKey` if the user does not exist.
    pub async fn add(
        &self,
        user_id: UserId,
        item: &NewCartItem,
    ) -> Result<CartItem, RepositoryError> {
        let row = sqlx::query_as::<_, CartRow>(
            r"
            INSERT INTO cart_items (user_id, product_id, product_name, price, quantity)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, product_id, product_name, price, quantity
            ",
        )
        .bind(user_id.as_i32())
        .bind(&item.product_id)
        .bind(&item.product_name)
        .bind(item.price)
        .bind(item.quantity)
        .fetch_one(self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_foreign_key_violation()
            {
                return RepositoryError::ForeignKey(format!("no such user: {user_id}"));
            }
            RepositoryError::Database(e)
        })?;

        Ok(row.into())
    }

    /// All cart items owned by a user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn items(&self, user_id: UserId) -> Result<Vec<CartItem>, RepositoryError> {
        let rows = sqlx::query_as::<_, CartRow>(
            r"
            SELECT id, user_id, product_id, product_name, price, quantity
            FROM cart_items
            WHERE user_id = $1
            ORDER BY id
            ",
        )
        .bind(user_id.as_i32())
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(CartItem::from).collect())
    }

    /// Remove one cart item, scoped to its owning user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn remove(
        &self,
        user_id: UserId,
        item_id: CartItemId,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM cart_items WHERE id = $1 AND user_id = $2")
            .bind(item_id.as_i32())
            .bind(user_id.as_i32())
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Remove every cart item owned by a user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn clear(&self, user_id: UserId) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
            .bind(user_id.as_i32())
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

const ORDER_COLUMNS: &str =
    "id, user_id, customer_email, total_amount, status, placed_at, shipping_address, line_items";

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Persist a new order for the given owner.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::ForeignKey` if the owner does not exist.
    pub async fn create(
        &self,
        user_id: UserId,
        draft: &OrderDraft,
    ) -> Result<Order, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(
            r"
            INSERT INTO orders (user_id, customer_email, total_amount, status, shipping_address, line_items)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, user_id, customer_email, total_amount, status, placed_at,
                      shipping_address, line_items
            ",
        )
        .bind(user_id.as_i32())
        .bind(&draft.customer_email)
        .bind(draft.total_amount)
        .bind(OrderStatus::default().as_str())
        .bind(&draft.shipping_address)
        .bind(Json(&draft.line_items))
        .fetch_one(self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_foreign_key_violation()
            {
                return RepositoryError::ForeignKey(format!("no such user: {user_id}"));
            }
            RepositoryError::Database(e)
        })?;

        row.into_order()
    }

    /// Orders owned by a user, most recent first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 ORDER BY placed_at DESC, id DESC"
        ))
        .bind(user_id.as_i32())
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(OrderRow::into_order).collect()
    }

    /// Every order joined with its owning user, most recent first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn all_with_owner(&self) -> Result<Vec<OrderWithOwner>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderOwnerRow>(
            r"
            SELECT o.id, o.user_id, o.customer_email, o.total_amount, o.status, o.placed_at,
                   o.shipping_address, o.line_items,
                   u.id           AS owner_id,
                   u.username     AS owner_username,
                   u.email        AS owner_email,
                   u.first_name   AS owner_first_name,
                   u.last_name    AS owner_last_name,
                   u.role         AS owner_role,
                   u.phone_number AS owner_phone_number,
                   u.created_at   AS owner_created_at
            FROM orders o
            JOIN users u ON u.id = o.user_id
            ORDER BY o.placed_at DESC, o.id DESC
            ",
        )
        .fetch_all(self.pool)
        .await?;

        rows.into_iter()
            .map(OrderOwnerRow::into_order_with_owner)
            .collect()
    }

    /// Set the status of an order; `false` when the order does not exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn update_status(
        &self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query("UPDATE orders SET status = $1 WHERE id = $2")
            .bind(status.as_str())
            .bind(id.as_i32())
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
