//! Order models.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::user::User;
use crate::types::{OrderId, OrderStatus, UserId};

/// One line item on an order.
///
/// Line items are a snapshot taken at checkout and serialized into the
/// order row; they do not reference live cart or product rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: String,
    pub product_name: String,
    pub price: Decimal,
    pub quantity: i32,
}

/// A persisted order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    /// Email snapshot taken when the order was placed; survives later
    /// changes to the owning user.
    pub customer_email: String,
    pub total_amount: Decimal,
    pub status: OrderStatus,
    pub placed_at: DateTime<Utc>,
    pub shipping_address: String,
    pub line_items: Vec<OrderLine>,
}

/// Input for creating an order.
///
/// `customer_id` is the raw string identifier from the HTTP layer; the
/// storage façade parses it and fails with an invalid-input error when it
/// cannot be resolved to an existing user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDraft {
    pub customer_id: String,
    pub customer_email: String,
    pub total_amount: Decimal,
    pub shipping_address: String,
    #[serde(default)]
    pub line_items: Vec<OrderLine>,
}

/// An order joined with its owning user, for the admin listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderWithOwner {
    pub order: Order,
    pub owner: User,
}
