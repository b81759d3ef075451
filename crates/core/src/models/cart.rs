//! Shopping cart models.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{CartItemId, UserId};

/// A line in a user's cart.
///
/// `product_id` references an entity-store row key, so it stays a plain
/// string; the relational store does not (and cannot) enforce it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: CartItemId,
    pub user_id: UserId,
    pub product_id: String,
    pub product_name: String,
    pub price: Decimal,
    pub quantity: i32,
}

/// Input for adding an item to a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCartItem {
    pub product_id: String,
    pub product_name: String,
    pub price: Decimal,
    pub quantity: i32,
}
