//! Product models.
//!
//! Products live in the schemaless entity store under the `Products`
//! partition. Serde field names are the PascalCase attribute names used in
//! the stored entity, so a product round-trips through an entity row via
//! plain serde; the row key is carried separately as `id`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A product in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Product {
    /// Entity-store row key, assigned on insert and immutable afterwards.
    #[serde(skip, default)]
    pub id: String,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub category: String,
    pub stock_quantity: i32,
    pub image_url: String,
}

/// Input for adding a product; the row key is generated by the storage
/// layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub category: String,
    pub stock_quantity: i32,
    #[serde(default)]
    pub image_url: String,
}

impl Product {
    /// Attach a freshly assigned row key to a draft product.
    #[must_use]
    pub fn from_draft(id: String, draft: NewProduct) -> Self {
        Self {
            id,
            name: draft.name,
            description: draft.description,
            price: draft.price,
            category: draft.category,
            stock_quantity: draft.stock_quantity,
            image_url: draft.image_url,
        }
    }
}
