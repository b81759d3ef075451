//! Integration tests for Backroom.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p backroom-integration-tests
//! ```
//!
//! Every test in `tests/` runs the real façade and consumer code over the
//! in-memory adapters, so no external service is required. The
//! `PostgreSQL`-backed adapters are covered by their own `#[ignore]`d
//! round-trip tests behind a live database (`tests/postgres_roundtrip.rs`).
//!
//! This crate's library part is the shared fixture kit: an in-memory
//! façade and a few canned inputs with sensible defaults.

use rust_decimal::Decimal;

use backroom_core::{Email, NewCartItem, NewProduct, NewUser, OrderDraft, OrderLine, Role};
use backroom_storage::facade::MemoryStorage;
use backroom_storage::Storage;

/// A fully in-memory façade.
#[must_use]
pub fn storage() -> MemoryStorage {
    Storage::in_memory()
}

/// A customer-role user draft for the given email.
///
/// # Panics
///
/// Panics when handed a structurally invalid email; fixtures are always
/// called with literals.
#[must_use]
pub fn user_draft(email: &str) -> NewUser {
    NewUser {
        username: email.to_owned(),
        email: Email::parse(email).expect("fixture email is valid"),
        first_name: "Thandi".to_owned(),
        last_name: "Nkosi".to_owned(),
        role: Role::Customer,
        phone_number: "+27 21 555 0199".to_owned(),
    }
}

/// A cart item draft for the given product name.
#[must_use]
pub fn cart_item_draft(product_name: &str) -> NewCartItem {
    NewCartItem {
        product_id: "prod-1".to_owned(),
        product_name: product_name.to_owned(),
        price: Decimal::new(2499, 2),
        quantity: 2,
    }
}

/// A product draft for the given name.
#[must_use]
pub fn product_draft(name: &str) -> NewProduct {
    NewProduct {
        name: name.to_owned(),
        description: "Single-origin, 1kg".to_owned(),
        price: Decimal::new(18950, 2),
        category: "Coffee".to_owned(),
        stock_quantity: 25,
        image_url: String::new(),
    }
}

/// An order draft owned by the given raw customer id.
#[must_use]
pub fn order_draft(customer_id: &str) -> OrderDraft {
    OrderDraft {
        customer_id: customer_id.to_owned(),
        customer_email: "thandi@example.com".to_owned(),
        total_amount: Decimal::new(49900, 2),
        shipping_address: "14 Kloof Street, Cape Town".to_owned(),
        line_items: vec![OrderLine {
            product_id: "prod-1".to_owned(),
            product_name: "Espresso Beans".to_owned(),
            price: Decimal::new(24950, 2),
            quantity: 2,
        }],
    }
}
