//! Backroom Core - Shared types library.
//!
//! This crate provides common types used across all Backroom components:
//! - `storage` - Unified storage orchestration layer (five backend adapters + façade)
//! - `worker` - Queue-drain consumers persisting the audit trail
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access, no
//! storage clients. This keeps it lightweight and allows it to be used
//! anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, emails, and statuses
//! - [`models`] - Domain models for users, carts, orders, and products

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod models;
pub mod types;

pub use models::*;
pub use types::*;
