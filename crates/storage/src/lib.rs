//! Backroom Storage - the unified storage orchestration layer.
//!
//! Persistent state for the retail back office is split across five storage
//! technologies, each behind its own adapter:
//!
//! - [`relational`] - users, carts, and orders in `PostgreSQL`
//! - [`entity`] - schemaless, partition/row-keyed entities (products,
//!   customers, audit logs)
//! - [`blob`] - binary image blobs behind the `object_store` crate
//! - [`queue`] - durable text messages with lease-based at-least-once
//!   delivery
//! - [`share`] - contract documents on a shared directory
//!
//! The [`facade`] module composes the five adapters into the single
//! [`StorageFacade`] surface the application layer consumes, and emits
//! best-effort queue notifications as a side effect of certain writes. The
//! backends are deliberately *not* transactional with respect to each
//! other; a crash between a write and its notification loses only the
//! notification, never business data.
//!
//! Every adapter is a capability trait with a production backend and an
//! in-memory backend, so tests (and local development) can run against
//! [`Storage::in_memory`] without any external service.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod blob;
pub mod config;
pub mod entity;
pub mod facade;
pub mod queue;
pub mod relational;
pub mod share;

pub use config::{ConfigError, StorageConfig};
pub use facade::{Storage, StorageError, StorageFacade};
